//! Hashing utilities

use crate::types::{Digest, SyncError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer used while streaming file content into the hasher
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the content digest of a file
///
/// The file is streamed in 64KB chunks. When `limit` is set, only the first
/// `limit` bytes contribute to the digest; the cap applies to this file alone.
///
/// # Example
/// ```no_run
/// use sparsync::hash::digest_file;
/// use std::path::Path;
///
/// let digest = digest_file(Path::new("file.txt"), None)?;
/// println!("{digest}");
/// # Ok::<(), sparsync::SyncError>(())
/// ```
pub fn digest_file(file_path: &Path, limit: Option<u64>) -> Result<Digest, SyncError> {
    let file = File::open(file_path).map_err(|e| SyncError::hash(file_path, e))?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    let mut reader: Box<dyn Read> = match limit {
        Some(max) => Box::new(file.take(max)),
        None => Box::new(file),
    };

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| SyncError::hash(file_path, e))?;

        if bytes_read == 0 {
            break; // EOF
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// Combine child digests into a directory digest
///
/// Children are sorted first, so the result does not depend on the order
/// the filesystem listed them in.
pub fn digest_dir<'a, I>(children: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    let mut sorted: Vec<&Digest> = children.into_iter().collect();
    sorted.sort();

    let mut hasher = blake3::Hasher::new();
    for child in sorted {
        hasher.update(child.as_bytes());
    }
    hasher.finalize().into()
}
