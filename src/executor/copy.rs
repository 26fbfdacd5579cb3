//! File copy strategies

use crate::config::CopyMode;
use crate::hash::digest_file;
use crate::types::{Digest, SyncError};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Copy buffer size
const BUFFER_SIZE: usize = 128 * 1024;

/// Temporary file naming for safe copies: `.<random>.sparsync-tmp`
const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".sparsync-tmp";

/// Copy `src` to `dest` with the given strategy
///
/// `expected` and `hash_limit` are the digest and cap used when the source
/// was scanned; safe mode re-hashes the written bytes against them.
pub fn copy_file(
    src: &Path,
    dest: &Path,
    mode: CopyMode,
    expected: &Digest,
    hash_limit: Option<u64>,
) -> Result<u64, SyncError> {
    match mode {
        CopyMode::Risky => copy_file_overwrite(src, dest),
        CopyMode::Safe => copy_file_atomic(src, dest, expected, hash_limit),
    }
}

/// Copy by truncating and overwriting the target in place
///
/// Missing parent directories are created; a parent created concurrently
/// by another copy is not an error.
pub fn copy_file_overwrite(src: &Path, dest: &Path) -> Result<u64, SyncError> {
    ensure_parent(dest)?;

    let mut src_file = File::open(src).map_err(|e| SyncError::copy(src, e))?;
    let mut dest_file = File::create(dest).map_err(|e| SyncError::copy(dest, e))?;
    let total_bytes = stream(&mut src_file, &mut dest_file, src, dest)?;
    dest_file.flush().map_err(|e| SyncError::copy(dest, e))?;

    Ok(total_bytes)
}

/// Copy through a uniquely named sibling, verify, then rename over the target
///
/// 1. Create a fresh temporary file next to the target
/// 2. Stream the source into it, flush and sync to disk
/// 3. Re-hash the temporary file and compare with `expected`
/// 4. Persist it under the final name
///
/// The temporary name never matches an existing entry, so a source file that
/// happens to share it is not clobbered. It is removed on any failure.
pub fn copy_file_atomic(
    src: &Path,
    dest: &Path,
    expected: &Digest,
    hash_limit: Option<u64>,
) -> Result<u64, SyncError> {
    ensure_parent(dest)?;
    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut part = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| SyncError::copy(parent, e))?;
    let part_path = part.path().to_path_buf();

    let mut src_file = File::open(src).map_err(|e| SyncError::copy(src, e))?;
    let total_bytes = stream(&mut src_file, part.as_file_mut(), src, &part_path)?;
    part.as_file()
        .sync_all()
        .map_err(|e| SyncError::copy(&part_path, e))?;

    let written = digest_file(&part_path, hash_limit).map_err(|e| match e {
        SyncError::Hash { path, source } => SyncError::Copy { path, source },
        other => other,
    })?;
    if &written != expected {
        // Dropping `part` deletes it
        return Err(SyncError::ChecksumMismatch {
            path: dest.to_path_buf(),
        });
    }

    part.persist(dest)
        .map_err(|e| SyncError::copy(dest, e.error))?;
    Ok(total_bytes)
}

fn ensure_parent(dest: &Path) -> Result<(), SyncError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::copy(parent, e))?;
    }
    Ok(())
}

fn stream(
    reader: &mut File,
    writer: &mut File,
    src: &Path,
    dest: &Path,
) -> Result<u64, SyncError> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| SyncError::copy(src, e))?;

        if bytes_read == 0 {
            break; // EOF
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| SyncError::copy(dest, e))?;
        total_bytes += bytes_read as u64;
    }

    Ok(total_bytes)
}
