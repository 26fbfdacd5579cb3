//! End-to-end backup integration tests.
//!
//! Path mapping, idempotence, overwrite behaviour and failure aggregation.

use sparsync::commands::backup::run;
use sparsync::compare::DestinationIndex;
use sparsync::scanner::{build_tree, ScanOptions};
use sparsync::{Config, CopyMode, SyncError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn config_for(source: &Path, destination: &Path) -> Config {
    Config {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        ..Config::default()
    }
}

fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write file");
}

fn count_files(root: &Path) -> usize {
    let tree = build_tree(root, &ScanOptions::default(), None).expect("scan tree");
    tree.total_files
}

#[test]
fn test_backup_into_empty_destination() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "root.txt", b"root-content");
    write(src.path(), "x/y.txt", b"nested-content");

    run(&config_for(src.path(), dst.path())).expect("backup should succeed");

    assert_eq!(
        fs::read(dst.path().join("root.txt")).expect("read copied root file"),
        b"root-content"
    );
    assert_eq!(
        fs::read(dst.path().join("x/y.txt")).expect("read copied nested file"),
        b"nested-content"
    );
}

#[test]
fn test_backup_creates_missing_destination_root() {
    let src = TempDir::new().expect("create src tempdir");
    let parent = TempDir::new().expect("create parent tempdir");
    write(src.path(), "a/b/c.txt", b"deep");
    let dst = parent.path().join("fresh-backup");

    run(&config_for(src.path(), &dst)).expect("backup should succeed");

    assert_eq!(fs::read(dst.join("a/b/c.txt")).expect("read copied file"), b"deep");
}

#[test]
fn test_second_backup_copies_nothing() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "one.txt", b"1");
    write(src.path(), "dir/two.txt", b"2");
    write(src.path(), "dir/sub/three.txt", b"3");
    let config = config_for(src.path(), dst.path());

    run(&config).expect("first backup");
    let first = DestinationIndex::from_tree(
        &build_tree(dst.path(), &ScanOptions::default(), None).expect("scan dst"),
    );

    run(&config).expect("second backup");
    let second = DestinationIndex::from_tree(
        &build_tree(dst.path(), &ScanOptions::default(), None).expect("scan dst"),
    );

    assert_eq!(first, second);
    assert_eq!(count_files(dst.path()), 3);
}

#[test]
fn test_content_present_elsewhere_is_not_copied() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "docs/report.pdf", b"pdf-bytes");
    write(dst.path(), "archive/2023/report-final.pdf", b"pdf-bytes");

    run(&config_for(src.path(), dst.path())).expect("backup should succeed");

    assert!(!dst.path().join("docs/report.pdf").exists());
    assert_eq!(count_files(dst.path()), 1);
}

#[test]
fn test_scattered_directory_is_not_copied() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "d/a.txt", b"alpha");
    write(src.path(), "d/b.txt", b"beta");
    write(dst.path(), "here/a.txt", b"alpha");
    write(dst.path(), "there/b.txt", b"beta");

    run(&config_for(src.path(), dst.path())).expect("backup should succeed");

    assert!(!dst.path().join("d").exists());
}

#[test]
fn test_empty_directory_is_not_created() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    fs::create_dir(src.path().join("hollow")).expect("create empty dir");
    write(src.path(), "file.txt", b"f");

    run(&config_for(src.path(), dst.path())).expect("backup should succeed");

    assert!(dst.path().join("file.txt").exists());
    assert!(!dst.path().join("hollow").exists());
}

#[test]
fn test_risky_overwrites_non_matching_target() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "same.txt", b"new-data");
    write(dst.path(), "same.txt", b"old");

    run(&config_for(src.path(), dst.path())).expect("backup should succeed");

    assert_eq!(
        fs::read(dst.path().join("same.txt")).expect("read updated file"),
        b"new-data"
    );
}

#[test]
fn test_safe_mode_leaves_no_part_files() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    for i in 0..10 {
        write(src.path(), &format!("batch/file{i}.txt"), format!("body {i}").as_bytes());
    }
    write(dst.path(), "batch/file3.txt", b"stale");

    let config = Config {
        copy_mode: CopyMode::Safe,
        ..config_for(src.path(), dst.path())
    };
    run(&config).expect("backup should succeed");

    assert_eq!(
        fs::read(dst.path().join("batch/file3.txt")).expect("read replaced file"),
        b"body 3"
    );
    let leftovers: Vec<_> = fs::read_dir(dst.path().join("batch"))
        .expect("list batch dir")
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".sparsync-tmp"))
        .collect();
    assert!(leftovers.is_empty(), "found temporary files: {leftovers:?}");
}

fn safe_backup_keeps_part_suffixed_files(threads: usize) {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    for i in 0..10 {
        write(src.path(), &format!("f{i}"), format!("plain {i}").as_bytes());
        write(src.path(), &format!("f{i}.part"), format!("suffixed {i}").as_bytes());
    }
    let config = Config {
        copy_mode: CopyMode::Safe,
        threads,
        ..config_for(src.path(), dst.path())
    };

    run(&config).expect("backup should succeed");

    for i in 0..10 {
        assert_eq!(
            fs::read(dst.path().join(format!("f{i}"))).expect("read plain file"),
            format!("plain {i}").as_bytes()
        );
        assert_eq!(
            fs::read(dst.path().join(format!("f{i}.part"))).expect("read .part file"),
            format!("suffixed {i}").as_bytes()
        );
    }
    assert_eq!(count_files(dst.path()), 20);

    // Nothing is lost, so a second run has nothing to do
    let second = sparsync::commands::take_inventory(
        &config,
        &std::sync::Arc::new(std::sync::Mutex::new(sparsync::ui::ProgressReporter::hidden())),
    )
    .expect("inventory");
    assert_eq!(second.stats.files_pending, 0);
}

#[test]
fn test_safe_backup_keeps_part_suffixed_files_sequential() {
    safe_backup_keeps_part_suffixed_files(1);
}

#[test]
fn test_safe_backup_keeps_part_suffixed_files_parallel() {
    safe_backup_keeps_part_suffixed_files(4);
}

#[test]
fn test_single_thread_matches_parallel_result() {
    let src = TempDir::new().expect("create src tempdir");
    let serial = TempDir::new().expect("create serial dst");
    let parallel = TempDir::new().expect("create parallel dst");
    for i in 0..25 {
        write(src.path(), &format!("d{}/f{i}", i % 5), format!("{i}").as_bytes());
    }

    let one = Config {
        threads: 1,
        ..config_for(src.path(), serial.path())
    };
    let many = Config {
        threads: 8,
        ..config_for(src.path(), parallel.path())
    };
    run(&one).expect("serial backup");
    run(&many).expect("parallel backup");

    let scan = |root: &Path| {
        DestinationIndex::from_tree(
            &build_tree(root, &ScanOptions::default(), None).expect("scan"),
        )
    };
    assert_eq!(scan(serial.path()), scan(parallel.path()));
}

#[test]
#[cfg(unix)]
fn test_copy_failure_does_not_abort_other_copies() {
    let src = TempDir::new().expect("create src tempdir");
    let dst = TempDir::new().expect("create dst tempdir");
    write(src.path(), "blocked/inner.txt", b"cannot land");
    write(src.path(), "fine.txt", b"lands");
    // A file where a directory is needed makes the nested copy fail
    write(dst.path(), "blocked", b"i am a file");

    let config = Config {
        threads: 1,
        ..config_for(src.path(), dst.path())
    };
    let err = run(&config).expect_err("one copy should fail");

    match err {
        SyncError::CopyFailures { failed, total, .. } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 2);
        }
        other => panic!("expected aggregated copy failures, got {other}"),
    }
    assert_eq!(fs::read(dst.path().join("fine.txt")).expect("read fine"), b"lands");
}
