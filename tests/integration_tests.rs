//! Integration tests for dirdiff
//!
//! These drive the full pipeline through the public API: scan real
//! temporary trees into catalog stores, diff them, and repair the
//! differences with a real external command.

use dirdiff::analyze::analyze;
use dirdiff::builder::build;
use dirdiff::config::{Config, FingerprintMode};
use dirdiff::diff::diff;
use dirdiff::repair::repair;
use dirdiff::store::{CatalogStore, RepairQueue, RepairTask};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn config(db: &Path, bucket: &str, root: &Path, incremental: bool, mode: FingerprintMode) -> Config {
    let mut buckets = BTreeMap::new();
    buckets.insert(bucket.to_string(), root.to_path_buf());
    Config {
        store_path: db.to_path_buf(),
        buckets,
        incremental,
        workers: 2,
        mode,
    }
}

#[test]
fn test_concrete_mismatch_scenario() {
    let dir = tempdir().unwrap();

    // Source side: the machine holding the good copies
    let src_root = dir.path().join("src/b1");
    fs::create_dir_all(&src_root).unwrap();
    fs::write(src_root.join("a.txt"), b"X").unwrap();
    fs::write(src_root.join("b.txt"), b"Y").unwrap();

    // Target side: b.txt arrived corrupted
    let tgt_root = dir.path().join("tgt/b1");
    fs::create_dir_all(&tgt_root).unwrap();
    fs::write(tgt_root.join("a.txt"), b"X").unwrap();
    fs::write(tgt_root.join("b.txt"), b"Z").unwrap();

    let source_db = dir.path().join("source.db");
    let target_db = dir.path().join("target.db");

    build(
        &config(&source_db, "b1", &src_root, false, FingerprintMode::Digest),
        100,
        None,
    )
    .unwrap();
    let target_config = config(&target_db, "b1", &tgt_root, false, FingerprintMode::Digest);
    build(&target_config, 100, None).unwrap();

    // Diff the source catalog against the target catalog
    let report = dir.path().join("diffresult.csv");
    let stats = diff(&target_config, &source_db, &report).unwrap();
    assert_eq!(stats.missing, 0);
    assert_eq!(stats.mismatched, 1);

    let text = fs::read_to_string(&report).unwrap();
    assert_eq!(text, "b1,b.txt,checksum wrong\n");

    // Repair: re-copy from the source tree into the target tree. The
    // repair config resolves absolute paths against the source roots.
    let queue_path = dir.path().join("repair.db");
    let src_config = config(&source_db, "b1", &src_root, false, FingerprintMode::Digest);
    let template = format!("cp {{ABSPATH}} {}/{{BUCKET}}/{{PATH}}", dir.path().join("tgt").display());

    let stats = repair(&src_config, &report, &queue_path, &template, false).unwrap();
    assert_eq!(stats.generated, 1);
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.command_failures, 0);

    // The corrupted file is overwritten and the queue is empty
    assert_eq!(fs::read(tgt_root.join("b.txt")).unwrap(), b"Y");
    let queue = RepairQueue::open(&queue_path).unwrap();
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_diff_is_one_directional() {
    let dir = tempdir().unwrap();

    let src_root = dir.path().join("src/b1");
    let tgt_root = dir.path().join("tgt/b1");
    fs::create_dir_all(&src_root).unwrap();
    fs::create_dir_all(&tgt_root).unwrap();
    fs::write(src_root.join("shared.txt"), b"same").unwrap();
    fs::write(tgt_root.join("shared.txt"), b"same").unwrap();
    // Present only in the target: must not be reported
    fs::write(tgt_root.join("extra.txt"), b"surplus").unwrap();

    let source_db = dir.path().join("source.db");
    let target_db = dir.path().join("target.db");

    build(
        &config(&source_db, "b1", &src_root, false, FingerprintMode::Digest),
        100,
        None,
    )
    .unwrap();
    let target_config = config(&target_db, "b1", &tgt_root, false, FingerprintMode::Digest);
    build(&target_config, 100, None).unwrap();

    let report = dir.path().join("diffresult.csv");
    let stats = diff(&target_config, &source_db, &report).unwrap();

    assert_eq!(stats.total(), 0);
    assert_eq!(fs::read_to_string(&report).unwrap(), "");
}

#[test]
fn test_missing_file_detected_and_repaired() {
    let dir = tempdir().unwrap();

    let src_root = dir.path().join("src/b1");
    let tgt_root = dir.path().join("tgt/b1");
    fs::create_dir_all(src_root.join("nested")).unwrap();
    fs::create_dir_all(&tgt_root).unwrap();
    fs::write(src_root.join("nested/lost.txt"), b"precious").unwrap();

    let source_db = dir.path().join("source.db");
    let target_db = dir.path().join("target.db");

    build(
        &config(&source_db, "b1", &src_root, false, FingerprintMode::Digest),
        100,
        None,
    )
    .unwrap();
    let target_config = config(&target_db, "b1", &tgt_root, false, FingerprintMode::Digest);
    build(&target_config, 100, None).unwrap();

    let report = dir.path().join("diffresult.csv");
    diff(&target_config, &source_db, &report).unwrap();
    assert_eq!(
        fs::read_to_string(&report).unwrap(),
        "b1,nested/lost.txt,missing\n"
    );

    // cp does not create destination directories, so land the repair in
    // a flat directory rather than mirroring the nested layout
    let landing = dir.path().join("landing");
    fs::create_dir_all(&landing).unwrap();
    let queue_path = dir.path().join("repair.db");
    let src_config = config(&source_db, "b1", &src_root, false, FingerprintMode::Digest);
    let template = format!("cp {{ABSPATH}} {}/recovered.txt", landing.display());

    repair(&src_config, &report, &queue_path, &template, false).unwrap();
    assert_eq!(fs::read(landing.join("recovered.txt")).unwrap(), b"precious");
}

#[test]
fn test_incremental_rescan_changes_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("b1");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("one.txt"), b"1").unwrap();
    fs::write(root.join("two.txt"), b"2").unwrap();

    let db = dir.path().join("catalog.db");

    build(
        &config(&db, "b1", &root, false, FingerprintMode::Digest),
        100,
        None,
    )
    .unwrap();

    let store = CatalogStore::open_readonly(&db).unwrap();
    let mut before = Vec::new();
    store
        .for_each("b1", |p, fp| -> dirdiff::error::StoreResult<()> {
            before.push((p.to_string(), fp.to_string()));
            Ok(())
        })
        .unwrap();
    drop(store);

    // Incremental rescan over an unchanged tree: nothing new, nothing
    // rewritten
    let stats = build(
        &config(&db, "b1", &root, true, FingerprintMode::Digest),
        100,
        None,
    )
    .unwrap();
    assert_eq!(stats.cataloged, 0);
    assert_eq!(stats.skipped_existing, 2);

    let store = CatalogStore::open_readonly(&db).unwrap();
    let mut after = Vec::new();
    store
        .for_each("b1", |p, fp| -> dirdiff::error::StoreResult<()> {
            after.push((p.to_string(), fp.to_string()));
            Ok(())
        })
        .unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_size_mode_pipeline() {
    let dir = tempdir().unwrap();

    let src_root = dir.path().join("src/b1");
    let tgt_root = dir.path().join("tgt/b1");
    fs::create_dir_all(&src_root).unwrap();
    fs::create_dir_all(&tgt_root).unwrap();
    fs::write(src_root.join("f.bin"), vec![0u8; 4096]).unwrap();
    fs::write(tgt_root.join("f.bin"), vec![0u8; 4095]).unwrap();

    let source_db = dir.path().join("source.db");
    let target_db = dir.path().join("target.db");

    build(
        &config(&source_db, "b1", &src_root, false, FingerprintMode::Size),
        100,
        None,
    )
    .unwrap();
    let target_config = config(&target_db, "b1", &tgt_root, false, FingerprintMode::Size);
    build(&target_config, 100, None).unwrap();

    let report = dir.path().join("diffresult.csv");
    let stats = diff(&target_config, &source_db, &report).unwrap();
    assert_eq!(stats.mismatched, 1);
    assert_eq!(
        fs::read_to_string(&report).unwrap(),
        "b1,f.bin,checksum wrong\n"
    );
}

#[test]
fn test_resumed_repair_skips_generation_and_drains() {
    let dir = tempdir().unwrap();

    let src_root = dir.path().join("src/b1");
    fs::create_dir_all(&src_root).unwrap();
    fs::write(src_root.join("fresh.txt"), b"fresh").unwrap();
    fs::write(src_root.join("pending.txt"), b"pending").unwrap();

    // A report that names a file population would pick up
    let report = dir.path().join("diffresult.csv");
    fs::write(&report, "b1,fresh.txt,missing\n").unwrap();

    // Simulate a previous run that crashed after generating tasks but
    // before finishing the drain: one task is still pending
    let queue_path = dir.path().join("repair.db");
    {
        let queue = RepairQueue::open(&queue_path).unwrap();
        queue
            .insert_batch(&[RepairTask {
                bucket: "b1".into(),
                path: "pending.txt".into(),
                abs_path: src_root.join("pending.txt").to_string_lossy().into_owned(),
            }])
            .unwrap();
        assert_eq!(queue.len().unwrap(), 1);
    }

    let landing = dir.path().join("landing");
    fs::create_dir_all(&landing).unwrap();
    let src_config = config(
        &dir.path().join("unused.db"),
        "b1",
        &src_root,
        false,
        FingerprintMode::Digest,
    );
    let template = format!("cp {{ABSPATH}} {}/{{PATH}}", landing.display());

    let stats = repair(&src_config, &report, &queue_path, &template, true).unwrap();

    // Resume never generates: the queue held exactly what the crash left
    assert_eq!(stats.generated, 0);
    assert_eq!(stats.executed, 1);
    assert!(landing.join("pending.txt").exists());
    assert!(!landing.join("fresh.txt").exists());

    let queue = RepairQueue::open(&queue_path).unwrap();
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_analyze_after_target_catchup() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("b1");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("still-broken.txt"), vec![7u8; 2000]).unwrap();

    // Report written at diff time; one entry has been deleted since
    let report = dir.path().join("diffresult.csv");
    fs::write(
        &report,
        "b1,still-broken.txt,checksum wrong\n\
         b1,since-deleted.txt,missing\n\
         garbage line without fields\n",
    )
    .unwrap();

    let cfg = config(
        &dir.path().join("unused.db"),
        "b1",
        &root,
        false,
        FingerprintMode::Digest,
    );
    let stats = analyze(&cfg, &report).unwrap();

    assert_eq!(stats.count, 1);
    assert_eq!(stats.total_bytes, 2000);
    assert_eq!(stats.total_gb(), 0);
}
