//! Benchmarks for dirdiff
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_batch_insert(c: &mut Criterion) {
    use dirdiff::config::FingerprintMode;
    use dirdiff::store::{CatalogRecord, CatalogStore};

    c.bench_function("catalog_insert_batch_1000", |b| {
        let dir = tempfile::tempdir().unwrap();
        let store =
            CatalogStore::open(&dir.path().join("bench.db"), FingerprintMode::Digest).unwrap();

        let records: Vec<CatalogRecord> = (0..1000)
            .map(|i| CatalogRecord {
                bucket: "bench".into(),
                path: format!("dir{}/file{}.dat", i % 10, i),
                fingerprint: format!("{:064x}", i),
            })
            .collect();

        b.iter(|| {
            store.insert_batch(black_box(&records)).unwrap();
        })
    });
}

fn benchmark_fingerprint_digest(c: &mut Criterion) {
    use dirdiff::fingerprint;

    c.bench_function("fingerprint_digest_1mb", |b| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, vec![0xABu8; 1024 * 1024]).unwrap();

        b.iter(|| {
            let fp = fingerprint::digest(black_box(&path)).unwrap();
            black_box(fp);
        })
    });
}

fn benchmark_template_render(c: &mut Criterion) {
    use dirdiff::repair::command::render;
    use dirdiff::store::RepairTask;

    c.bench_function("command_render", |b| {
        let task = RepairTask {
            bucket: "pool-a".into(),
            path: "deep/nested/path/file.dat".into(),
            abs_path: "/mnt/pool1/pool-a/deep/nested/path/file.dat".into(),
        };

        b.iter(|| {
            let rendered = render(
                black_box("scp {ABSPATH} remote:/restore/{BUCKET}/{PATH}"),
                black_box(&task),
            );
            black_box(rendered);
        })
    });
}

criterion_group!(
    benches,
    benchmark_batch_insert,
    benchmark_fingerprint_digest,
    benchmark_template_render
);
criterion_main!(benches);
