//! Fingerprinting performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fp_core::hash::{hash_bytes, hash_bytes_normalized_line_endings};
use fp_core::{FileMetadata, FileSystemSnapshot, RelativePath, RootSnapshot, SnapshotEntry};
use fp_execution::{
    FileCollectionFingerprinter, FileNormalizationSpec, InputBehavior, InputFileValue, InputFingerprinter,
    NoopOperationRunner, PathSensitivity,
};
use fp_files::FileCollection;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

fn synthetic_snapshot(files: usize) -> FileSystemSnapshot {
    let root = PathBuf::from("/bench/src");
    let mut entries = vec![SnapshotEntry::directory(root.clone(), RelativePath::root())];
    for i in 0..files {
        let relative = format!("pkg{}/file{i}.rs", i % 32);
        entries.push(SnapshotEntry::regular_file(
            root.join(&relative),
            RelativePath::from_slash_separated(&relative),
            hash_bytes(relative.as_bytes()),
            FileMetadata {
                length: relative.len() as u64,
                modified_nanos: i as u128,
            },
        ));
    }
    FileSystemSnapshot::from_roots(vec![RootSnapshot {
        root,
        archive: false,
        entries,
    }])
}

fn bench_hashing(c: &mut Criterion) {
    let small = vec![b'a'; 512];
    let large: Vec<u8> = b"line of text\r\n".iter().copied().cycle().take(4 * 1024 * 1024).collect();

    c.bench_function("hash_bytes_small", |b| b.iter(|| hash_bytes(black_box(&small))));
    c.bench_function("hash_bytes_large", |b| b.iter(|| hash_bytes(black_box(&large))));
    c.bench_function("hash_normalized_line_endings_large", |b| {
        b.iter(|| hash_bytes_normalized_line_endings(black_box(&large)))
    });
}

fn bench_fingerprinting(c: &mut Criterion) {
    let snapshot = synthetic_snapshot(10_000);

    for path in [PathSensitivity::Absolute, PathSensitivity::Relative, PathSensitivity::NameOnly] {
        let fingerprinter = FileCollectionFingerprinter::new(FileNormalizationSpec::new(path));
        c.bench_function(&format!("fingerprint_10k_{}", path.identifier().to_lowercase()), |b| {
            b.iter(|| fingerprinter.fingerprint(black_box(&snapshot), None).map(|f| f.hash()))
        });
    }
}

fn bench_pass(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    for i in 0..200 {
        std::fs::write(dir.path().join(format!("f{i}.txt")), format!("content {i}")).unwrap();
    }
    let fingerprinter = InputFingerprinter::default().with_runner(NoopOperationRunner);
    let files = FileCollection::of_paths([dir.path()]);

    c.bench_function("pass_200_files", |b| {
        b.iter_batched(
            || files.clone(),
            |files| {
                fingerprinter.fingerprint_input_properties(
                    &BTreeMap::new(),
                    &BTreeMap::new(),
                    Arc::new(BTreeMap::new()),
                    Arc::new(BTreeMap::new()),
                    |visitor| {
                        visitor.visit_input_property("opt", || "release")?;
                        visitor.visit_input_file_property("sources", InputBehavior::Primary, || {
                            InputFileValue::new(files, PathSensitivity::Relative)
                        })
                    },
                )
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_hashing, bench_fingerprinting, bench_pass);
criterion_main!(benches);
