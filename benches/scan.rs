//! Hot-path benchmarks: glob matching, KEYS, and SCAN pagination over a
//! populated in-memory store.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use keyspan::glob::glob_match;
use keyspan::scan::{matching_keys, scan_page, ScanOptions};
use keyspan::store::{MemoryStore, Store};

fn populated_store(entries: usize) -> MemoryStore {
    let store = MemoryStore::new();
    for i in 0..entries {
        let key = Bytes::from(format!("user:{i:06}"));
        let value = Bytes::from(format!("value:{i}"));
        store.put(key, value).unwrap();
    }
    // A second namespace so pattern filtering has something to reject.
    for i in 0..entries {
        let key = Bytes::from(format!("vote:{i:06}"));
        store.put(key, Bytes::from_static(b"x")).unwrap();
    }
    store
}

fn bench_glob(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob");
    group.throughput(Throughput::Elements(1));

    group.bench_function("exact", |b| {
        b.iter(|| black_box(glob_match(b"user:000123", b"user:000123")));
    });

    group.bench_function("trailing_star", |b| {
        b.iter(|| black_box(glob_match(b"user:*", b"user:000123")));
    });

    group.bench_function("interior_star", |b| {
        b.iter(|| black_box(glob_match(b"user:*23", b"user:000123")));
    });

    group.bench_function("rejecting", |b| {
        b.iter(|| black_box(glob_match(b"user:*", b"vote:000123")));
    });

    group.finish();
}

fn bench_keys(c: &mut Criterion) {
    let store = populated_store(10_000);

    let mut group = c.benchmark_group("keys");

    group.bench_function("star_full_range", |b| {
        b.iter(|| black_box(matching_keys(&store, b"*").unwrap()));
    });

    group.bench_function("prefix_restricted", |b| {
        b.iter(|| black_box(matching_keys(&store, b"user:*").unwrap()));
    });

    group.bench_function("interior_glob_full_scan", |b| {
        b.iter(|| black_box(matching_keys(&store, b"user:*99").unwrap()));
    });

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let store = populated_store(10_000);

    let mut group = c.benchmark_group("scan");

    group.bench_function("first_page", |b| {
        let opts = ScanOptions {
            cursor: 0,
            pattern: Some(Bytes::from_static(b"user:*")),
            count: 100,
        };
        b.iter(|| black_box(scan_page(&store, &opts).unwrap()));
    });

    group.bench_function("deep_page", |b| {
        // A late cursor pays for the full skip replay; this is the
        // worst case of the stateless cursor emulation.
        let opts = ScanOptions {
            cursor: 9_000,
            pattern: Some(Bytes::from_static(b"user:*")),
            count: 100,
        };
        b.iter(|| black_box(scan_page(&store, &opts).unwrap()));
    });

    group.bench_function("full_walk_by_pages", |b| {
        b.iter(|| {
            let mut cursor = 0u64;
            let mut total = 0usize;
            loop {
                let page = scan_page(
                    &store,
                    &ScanOptions {
                        cursor,
                        pattern: Some(Bytes::from_static(b"user:*")),
                        count: 1_000,
                    },
                )
                .unwrap();
                total += page.keys.len();
                cursor = page.cursor;
                if cursor == 0 {
                    break;
                }
            }
            black_box(total)
        });
    });

    group.finish();
}

fn bench_point_ops(c: &mut Criterion) {
    let store = populated_store(10_000);

    let mut group = c.benchmark_group("point_ops");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let key = format!("user:{:06}", i % 10_000);
            black_box(store.get(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.bench_function("put", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let key = Bytes::from(format!("bench:{i}"));
            store.put(key, Bytes::from_static(b"value")).unwrap();
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_glob, bench_keys, bench_scan, bench_point_ops);
criterion_main!(benches);
