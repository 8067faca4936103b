// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for continuity analysis and metadata resolution

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use pitr_heal::{ArchiveEngine, FixedClock, MemoryNotifier};
use pitr_storage::InMemoryArchiveStore;
use pitr_wal::{ArchiveDay, ContinuityCalculator, ObservedSegments, SegmentName};

const DAY: &str = "2024-03-01";

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 1, 0).unwrap()
}

/// `len` consecutive segments, one minute apart, optionally with one hole
/// in the middle.
fn observed(len: usize, with_gap: bool) -> ObservedSegments {
    let mut current = SegmentName::parse("000000010000000000000001").unwrap();
    let mut out = ObservedSegments::new();
    for i in 0..len {
        if !(with_gap && i == len / 2) {
            out.insert(current.to_string(), base_time() + Duration::minutes(i as i64 + 1));
        }
        current = current.successor().unwrap();
    }
    out
}

// ============================================================================
// Continuity Benchmarks
// ============================================================================

fn bench_continuity(c: &mut Criterion) {
    let day = ArchiveDay::parse(DAY).unwrap();
    let calculator = ContinuityCalculator::default();

    let mut group = c.benchmark_group("continuity");
    for len in [100usize, 1_000, 10_000] {
        let contiguous = observed(len, false);
        let gapped = observed(len, true);
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("contiguous", len), &contiguous, |b, segments| {
            b.iter(|| black_box(calculator.calculate(&day, Some(base_time()), segments)))
        });
        group.bench_with_input(BenchmarkId::new("gap_midway", len), &gapped, |b, segments| {
            b.iter(|| black_box(calculator.calculate(&day, Some(base_time()), segments)))
        });
    }
    group.finish();
}

// ============================================================================
// Resolution Benchmarks
// ============================================================================

fn bench_resolution(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = InMemoryArchiveStore::new();
    rt.block_on(async {
        store.insert_object(DAY, "base.tar.gz", b"base", Some(base_time())).await;
        for (name, ts) in observed(1_000, false) {
            store.insert_object(DAY, &format!("WAL/{name}"), b"", Some(ts)).await;
        }
    });

    let engine = ArchiveEngine::builder(Arc::new(store), Arc::new(MemoryNotifier::new()))
        .clock(Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
        )))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("resolve");
    group.bench_function("live_scan_1000", |b| {
        b.to_async(&rt).iter(|| async {
            // Drop the cached entry so every iteration scans.
            let day = ArchiveDay::parse(DAY).unwrap();
            let empty = pitr_wal::PitrMetadata::total_loss(&day);
            engine.cache().refresh(&day, &empty).await;
            black_box(engine.get_metadata(DAY).await.unwrap())
        });
    });
    group.bench_function("cached", |b| {
        b.to_async(&rt).iter(|| async { black_box(engine.get_metadata(DAY).await.unwrap()) });
    });
    group.finish();
}

criterion_group!(continuity_benches, bench_continuity);
criterion_group!(resolution_benches, bench_resolution);
criterion_main!(continuity_benches, resolution_benches);
