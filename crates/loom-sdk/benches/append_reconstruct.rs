//! Hot-path benchmarks: append throughput and checkpointed
//! reconstruction vs. full replay.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use loom_sdk::{cell_push, CheckpointPolicy, Loom, LoomConfig, Sequence};
use serde_json::json;

fn populated(every: u64, records: u64) -> Loom {
    let loom = Loom::new(LoomConfig {
        checkpoint: CheckpointPolicy { every },
        ..Default::default()
    });
    for n in 0..records {
        loom.append(cell_push("items", json!(n))).unwrap();
    }
    loom
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("append_1k", |b| {
        b.iter_batched(
            || Loom::new(LoomConfig::default()),
            |loom| {
                for n in 0..1_000u64 {
                    loom.append(cell_push("items", json!(n))).unwrap();
                }
                loom
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_reconstruct(c: &mut Criterion) {
    let checkpointed = populated(64, 4_096);
    let bare = populated(u64::MAX, 4_096);

    c.bench_function("reconstruct_with_checkpoints", |b| {
        b.iter(|| checkpointed.cell_value_at("items", Sequence(4_000)).unwrap());
    });
    c.bench_function("reconstruct_full_replay", |b| {
        b.iter(|| bare.cell_value_at("items", Sequence(4_000)).unwrap());
    });
}

fn bench_tail(c: &mut Criterion) {
    let loom = populated(64, 4_096);
    c.bench_function("cell_tail_16", |b| {
        b.iter(|| loom.cell_tail("items", 16).unwrap());
    });
}

criterion_group!(benches, bench_append, bench_reconstruct, bench_tail);
criterion_main!(benches);
