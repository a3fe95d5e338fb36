use criterion::{Criterion, criterion_group, criterion_main};
use dashboard_sync::SnapshotNormalizer;
use dashboard_sync::feed::build_snapshot;
use lazy_static::lazy_static;
use serde_json::{Value, json};
use std::hint::black_box;

lazy_static! {
    static ref FULL_PAYLOAD: String = serde_json::to_string(&build_snapshot(17)).unwrap_or_default();
    static ref PARTIAL_PAYLOAD: Value = json!({
        "metrics": { "portfolioValue": 131_002.5, "fearGreedIndex": 140, "dominanceMap": { "BTC": 52.1 } },
        "assets": { "tokens": [] },
    });
    static ref OVERSIZED_PAYLOAD: Value = json!({
        "recentActivities": (0..250).map(|i| json!({
            "action": "Bought ETH", "amount": format!("+{} ETH", i), "value": "$1.00", "time": "just now",
            "chain": "ETH", "chainColor": "bg-blue-500", "type": "buy"
        })).collect::<Vec<_>>(),
    });
}

fn benchmark_normalizer(c: &mut Criterion) {
    let normalizer = SnapshotNormalizer::default();
    let mut group = c.benchmark_group("normalizer");

    group.bench_function("normalize_text_full", |b| {
        b.iter(|| normalizer.normalize_text(black_box(FULL_PAYLOAD.as_str())))
    });
    group.bench_function("normalize_partial", |b| b.iter(|| normalizer.normalize(black_box(&PARTIAL_PAYLOAD))));
    group.bench_function("normalize_oversized_activities", |b| {
        b.iter(|| normalizer.normalize(black_box(&OVERSIZED_PAYLOAD)))
    });
    group.bench_function("normalize_garbage", |b| b.iter(|| normalizer.normalize_text(black_box("not json"))));
    group.finish();
}

criterion_group!(benches, benchmark_normalizer);
criterion_main!(benches);
