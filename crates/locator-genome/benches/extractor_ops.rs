//! Extractor and Detector Benchmarks
//!
//! Benchmarks for selector extraction, snapshot diffing and history recording.
//!
//! Run with: `cargo bench --bench extractor_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use locator_genome::prelude::*;

fn sample(classes: usize) -> RawElementSnapshot {
    let class_list: Vec<String> = (0..classes)
        .map(|i| if i % 2 == 0 { format!("css-{i}x") } else { format!("btn-{i}") })
        .collect();
    RawElementSnapshot::new("button", "html > body > main > form > button:nth-child(3)")
        .with_id("submit")
        .with_name("submit")
        .with_classes(class_list)
        .with_data("testid", "submit-btn")
        .with_aria("label", "Submit order")
        .with_role("button")
        .with_text("Submit order")
        .at(2, 4)
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let extractor = SelectorExtractor::new();

    for classes in [0usize, 4, 32] {
        let raw = sample(classes);
        group.bench_with_input(BenchmarkId::new("classes", classes), &raw, |bench, raw| {
            bench.iter(|| black_box(extractor.extract(black_box(raw), None)));
        });
    }

    group.finish();
}

fn bench_extract_with_history(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut store = HistoryStore::new(dir.path().join("k.json"), 100);
    let extractor = SelectorExtractor::new();
    let raw = sample(4);
    let id = raw.tracking_id();
    for ts in 0..50 {
        let selectors = extractor.extract(&raw, store.history(&id));
        let code = ElementGeneticCode::from_raw(id.clone(), "#submit", raw.clone(), selectors, ts);
        store.record_evolution(&code, ts);
    }

    c.bench_function("extract_with_history", |bench| {
        bench.iter(|| black_box(extractor.extract(black_box(&raw), store.history(&id))));
    });
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    let detector = locator_genome::MutationDetector::new();
    let before = ElementGeneticCode::from_raw("t".into(), "#submit", sample(8), vec![], 0);

    let unchanged = ElementGeneticCode::from_raw("t".into(), "#submit", sample(8), vec![], 1);
    let mut raw = sample(12).with_text("Place order");
    raw.attributes.id = None;
    raw.position.path = "html > body > div > form > button".to_string();
    let changed = ElementGeneticCode::from_raw("t".into(), "#submit", raw, vec![], 1);

    for (name, after) in [("unchanged", &unchanged), ("changed", &changed)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), after, |bench, after| {
            bench.iter(|| black_box(detector.detect(black_box(&before), black_box(after))));
        });
    }

    group.finish();
}

fn bench_record_evolution(c: &mut Criterion) {
    let extractor = SelectorExtractor::new();
    let raw = sample(4);
    let id = raw.tracking_id();

    c.bench_function("record_evolution", |bench| {
        let dir = tempfile::tempdir().unwrap();
        let mut store = HistoryStore::new(dir.path().join("k.json"), 100);
        let mut ts = 0u64;
        bench.iter(|| {
            ts += 1;
            let selectors = extractor.extract(&raw, store.history(&id));
            let code = ElementGeneticCode::from_raw(id.clone(), "#submit", raw.clone(), selectors, ts);
            black_box(store.record_evolution(&code, ts));
        });
    });
}

criterion_group!(
    benches,
    bench_extract,
    bench_extract_with_history,
    bench_detect,
    bench_record_evolution
);
criterion_main!(benches);
