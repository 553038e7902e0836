//! Extraction benchmarks for rJSON-Exporter
//!
//! Measures the probe pipeline without network I/O:
//! - Path expression evaluation
//! - Engine runs over documents of growing size
//! - Exposition formatting

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rjson_exporter::jsonpath::{extract, OutputMode};
use rjson_exporter::transformer::{
    MetricDescriptor, MetricType, PrometheusFormatter, PrometheusMetric, ScrapeEngine, ScrapeKind,
};
use serde_json::{json, Value};

fn generate_document(num_items: usize) -> Value {
    let values: Vec<Value> = (0..num_items)
        .map(|i| {
            json!({
                "id": format!("id-{}", i),
                "count": i,
                "state": if i % 2 == 0 { "ACTIVE" } else { "INACTIVE" },
                "timestamp": 1657568506000i64 + i as i64,
            })
        })
        .collect();

    json!({
        "counter": 1234,
        "environment": "beta",
        "values": values,
    })
}

fn create_engine() -> ScrapeEngine {
    ScrapeEngine::new(vec![
        MetricDescriptor::new("example_global_value", "{ .counter }", ScrapeKind::Value)
            .with_metric_type(MetricType::Gauge)
            .with_label("environment", "{$.environment}"),
        MetricDescriptor::new(
            "example_value_active",
            "{.values[?(@.state == \"ACTIVE\")]}",
            ScrapeKind::Object {
                value_path: "{.count}".to_string(),
            },
        )
        .with_label("id", "{.id}")
        .with_label("environment", "{$.environment}"),
        MetricDescriptor::new(
            "example_value_all",
            "{.values[*]}",
            ScrapeKind::Object {
                value_path: "{.count}".to_string(),
            },
        )
        .with_label("id", "{.id}")
        .with_epoch_timestamp("{.timestamp}"),
    ])
}

fn benchmark_extract(c: &mut Criterion) {
    let document = generate_document(10);
    let mut group = c.benchmark_group("extract");

    for expression in [
        "{.counter}",
        "$.environment",
        "{.values[3].id}",
        "{.values[?(@.state == \"ACTIVE\")].count}",
        "{..id}",
    ] {
        group.bench_with_input(
            BenchmarkId::new("text", expression),
            &expression,
            |b, expr| b.iter(|| extract(&document, expr, OutputMode::Text)),
        );
    }

    group.bench_function("json/values", |b| {
        b.iter(|| extract(&document, "{.values}", OutputMode::Json))
    });

    group.finish();
}

fn benchmark_engine(c: &mut Criterion) {
    let engine = create_engine();
    let mut group = c.benchmark_group("engine_collect");

    for size in [10, 100, 1000] {
        let document = generate_document(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &document, |b, doc| {
            b.iter(|| engine.collect(doc).count())
        });
    }

    group.finish();
}

fn benchmark_full_probe(c: &mut Criterion) {
    let engine = create_engine();
    let formatter = PrometheusFormatter::new().with_timestamps(true);
    let raw = serde_json::to_vec(&generate_document(100)).unwrap_or_default();

    c.bench_function("probe_pipeline/100", |b| {
        b.iter(|| {
            let document: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);
            let metrics: Vec<PrometheusMetric> = engine
                .collect(&document)
                .map(|o| o.to_prometheus())
                .collect();
            formatter.format(&metrics)
        })
    });
}

criterion_group!(
    benches,
    benchmark_extract,
    benchmark_engine,
    benchmark_full_probe
);
criterion_main!(benches);
