//! Parsing benchmarks.
//!
//! Compares one-shot and chunked DOM building against serde_json.
//!
//! Run with: cargo bench --bench parse

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jsondom_core::Document;

/// Flat array of small records, `count` entries long.
fn generate_records(count: usize) -> String {
    let mut out = String::from("[");
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            r#"{{"id":{i},"name":"item {i}","price":{}.25,"tags":["a","b"],"active":{}}}"#,
            i % 97,
            i % 2 == 0
        ));
    }
    out.push(']');
    out
}

/// Nested objects, `depth` levels deep.
fn generate_nested(depth: usize) -> String {
    let mut out = String::new();
    for i in 0..depth {
        out.push_str(&format!(r#"{{"level":{i},"child":"#));
    }
    out.push_str("null");
    out.push_str(&"}".repeat(depth));
    out
}

fn bench_parse_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_records");

    for count in [10, 100, 1000] {
        let input = generate_records(count);
        group.throughput(Throughput::Bytes(input.len() as u64));

        group.bench_with_input(BenchmarkId::new("jsondom", count), &input, |b, input| {
            b.iter(|| {
                let mut doc = Document::new();
                doc.parse(black_box(input));
                doc.finish()
            })
        });

        group.bench_with_input(BenchmarkId::new("serde_json", count), &input, |b, input| {
            b.iter(|| serde_json::from_str::<serde_json::Value>(black_box(input)).is_ok())
        });
    }

    group.finish();
}

/// Reuse one document across iterations, resetting the arena in between.
fn bench_parse_reset(c: &mut Criterion) {
    let input = generate_records(1000);
    let mut group = c.benchmark_group("parse_reset");
    group.throughput(Throughput::Bytes(input.len() as u64));

    let mut doc = Document::new();
    group.bench_function("records_1000", |b| {
        b.iter(|| {
            doc.reset();
            doc.parse(black_box(&input));
            doc.finish()
        })
    });

    group.finish();
}

fn bench_parse_chunked(c: &mut Criterion) {
    let input = generate_records(1000);
    let bytes = input.as_bytes();
    let mut group = c.benchmark_group("parse_chunked");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    for chunk in [16, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut doc = Document::new();
                for piece in bytes.chunks(chunk) {
                    doc.parse_bytes(black_box(piece));
                }
                doc.finish()
            })
        });
    }

    group.finish();
}

fn bench_parse_nested(c: &mut Criterion) {
    let input = generate_nested(256);
    let mut group = c.benchmark_group("parse_nested");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("depth_256", |b| {
        b.iter(|| {
            let mut doc = Document::new();
            doc.parse(black_box(&input));
            doc.finish()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_records,
    bench_parse_reset,
    bench_parse_chunked,
    bench_parse_nested,
);
criterion_main!(benches);
