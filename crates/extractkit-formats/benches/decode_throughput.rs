//! Decoder throughput benchmarks.
//!
//! Feeds pre-built documents through the CSV and JSON decoders in fixed-size
//! chunks, without an async runtime.
//!
//! # Running
//! ```bash
//! cargo bench --package extractkit-formats
//! ```

use std::collections::VecDeque;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use extractkit_core::CsvOptions;
use extractkit_formats::{CsvDecoder, JsonDecoder, RecordDecoder};

// ─── Document factories ───────────────────────────────────────────────────────

fn make_csv(rows: usize) -> Vec<u8> {
    let mut doc = String::from("id,name,email,comment\n");
    for i in 0..rows {
        doc.push_str(&format!(
            "{i},user-{i},user{i}@example.com,\"note {i}, with \"\"quotes\"\"\"\n"
        ));
    }
    doc.into_bytes()
}

fn make_json_array(rows: usize) -> Vec<u8> {
    let items: Vec<String> = (0..rows)
        .map(|i| {
            format!(
                r#"{{"id":{i},"name":"user-{i}","tags":["a","b"],"score":{}.5}}"#,
                i % 100
            )
        })
        .collect();
    format!("[{}]", items.join(",")).into_bytes()
}

fn run(decoder: &mut dyn RecordDecoder, doc: &[u8], chunk: usize) -> usize {
    let mut out = VecDeque::new();
    let mut n = 0;
    for piece in doc.chunks(chunk) {
        let _ = decoder.feed(piece, &mut out);
        n += out.len();
        out.clear();
    }
    let _ = decoder.finish(&mut out);
    n + out.len()
}

// ─── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_decode");
    for rows in [1_000, 10_000, 100_000] {
        let doc = make_csv(rows);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &doc, |b, doc| {
            b.iter(|| run(&mut CsvDecoder::new(CsvOptions::default()), doc, 64 * 1024));
        });
    }
    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_array_decode");
    for rows in [1_000, 10_000, 100_000] {
        let doc = make_json_array(rows);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &doc, |b, doc| {
            b.iter(|| run(&mut JsonDecoder::new(), doc, 64 * 1024));
        });
    }
    group.finish();
}

fn bench_small_chunks(c: &mut Criterion) {
    let doc = make_json_array(10_000);
    let mut group = c.benchmark_group("json_chunk_size");
    group.throughput(Throughput::Bytes(doc.len() as u64));
    for chunk in [64, 1024, 16 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| run(&mut JsonDecoder::new(), &doc, chunk));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_csv, bench_json, bench_small_chunks);
criterion_main!(benches);
