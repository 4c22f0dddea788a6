//! Parse throughput per dialect.

#![allow(missing_docs, clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use cs_core::{BodyMode, KeyValue, RequestFile};
use cs_format::{
    parse_request, parse_request_reduced, stringify_request, Format, ParseOptions,
    StringifyOptions,
};

fn sample(body_bytes: usize) -> RequestFile {
    let mut file = RequestFile::new("Bench");
    file.request.url = "{{host}}/bench".to_owned();
    file.request.headers = (0..20)
        .map(|i| KeyValue::new(format!("x-header-{i}"), "value"))
        .collect();
    file.request.body.mode = BodyMode::Json;
    file.request.body.json = Some(format!("{{\"data\": \"{}\"}}", "x".repeat(body_bytes)));
    file
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_request");
    let file = sample(16 * 1024);
    for format in [Format::Primary, Format::Yaml, Format::OpenCollection] {
        let text = stringify_request(&file, StringifyOptions::new(format)).unwrap();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format.as_str(), |b| {
            b.iter(|| parse_request(black_box(&text), ParseOptions::new(format)).unwrap());
        });
    }
    group.finish();
}

fn bench_reduced(c: &mut Criterion) {
    let file = sample(4 * 1024 * 1024);
    let text = stringify_request(&file, StringifyOptions::new(Format::Primary)).unwrap();
    c.bench_function("parse_request_reduced/primary-4mb", |b| {
        b.iter(|| parse_request_reduced(black_box(&text), ParseOptions::default(), 256 * 1024).unwrap());
    });
}

criterion_group!(benches, bench_parse, bench_reduced);
criterion_main!(benches);
