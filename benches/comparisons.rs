#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use mpack::prelude::*;

fn mpack_i64_encode(c: &mut Criterion) {
    c.bench_function("MessagePack i64 encode", |b| {
        b.iter(|| encode(black_box(&1_000_000i64), Mode::Map))
    });
}

fn json_i64_encode(c: &mut Criterion) {
    c.bench_function("JSON i64 encode", |b| {
        b.iter(|| serde_json::to_string(&black_box(1_000_000i64)))
    });
}

fn mpack_i64_decode(c: &mut Criterion) {
    c.bench_function("MessagePack i64 decode", |b| {
        let buf = encode(&1_000_000i64, Mode::Map).unwrap();
        b.iter(|| decode::<i64>(black_box(&buf), Mode::Map))
    });
}

fn json_i64_decode(c: &mut Criterion) {
    c.bench_function("JSON i64 decode", |b| {
        let buf = serde_json::to_string(&1_000_000i64).unwrap();
        b.iter(|| serde_json::from_str::<i64>(black_box(&buf)))
    });
}

fn mpack_bin_encode(c: &mut Criterion) {
    c.bench_function("MessagePack binary encode", |b| {
        let s: Vec<u8> = (0..10_000).map(|x| x as u8).collect();
        b.iter(|| encode(black_box(&s), Mode::Map))
    });
}

fn json_bin_encode(c: &mut Criterion) {
    c.bench_function("JSON binary encode", |b| {
        let s: Vec<u8> = (0..10_000).map(|x| x as u8).collect();
        b.iter(|| serde_json::to_string(&black_box(&s)))
    });
}

fn mpack_str_encode(c: &mut Criterion) {
    c.bench_function("MessagePack string encode", |b| {
        let s: String = "mpack ".repeat(2_000);
        b.iter(|| encode(black_box(&s), Mode::Map))
    });
}

fn json_str_encode(c: &mut Criterion) {
    c.bench_function("JSON string encode", |b| {
        let s: String = "mpack ".repeat(2_000);
        b.iter(|| serde_json::to_string(&black_box(&s)))
    });
}

criterion_group!(
    benches,
    mpack_i64_encode,
    json_i64_encode,
    mpack_i64_decode,
    json_i64_decode,
    mpack_bin_encode,
    json_bin_encode,
    mpack_str_encode,
    json_str_encode,
);

criterion_main!(benches);
