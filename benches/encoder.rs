#[macro_use]
extern crate criterion;

use bytes::Bytes;
use criterion::{black_box, Criterion};

use mpack::prelude::*;

pub fn u64_to_bytes_le(x: u64) -> Bytes { Bytes::from(u64::to_le_bytes(x).to_vec()) }

const N_BIG_ARR: usize = 2000;

fn big_arr() -> Vec<i64> { (0..N_BIG_ARR as i64).collect() }

const N_ARR: usize = 10;
const N_MAP: usize = 10;

fn big_v() -> Value {
    let v0: Vec<Value> = (0..N_ARR).map(|i| Value::from(i as i64)).collect();
    let m: Vec<(Value, Value)> = (0..N_MAP)
        .map(|i| (Value::from(u64_to_bytes_le(i as u64)), Value::from(v0.clone())))
        .collect();
    let v: Vec<Value> = std::iter::repeat(m).map(Value::Map).take(N_ARR).collect();
    Value::from(v)
}

#[derive(Record, Clone, Default)]
struct Sample {
    pub id: u64,
    pub name: String,
    pub score: f64,
    #[msgpack(tag = "t,omitempty")]
    pub tags: Vec<String>,
    pub at: Timestamp,
}

const N_RECORDS: usize = 500;

fn records() -> Vec<Sample> {
    (0..N_RECORDS)
        .map(|i| Sample {
            id: i as u64,
            name: format!("sample-{}", i),
            score: i as f64 / 3.0,
            tags: if i % 2 == 0 { vec!["even".into()] } else { vec![] },
            at: Timestamp::new(1_600_000_000 + i as i64, 0).unwrap_or_default(),
        })
        .collect()
}

fn bench_construction(c: &mut Criterion) {
    c.bench_function(
        &format!(
            "Creating a Value of size {}",
            encode(&big_v(), Mode::Map).unwrap().len()
        ),
        |b| b.iter(|| black_box(big_v())),
    );
}

fn bench_size(c: &mut Criterion) {
    let big_v = big_v();
    let codec = Codec::new();
    c.bench_function(
        &format!(
            "Sizing a Value of size {}",
            codec.encoded_len(&big_v, Mode::Map).unwrap()
        ),
        move |b| b.iter(|| codec.encoded_len(black_box(&big_v), Mode::Map)),
    );
}

fn bench_enc(c: &mut Criterion) {
    let big_v = big_v();
    let enc_len = encode(&big_v, Mode::Map).unwrap().len();
    c.bench_function(
        &format!("Encoding a Value, output size of {} bytes", enc_len),
        move |b| b.iter(|| encode(black_box(&big_v), Mode::Map)),
    );
}

fn bench_dec(c: &mut Criterion) {
    let enc = encode(&big_v(), Mode::Map).unwrap();
    c.bench_function(
        &format!("Decoding a Value, input size of {} bytes", enc.len()),
        move |b| b.iter(|| decode_value(black_box(&enc)).unwrap()),
    );
}

fn bench_records(c: &mut Criterion) {
    let records = records();
    for mode in [Mode::Map, Mode::Array] {
        let enc = encode(&records, mode).unwrap();
        let rs = records.clone();
        c.bench_function(
            &format!("Encoding {} records as {:?}, output size of {} bytes", N_RECORDS, mode, enc.len()),
            move |b| b.iter(|| encode(black_box(&rs), mode)),
        );
        c.bench_function(
            &format!("Decoding {} records as {:?}, input size of {} bytes", N_RECORDS, mode, enc.len()),
            move |b| b.iter(|| decode::<Vec<Sample>>(black_box(&enc), mode).unwrap()),
        );
    }
}

fn bench_enc_flat(c: &mut Criterion) {
    let big_arr = big_arr();
    let enc_len = encode(&big_arr, Mode::Map).unwrap().len();
    c.bench_function(
        &format!("Encoding an i64 vector, output size of {} bytes", enc_len),
        move |b| b.iter(|| encode(black_box(&big_arr), Mode::Map)),
    );
}

fn bench_dec_flat(c: &mut Criterion) {
    let enc = encode(&big_arr(), Mode::Map).unwrap();
    c.bench_function(
        &format!("Decoding an i64 vector of length {}", enc.len()),
        move |b| b.iter(|| decode::<Vec<i64>>(black_box(&enc), Mode::Map).unwrap()),
    );
}

criterion_group!(
    benches,
    bench_construction,
    bench_size,
    bench_enc,
    bench_dec,
    bench_records,
    bench_enc_flat,
    bench_dec_flat
);
criterion_main!(benches);
