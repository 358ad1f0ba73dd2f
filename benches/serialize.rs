#![allow(unused)]
extern crate mmdbforge;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use mmdbforge::{fixture, DataValue, Options, Reader, Writer};
use std::{hint::black_box, net::IpAddr};

/// Options for a synthetic IPv4 database with `count` /24 networks.
fn synthetic_writer(count: u32) -> Writer {
    let mut writer = Writer::new(
        Options::new("Bench-DB")
            .ip_version(4)
            .record_size(28)
            .build_epoch(0),
    )
    .unwrap();

    for index in 0..count {
        let network = format!("{}.{}.{}.0/24", 10 + (index >> 16), (index >> 8) & 0xFF, index & 0xFF);
        let record = DataValue::map()
            .entry("country", ["DE", "ES", "FR", "US"][(index % 4) as usize])
            .entry("asn", index % 1000)
            .entry("score", f64::from(index) / 7.0)
            .build();
        writer.insert_cidr(&network, record).unwrap();
    }
    writer
}

/// Benchmark building the test fixture end to end (without touching disk).
fn bench_fixture(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixture");
    group.bench_function("build_and_serialize", |b| {
        b.iter(|| {
            let mut writer = Writer::new(fixture::options()).unwrap();
            fixture::populate(&mut writer, fixture::records());
            black_box(writer.to_bytes().unwrap())
        });
    });
    group.finish();
}

/// Benchmark serialization of a larger database, where deduplication matters.
fn bench_serialize(c: &mut Criterion) {
    let writer = synthetic_writer(20_000);
    let size = writer.to_bytes().unwrap().len();

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("to_bytes_20k_networks", |b| {
        b.iter(|| black_box(writer.to_bytes().unwrap()));
    });
    group.finish();
}

/// Benchmark lookups against the serialized synthetic database.
fn bench_lookup(c: &mut Criterion) {
    let reader = Reader::from_bytes(synthetic_writer(20_000).to_bytes().unwrap()).unwrap();
    let hit: IpAddr = "10.0.42.7".parse().unwrap();
    let miss: IpAddr = "192.168.1.1".parse().unwrap();

    let mut group = c.benchmark_group("lookup");
    group.bench_function("hit", |b| {
        b.iter(|| black_box(reader.lookup(black_box(hit)).unwrap()));
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(reader.lookup(black_box(miss)).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_fixture, bench_serialize, bench_lookup);
criterion_main!(benches);
