//! FSE Benchmarks
//!
//! Measures histogram counting, table construction and block coding
//! throughput on skewed byte distributions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fsekit::fse::{
    compress_using_ctable, decompress_using_dtable, normalize_count, optimal_table_log,
};
use fsekit::hist::{self, HIST_WKSP_SIZE};
use fsekit::{
    block_bound, compress, compress_bound, decompress, CompressOutcome, DecodeTable, EncodeTable,
    FseConfig, Histogram, FSE_MAX_TABLELOG,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// Test Data Generators
// ============================================================================

fn generate_skewed_data(size: usize) -> Vec<u8> {
    // Roughly geometric symbol frequencies, like literal or sequence codes
    let mut rng = StdRng::seed_from_u64(0x5EED);
    (0..size)
        .map(|_| {
            let mut symbol = 0u8;
            while symbol < 40 && rng.gen_bool(0.55) {
                symbol += 1;
            }
            symbol
        })
        .collect()
}

fn generate_text_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    pattern.iter().cycle().take(size).cloned().collect()
}

struct Tables {
    norm: Vec<i16>,
    max_symbol_value: u32,
    table_log: u32,
}

fn build_tables(data: &[u8]) -> Tables {
    let hist = Histogram::from_bytes(data).unwrap();
    let max_symbol_value = hist.max_symbol_value();
    let table_log = optimal_table_log(11, data.len(), max_symbol_value);
    let mut norm = vec![0i16; 256];
    let table_log = normalize_count(
        &mut norm,
        table_log,
        hist.counts(),
        data.len(),
        max_symbol_value,
        true,
    )
    .unwrap();
    Tables {
        norm,
        max_symbol_value,
        table_log,
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("fse_histogram");

    for size in [1024, 16384, 131072] {
        let data = generate_skewed_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("count", size), &data, |b, data| {
            let mut counts = [0u32; 256];
            let mut wksp = [0u32; HIST_WKSP_SIZE];
            b.iter(|| {
                let mut max_symbol_value = 255;
                hist::count(&mut counts, &mut max_symbol_value, black_box(data), &mut wksp)
                    .unwrap()
            })
        });

        group.bench_with_input(BenchmarkId::new("count_simple", size), &data, |b, data| {
            let mut counts = [0u32; 256];
            b.iter(|| {
                let mut max_symbol_value = 255;
                hist::count_simple(&mut counts, &mut max_symbol_value, black_box(data)).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("fse_table_build");
    let data = generate_skewed_data(131072);
    let tables = build_tables(&data);

    group.bench_function("decode_table", |b| {
        b.iter(|| {
            DecodeTable::build(
                black_box(&tables.norm),
                tables.max_symbol_value,
                tables.table_log,
            )
            .unwrap()
        })
    });

    group.bench_function("encode_table", |b| {
        b.iter(|| {
            EncodeTable::build(
                black_box(&tables.norm),
                tables.max_symbol_value,
                tables.table_log,
            )
            .unwrap()
        })
    });

    group.finish();
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("fse_stream");

    for size in [4096, 65536, 131072] {
        let data = generate_skewed_data(size);
        let tables = build_tables(&data);
        let encode =
            EncodeTable::build(&tables.norm, tables.max_symbol_value, tables.table_log).unwrap();
        let decode =
            DecodeTable::build(&tables.norm, tables.max_symbol_value, tables.table_log).unwrap();
        let mut stream = vec![0u8; block_bound(size)];
        let stream_size = compress_using_ctable(&mut stream, &data, &encode);
        stream.truncate(stream_size);

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &data, |b, data| {
            let mut dst = vec![0u8; block_bound(size)];
            b.iter(|| compress_using_ctable(&mut dst, black_box(data), &encode))
        });

        group.bench_with_input(BenchmarkId::new("decode", size), &stream, |b, stream| {
            let mut dst = vec![0u8; size];
            b.iter(|| decompress_using_dtable(&mut dst, black_box(stream), &decode).unwrap())
        });
    }

    group.finish();
}

fn bench_block_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("fse_block");
    let config = FseConfig::default();

    for (name, data) in [
        ("skewed", generate_skewed_data(65536)),
        ("text", generate_text_data(65536)),
    ] {
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(BenchmarkId::new("compress", name), &data, |b, data| {
            let mut dst = vec![0u8; compress_bound(data.len())];
            b.iter(|| compress(&mut dst, black_box(data), &config).unwrap())
        });

        let mut block = vec![0u8; compress_bound(data.len())];
        if let CompressOutcome::Compressed(size) = compress(&mut block, &data, &config).unwrap() {
            block.truncate(size);
            group.bench_with_input(BenchmarkId::new("decompress", name), &block, |b, block| {
                let mut dst = vec![0u8; data.len()];
                b.iter(|| decompress(&mut dst, black_box(block), FSE_MAX_TABLELOG).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_histogram,
    bench_table_build,
    bench_stream,
    bench_block_roundtrip,
);

criterion_main!(benches);
