use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skua_tsdb::compression::byte_stream::{ByteStreamReader, ByteStreamWriter};
use skua_tsdb::compression::chunk::{decode_chunk, encode_chunk};
use skua_tsdb::{DataBlockReader, DataBlockWriter, UncompressedChunk};

fn create_regular_samples(count: usize) -> Vec<(u64, f64)> {
    (0..count)
        .map(|i| (1_000_000 + (i as u64 * 10), 100.0 + (i as f64 * 0.5)))
        .collect()
}

fn encode(samples: &[(u64, f64)], buf: &mut [u8]) -> usize {
    let mut writer = DataBlockWriter::new(1, buf);
    for &(ts, value) in samples {
        writer.put(ts, value).unwrap();
    }
    writer.close().unwrap()
}

fn bench_block_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_encode");

    for size in [100usize, 1000, 10000].iter() {
        let samples = create_regular_samples(*size);
        let mut buf = vec![0u8; size * 24 + 512];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(encode(&samples, &mut buf)));
        });
    }

    group.finish();
}

fn bench_block_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_decode");

    for size in [100usize, 1000, 10000].iter() {
        let samples = create_regular_samples(*size);
        let mut buf = vec![0u8; size * 24 + 512];
        let committed = encode(&samples, &mut buf);
        let block = &buf[..committed];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let reader = DataBlockReader::new(block).unwrap();
                black_box(reader.read_all().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_chunk_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_encode");

    for size in [100usize, 1000, 10000].iter() {
        let chunk = UncompressedChunk {
            paramids: vec![7; *size],
            timestamps: (0..*size as u64).map(|i| 1_000_000 + i * 10).collect(),
            values: (0..*size).map(|i| 100.0 + i as f64 * 0.5).collect(),
        };
        let mut buf = vec![0u8; size * 24 + 512];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut stream = ByteStreamWriter::new(&mut buf);
                black_box(encode_chunk(&chunk, &mut stream).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_chunk_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_decode");

    for size in [100usize, 1000, 10000].iter() {
        let chunk = UncompressedChunk {
            paramids: vec![7; *size],
            timestamps: (0..*size as u64).map(|i| 1_000_000 + i * 10).collect(),
            values: (0..*size).map(|i| 100.0 + i as f64 * 0.5).collect(),
        };
        let mut buf = vec![0u8; size * 24 + 512];
        let mut stream = ByteStreamWriter::new(&mut buf);
        let summary = encode_chunk(&chunk, &mut stream).unwrap();
        let written = stream.size();
        let encoded = &buf[..written];

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut rstream = ByteStreamReader::new(encoded);
                black_box(decode_chunk(&mut rstream, summary.n_elements).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_block_encode,
    bench_block_decode,
    bench_chunk_encode,
    bench_chunk_decode
);
criterion_main!(benches);
