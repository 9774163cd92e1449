use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use opus_frame_streamer::container;

/// Ten minutes of 60ms frames at a typical 16kHz voice frame size
fn sample_frames() -> Vec<Vec<u8>> {
    (0..10_000).map(|i| vec![(i % 251) as u8; 120]).collect()
}

fn bench_container(c: &mut Criterion) {
    let frames = sample_frames();
    let encoded = container::encode(&frames).unwrap();

    let mut group = c.benchmark_group("container");
    group.throughput(Throughput::Bytes(encoded.len() as u64));

    group.bench_function("encode", |b| {
        b.iter(|| container::encode(black_box(frames.as_slice())).unwrap())
    });

    group.bench_function("decode", |b| {
        b.iter(|| container::decode(black_box(&encoded[..])).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_container);
criterion_main!(benches);
