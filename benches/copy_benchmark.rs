use criterion::{black_box, criterion_group, criterion_main, Criterion};
use file_operations::{copy_stream, CancelFlag};
use rand::prelude::*;
use std::io::Cursor;

fn generate_random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

fn copy_stream_by_chunk_size(c: &mut Criterion) {
    let input_data = generate_random_data(4 * 1024 * 1024);
    let chunk_sizes = [
        ("copy_chunk_1k", 1024),
        ("copy_chunk_8k", 8 * 1024),
        ("copy_chunk_1m", 1024 * 1024),
    ];

    for (name, chunk_size) in chunk_sizes.iter() {
        let mut group = c.benchmark_group(name.to_string());
        group.measurement_time(std::time::Duration::from_secs(5));

        let data = input_data.clone();
        group.bench_function("copy_4mb", move |b| {
            b.iter(|| {
                let mut reader = Cursor::new(black_box(&data));
                let mut writer = Vec::<u8>::with_capacity(data.len());
                copy_stream(&mut reader, &mut writer, *chunk_size, &CancelFlag::new())
                    .expect("copy_stream returned an error")
            });
        });

        group.finish();
    }
}

criterion_group!(benches, copy_stream_by_chunk_size);
criterion_main!(benches);
