use criterion::{black_box, criterion_group, criterion_main, Criterion};
use htcache::ShardedMap;
use rand::distributions::{Alphanumeric, DistString};
use rayon::prelude::*;
use std::sync::Arc;

fn generate_string() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), 30)
}

fn generate_test_kv(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|_| (generate_string(), generate_string()))
        .collect()
}

fn sharded_map_write(test_data: &[(String, String)]) -> Arc<ShardedMap<String>> {
    let threads = 16;
    let map = Arc::new(ShardedMap::new(32));
    test_data
        .par_chunks(test_data.len() / threads)
        .for_each(|chunk| {
            for (key, value) in chunk {
                map.put(key, value.clone());
            }
        });
    map
}

fn bench_sharded_map_write(c: &mut Criterion) {
    let test_data = generate_test_kv(100_000);
    c.bench_function("sharded-map-write", |b| {
        b.iter(|| black_box(sharded_map_write(&test_data)))
    });
}

fn bench_sharded_map_read(c: &mut Criterion) {
    let test_data = generate_test_kv(100_000);
    let map = sharded_map_write(&test_data);
    c.bench_function("sharded-map-read", |b| {
        b.iter(|| {
            for (key, _) in &test_data {
                black_box(map.get(key));
            }
        })
    });
}

criterion_group!(benches, bench_sharded_map_write, bench_sharded_map_read);
criterion_main!(benches);
