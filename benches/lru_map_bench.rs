use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hashed_maps::LruMap;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn full_map(max_size: usize, seed: u64) -> LruMap<u64, u64> {
    let mut m = LruMap::new(max_size).unwrap();
    for x in lcg(seed).take(max_size) {
        m.put(x, x);
    }
    m
}

// Every put is a miss on a full map, so each one evicts and reuses a slot.
fn bench_steady_state_eviction(c: &mut Criterion) {
    c.bench_function("lru::evicting_put_100k_into_10k", |b| {
        b.iter_batched(
            || full_map(10_000, 1),
            |mut m| {
                for x in lcg(2).take(100_000) {
                    m.put(x, x);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

// Skewed reads: a small hot set is promoted over and over, the rest
// churns through eviction.
fn bench_mixed_get_put(c: &mut Criterion) {
    c.bench_function("lru::mixed_get_put_100k_on_10k", |b| {
        b.iter_batched(
            || full_map(10_000, 3),
            |mut m| {
                let mut hits = 0u64;
                for x in lcg(4).take(100_000) {
                    let k = x % 20_000;
                    if m.get(&k).is_some() {
                        hits += 1;
                    } else {
                        m.put(k, x);
                    }
                }
                black_box((m, hits))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_peek_hit(c: &mut Criterion) {
    c.bench_function("lru::peek_hit_10k_on_10k", |b| {
        let m = full_map(10_000, 5);
        let keys: Vec<u64> = lcg(5).take(10_000).collect();
        b.iter(|| {
            for k in &keys {
                black_box(m.peek(k));
            }
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_lru;
    config = bench_config();
    targets = bench_steady_state_eviction, bench_mixed_get_put, bench_peek_hit
}
criterion_main!(benches_lru);
