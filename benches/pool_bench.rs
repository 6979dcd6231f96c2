use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crossbeam_utils::sync::WaitGroup;
use workpool::{ChannelThreadPool, SharedQueueThreadPool, ThreadPool};

const JOBS: usize = 1000;

fn run_jobs<P: ThreadPool>(pool: &P) {
    let wg = WaitGroup::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..JOBS {
        let counter = Arc::clone(&counter);
        let wg = wg.clone();
        pool.spawn(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            drop(wg);
        })
        .unwrap();
    }
    wg.wait();
}

fn spawn_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for threads in [1u32, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("shared_queue", threads),
            &threads,
            |b, &threads| {
                let pool = SharedQueueThreadPool::new(threads).unwrap();
                b.iter(|| run_jobs(&pool));
                pool.join().unwrap();
            },
        );

        group.bench_with_input(
            BenchmarkId::new("channel", threads),
            &threads,
            |b, &threads| {
                let pool = ChannelThreadPool::new(threads).unwrap();
                b.iter(|| run_jobs(&pool));
                pool.join().unwrap();
            },
        );
    }

    group.finish();
}

criterion_group!(benches, spawn_bench);
criterion_main!(benches);
