use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use batch_pool::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn arithmetic_batch(len: i64) -> Batch {
    (0..len)
        .map(|i| match i % 4 {
            0 => Job::add(i, 7),
            1 => Job::sub(i, 7),
            2 => Job::mul(i, 7),
            _ => Job::div(i, 7),
        })
        .collect()
}

fn benchmark_pool_creation(c: &mut Criterion) {
    c.bench_function("pool_creation", |b| {
        b.iter(|| {
            let pool = BatchPool::new(4).expect("Failed to create pool");
            pool.shutdown().expect("Failed to shutdown pool");
        });
    });
}

fn benchmark_batch_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_submission");

    for len in [1i64, 10, 100] {
        group.bench_function(format!("execute_batch_of_{}", len), |b| {
            let pool = BatchPool::new(4).expect("Failed to create pool");
            b.iter(|| {
                let results = pool
                    .execute(arithmetic_batch(len))
                    .expect("Failed to execute batch");
                black_box(results);
            });
            pool.shutdown().expect("Failed to shutdown pool");
        });
    }

    group.finish();
}

fn benchmark_pipelined_submission(c: &mut Criterion) {
    c.bench_function("submit_100_then_wait", |b| {
        let pool = BatchPool::new(4).expect("Failed to create pool");
        b.iter(|| {
            let handles: Vec<_> = (0..100)
                .map(|_| pool.submit(arithmetic_batch(10)).expect("Failed to submit batch"))
                .collect();
            for handle in handles {
                black_box(handle.wait().expect("Failed to get results"));
            }
        });
        pool.shutdown().expect("Failed to shutdown pool");
    });
}

fn benchmark_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("concurrent_producers_4_threads", |b| {
        b.iter_batched(
            || Arc::new(BatchPool::new(4).expect("Failed to create pool")),
            |pool| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        let pool = Arc::clone(&pool);
                        std::thread::spawn(move || {
                            for _ in 0..25 {
                                pool.execute(arithmetic_batch(10))
                                    .expect("Failed to execute batch");
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    handle.join().expect("Thread panicked");
                }

                pool.shutdown().expect("Failed to shutdown pool");
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pool_creation,
    benchmark_batch_submission,
    benchmark_pipelined_submission,
    benchmark_concurrent_producers
);
criterion_main!(benches);
