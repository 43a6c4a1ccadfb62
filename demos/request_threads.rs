//! Request threads submitting random arithmetic batches
//!
//! Ten request threads each build a batch of 1 to 10 random jobs, submit it,
//! wait for the results and print them.
//!
//! Run with: cargo run --example request_threads

use batch_pool::prelude::*;
use rand::Rng;
use std::sync::Arc;
use std::thread;

fn random_batch(rng: &mut impl Rng) -> Batch {
    let len = rng.gen_range(1..=10);
    let mut batch = Batch::with_capacity(len);
    batch.extend((0..len).map(|_| {
        let op = Operation::ALL[rng.gen_range(0..Operation::ALL.len())];
        Job::new(op, rng.gen_range(0..100), rng.gen_range(0..100))
    }));
    batch
}

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Batch Pool - Request Threads Example ===\n");

    let pool = Arc::new(BatchPool::with_config(
        PoolConfig::new(10).with_max_batch_size(10),
    )?);
    println!("Pool started with {} workers\n", pool.num_workers());

    let requests: Vec<_> = (0..10)
        .map(|request| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || -> Result<()> {
                let batch = random_batch(&mut rand::thread_rng());
                println!("request {}: spawn {} jobs", request, batch.len());

                let handle = pool.submit(batch)?;
                let worker = handle.worker();
                let results = handle.wait()?;

                for result in &results {
                    match result.outcome {
                        Ok(value) => println!("  [worker {}] {} = {}", worker, result.job, value),
                        Err(fault) => println!("  [worker {}] {} -> {}", worker, result.job, fault),
                    }
                }
                Ok(())
            })
        })
        .collect();

    for request in requests {
        match request.join() {
            Ok(result) => result?,
            Err(_) => eprintln!("request thread panicked"),
        }
    }

    println!("\nTotal batches submitted: {}", pool.total_batches_submitted());
    println!("Total jobs processed: {}", pool.total_jobs_processed());
    println!("Total jobs faulted: {}", pool.total_jobs_faulted());

    println!("\nPer-worker statistics:");
    for (i, stat) in pool.get_stats().iter().enumerate() {
        let snapshot = stat.snapshot();
        println!(
            "  Worker {}: {} batches, {} jobs, {} faults",
            i, snapshot.batches_completed, snapshot.jobs_processed, snapshot.jobs_faulted
        );
    }

    pool.shutdown()?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
