// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Schedules a number of counter increments, cancels once everything has been dispatched
// and prints the pool statistics as JSON.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use jobpool::{CancellationToken, Pool, PoolConfig};
use log::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Capacity of the intake queue
    #[arg(long)]
    max_jobs: Option<usize>,

    /// Number of workers
    #[arg(long)]
    max_workers: Option<usize>,

    /// Capacity of each worker's inbox
    #[arg(long)]
    inbox_capacity: Option<usize>,

    /// Pool configuration (JSON encoded). Note that this excludes the three size options.
    #[arg(long, value_name = "JSON")]
    config: Option<String>,

    /// Number of jobs to schedule
    #[arg(long, default_value_t = 1000)]
    jobs: usize,

    /// Milliseconds each job sleeps before incrementing
    #[arg(long, default_value_t = 0)]
    job_millis: u64,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.config.is_some()
        && (args.max_jobs.is_some() || args.max_workers.is_some() || args.inbox_capacity.is_some())
    {
        return Err(
            "--config must not be used in combination with --max-jobs, --max-workers or --inbox-capacity"
                .into(),
        );
    }
    Ok(())
}

fn pool_config(args: &Args) -> anyhow::Result<PoolConfig> {
    let config = match &args.config {
        Some(json) => PoolConfig::from_json(json).context("invalid --config")?,
        None => PoolConfig::new(
            args.max_jobs.unwrap_or(1000),
            args.max_workers.unwrap_or(50),
            args.inbox_capacity.unwrap_or(10),
        )?,
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    let pool = Pool::with_config(pool_config(&args)?)?;
    let token = CancellationToken::new();
    pool.start(token.clone())?;

    let counter = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();
    for _ in 0..args.jobs {
        let counter = counter.clone();
        let job_millis = args.job_millis;
        pool.schedule(move || {
            if job_millis > 0 {
                thread::sleep(Duration::from_millis(job_millis));
            }
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    while pool.stats().queued > 0 {
        thread::sleep(Duration::from_millis(1));
    }
    info!("All {} jobs dispatched, cancelling", args.jobs);
    token.cancel();
    pool.wait();

    let total = counter.load(Ordering::SeqCst);
    info!("Counter reached {} in {:?}", total, started.elapsed());
    println!("{}", serde_json::to_string_pretty(&pool.stats())?);

    if total != args.jobs {
        bail!("expected {} increments, counted {}", args.jobs, total);
    }
    Ok(())
}
