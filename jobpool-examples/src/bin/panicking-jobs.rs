// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

// Mixes failing and succeeding jobs, submitted from an async context, and collects the
// failures through a custom error sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use clap::Parser;
use jobpool::{CancellationToken, JobFailure, Pool};
use log::{info, warn};

const INTENTIONAL_FAILURE: &str = "failed on purpose";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Number of jobs to schedule
    #[arg(long, default_value_t = 100)]
    jobs: usize,

    /// Every n-th job panics
    #[arg(long, default_value_t = 7)]
    fail_every: usize,

    /// Number of workers
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.fail_every == 0 {
        eprintln!("Error: --fail-every must be at least 1");
        std::process::exit(2);
    }

    // keep the default hook from printing every intentional panic; anything else still reports
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let intentional = info
            .payload()
            .downcast_ref::<String>()
            .is_some_and(|msg| msg.ends_with(INTENTIONAL_FAILURE));
        if !intentional {
            default_hook(info);
        }
    }));

    let failures = Arc::new(Mutex::new(Vec::<JobFailure>::new()));
    let sink_failures = failures.clone();
    let pool = Pool::new(16, args.workers, 2)?.with_error_sink(move |failure: JobFailure| {
        warn!("{failure}");
        if let Ok(mut failures) = sink_failures.lock() {
            failures.push(failure);
        }
    });
    let token = CancellationToken::new();
    pool.start(token.clone())?;

    let succeeded = Arc::new(AtomicUsize::new(0));
    futures::executor::block_on(async {
        for i in 0..args.jobs {
            let succeeded = succeeded.clone();
            let fail = i % args.fail_every == 0;
            pool.schedule_async(move || {
                if fail {
                    panic!("job {i} {INTENTIONAL_FAILURE}");
                }
                succeeded.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }
    });

    while pool.stats().executed < args.jobs as u64 {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    token.cancel();
    pool.wait();

    let failed = failures.lock().map(|f| f.len()).unwrap_or_default();
    info!(
        "{} jobs succeeded, {} failed",
        succeeded.load(Ordering::SeqCst),
        failed
    );
    println!("{}", serde_json::to_string_pretty(&pool.stats())?);
    Ok(())
}
