use crate::{CancellationToken, JobFailure, Pool, PoolError};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// Simple shared integer counter
fn shared_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Polls `cond` until it holds or five seconds have passed.
fn eventually(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//
// 1. Per-worker ordering
//
#[test]
fn test_single_worker_runs_jobs_in_order() {
    init_log();
    let pool = Pool::new(16, 1, 4).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    let results = Arc::new(Mutex::new(Vec::new()));
    for i in 0..10 {
        let r = results.clone();
        pool.schedule(move || r.lock().unwrap().push(i));
    }

    assert!(eventually(|| results.lock().unwrap().len() == 10));
    token.cancel();
    pool.wait();

    assert_eq!(*results.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

//
// 2. The counter scenario
//
#[test]
fn test_counter_scenario() {
    init_log();
    let pool = Pool::new(1000, 50, 10).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    let count = shared_counter();
    for _ in 0..1000 {
        let c = count.clone();
        pool.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
    }

    // everything left the intake queue, so everything has been routed to a worker
    assert!(eventually(|| pool.stats().queued == 0));
    token.cancel();
    pool.wait();

    assert_eq!(count.load(Ordering::SeqCst), 1000);
    let stats = pool.stats();
    assert_eq!(stats.executed, 1000);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.live_workers, 0);
}

//
// 3. Start may only happen once
//
#[test]
fn test_second_start_is_rejected() {
    let pool = Pool::new(1, 1, 1).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    assert!(matches!(
        pool.start(token.clone()),
        Err(PoolError::AlreadyStarted)
    ));

    token.cancel();
    pool.wait();
}

//
// 4. Failure does not kill the worker
//
#[test]
fn test_job_failure_does_not_crash_worker() {
    init_log();
    let failures = Arc::new(Mutex::new(Vec::<JobFailure>::new()));
    let sink_failures = failures.clone();
    let pool = Pool::new(8, 1, 1)
        .unwrap()
        .with_error_sink(move |f: JobFailure| sink_failures.lock().unwrap().push(f));
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    pool.schedule_named("explodes", || panic!("intentional test panic"));
    let c = shared_counter();
    let c2 = c.clone();
    pool.schedule(move || {
        c2.fetch_add(1, Ordering::SeqCst);
    });

    assert!(eventually(|| c.load(Ordering::SeqCst) == 1));
    token.cancel();
    pool.wait();

    let failures = failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].worker, 0);
    assert_eq!(failures[0].desc.as_deref(), Some("explodes"));
    assert_eq!(failures[0].message, "intentional test panic");
    assert_eq!(pool.stats().failed, 1);
    assert_eq!(pool.stats().executed, 2);
}

//
// 5. Jobs scheduled before start run once the pool starts
//
#[test]
fn test_jobs_scheduled_before_start_are_kept() {
    let pool = Pool::new(4, 2, 1).unwrap();
    let c = shared_counter();
    for _ in 0..3 {
        let c = c.clone();
        pool.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(pool.stats().queued, 3);
    assert_eq!(c.load(Ordering::SeqCst), 0);

    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();
    assert!(eventually(|| c.load(Ordering::SeqCst) == 3));

    token.cancel();
    pool.wait();
}

//
// 6. Wait on an unstarted pool
//
#[test]
fn test_wait_without_start_returns() {
    let pool = Pool::new(1, 1, 1).unwrap();
    pool.wait();
    futures::executor::block_on(pool.wait_async());
    assert!(!pool.is_started());
}

//
// 7. try_schedule reports admission problems
//
#[test]
fn test_try_schedule_reports_full_and_shut_down() {
    let pool = Pool::new(1, 1, 1).unwrap();
    pool.try_schedule(|| {}).unwrap();
    assert!(matches!(pool.try_schedule(|| {}), Err(PoolError::QueueFull)));

    let token = CancellationToken::new();
    token.cancel();
    pool.start(token).unwrap();
    pool.wait();

    assert!(matches!(pool.try_schedule(|| {}), Err(PoolError::ShutDown)));
}

//
// 8. Dropping a running pool retires its workers
//
#[test]
fn test_drop_retires_workers() {
    init_log();
    let marker = Arc::new(());
    let sink_marker = marker.clone();
    let pool = Pool::new(4, 3, 2)
        .unwrap()
        .with_error_sink(move |f: JobFailure| {
            log::error!("{f} (sink marker {:p})", Arc::as_ptr(&sink_marker));
        });
    pool.start(CancellationToken::new()).unwrap();

    let (tx, rx) = mpsc::channel();
    pool.schedule(move || tx.send(()).unwrap());
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    drop(pool);
    // every worker holds the sink; it is released once the last worker has retired
    assert!(eventually(|| Arc::strong_count(&marker) == 1));
}

//
// 9. Async submission
//
#[test]
fn test_schedule_async() {
    let pool = Pool::new(2, 2, 1).unwrap();
    let token = CancellationToken::new();
    pool.start(token.clone()).unwrap();

    let c = shared_counter();
    futures::executor::block_on(async {
        for _ in 0..20 {
            let c = c.clone();
            pool.schedule_async(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }
    });

    assert!(eventually(|| c.load(Ordering::SeqCst) == 20));
    token.cancel();
    futures::executor::block_on(pool.wait_async());
    pool.wait();
    assert_eq!(pool.stats().live_workers, 0);
}
