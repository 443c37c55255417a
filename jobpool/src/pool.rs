// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use async_channel::{Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};

use crate::cancellation::CancellationToken;
use crate::completion::CompletionTracker;
use crate::config::PoolConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{PoolError, PoolResult};
use crate::error_sink::{ErrorSink, LogSink};
use crate::idle_registry::IdleRegistry;
use crate::job::Job;
use crate::stats::{PoolMetrics, PoolStats};
use crate::worker::Worker;

/// Bounded worker pool.
///
/// A pool is built unstarted, started once with a [`CancellationToken`] and shut down by
/// cancelling that token. Submission is fire-and-forget: a job that was accepted by
/// [`schedule`](Pool::schedule) is *not* guaranteed to run if the token is cancelled
/// before the dispatcher picked it up. Jobs that need to signal completion must do so
/// through their own captured state (a counter, a channel, ...).
///
/// The pool is `Sync`; share it between request handlers with an `Arc`.
pub struct Pool {
    config: PoolConfig,
    intake_tx: Sender<Job>,
    intake_rx: Receiver<Job>,
    registry: IdleRegistry,
    tracker: CompletionTracker,
    metrics: Arc<PoolMetrics>,
    sink: Arc<dyn ErrorSink>,
    started: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Pool {
    /// Builds an unstarted pool. Fails with [`PoolError::InvalidConfiguration`] if any
    /// size is zero.
    pub fn new(
        max_jobs: usize,
        max_workers: usize,
        worker_inbox_capacity: usize,
    ) -> PoolResult<Self> {
        Self::with_config(PoolConfig::new(
            max_jobs,
            max_workers,
            worker_inbox_capacity,
        )?)
    }

    pub fn with_config(config: PoolConfig) -> PoolResult<Self> {
        // a config deserialized directly through serde has not been checked yet
        config.validate()?;
        // the intake exists before start, so jobs scheduled early wait for the dispatcher
        let (intake_tx, intake_rx) = async_channel::bounded(config.max_jobs());
        Ok(Self {
            config,
            intake_tx,
            intake_rx,
            registry: IdleRegistry::new(config.max_workers()),
            tracker: CompletionTracker::new(),
            metrics: Arc::new(PoolMetrics::default()),
            sink: Arc::new(LogSink),
            started: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Replaces the sink that receives panicking jobs. Only affects workers spawned by a
    /// later [`start`](Pool::start).
    pub fn with_error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawns the workers and the dispatcher and returns immediately.
    ///
    /// Each worker registers itself as idle before it accepts jobs. Cancelling `cancel`
    /// starts the drain sequence: the dispatcher stops pulling from the intake queue,
    /// drops what is still queued and closes every worker inbox. Workers finish what is
    /// already in their inbox and retire.
    pub fn start(&self, cancel: CancellationToken) -> PoolResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyStarted);
        }

        let worker_count = self.config.max_workers();
        let mut threads = Vec::with_capacity(worker_count + 1);

        for id in 0..worker_count {
            let Some(guard) = self.tracker.enroll() else {
                // only a previous start seals the tracker
                self.abort_start(threads);
                return Err(PoolError::AlreadyStarted);
            };
            let (worker, handle) = Worker::new(
                id,
                self.config.worker_inbox_capacity(),
                self.sink.clone(),
                self.metrics.clone(),
                guard,
            );
            match worker.spawn(handle, self.registry.clone()) {
                Ok(thread) => threads.push(thread),
                Err(err) => {
                    error!("Failed to spawn worker {id}: {err}");
                    self.abort_start(threads);
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        let dispatcher = Dispatcher::new(
            self.intake_rx.clone(),
            self.registry.clone(),
            cancel,
            self.metrics.clone(),
            worker_count,
        );
        match dispatcher.spawn() {
            Ok(thread) => threads.push(thread),
            Err(err) => {
                error!("Failed to spawn dispatcher: {err}");
                self.abort_start(threads);
                return Err(PoolError::Spawn(err));
            }
        }

        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(threads);
        self.tracker.seal();
        info!(
            "Started pool with {} workers (intake capacity {}, inbox capacity {})",
            worker_count,
            self.config.max_jobs(),
            self.config.worker_inbox_capacity()
        );
        Ok(())
    }

    /// Retires the workers spawned so far after a failed start.
    fn abort_start(&self, threads: Vec<JoinHandle<()>>) {
        self.intake_rx.close();
        self.registry.close();
        // workers that register after the close retire their own handle
        while let Some(handle) = self.registry.try_take() {
            handle.retire();
        }
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(threads);
        self.tracker.seal();
    }

    /// Enqueues a job, blocking while the intake queue is full.
    ///
    /// Never reports anything about the job itself. Calling this from inside a job of the
    /// same pool can deadlock when the queue is full. If the pool has already shut down,
    /// the job is dropped with a warning.
    pub fn schedule<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_job(Job::new(f))
    }

    /// Like [`schedule`](Pool::schedule), with a description used in logs and failure reports.
    pub fn schedule_named<F>(&self, desc: impl Into<String>, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_job(Job::named(desc, f))
    }

    pub fn schedule_job(&self, job: Job) {
        if let Err(err) = self.intake_tx.send_blocking(job) {
            self.reject(err.into_inner());
        }
    }

    /// Async flavour of [`schedule`](Pool::schedule): a full queue suspends the calling
    /// future instead of blocking the thread.
    pub async fn schedule_async<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(err) = self.intake_tx.send(Job::new(f)).await {
            self.reject(err.into_inner());
        }
    }

    /// Enqueues without waiting. The error only concerns admission.
    pub fn try_schedule<F>(&self, f: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.intake_tx.try_send(Job::new(f)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PoolError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(PoolError::ShutDown),
        }
    }

    fn reject(&self, job: Job) {
        warn!(
            "Pool has shut down, dropping job {}",
            job.desc().unwrap_or("<unnamed>")
        );
        self.metrics.jobs_dropped(1);
    }

    /// Blocks until every worker has retired, then joins the pool's threads.
    ///
    /// Only returns after the cancellation token passed to [`start`](Pool::start) has been
    /// cancelled (or the intake has been closed otherwise). On a pool that was never
    /// started it returns immediately.
    pub fn wait(&self) {
        if !self.is_started() {
            debug!("Wait on a pool that was never started");
            return;
        }
        self.tracker.wait();

        let threads = std::mem::take(
            &mut *self.threads.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for thread in threads {
            let name = thread.thread().name().unwrap_or("<unnamed>").to_string();
            if thread.join().is_err() {
                error!("Pool thread {name} panicked");
            }
        }
        info!("All workers retired");
    }

    /// Resolves once every worker has retired. Threads are only joined by
    /// [`wait`](Pool::wait).
    pub async fn wait_async(&self) {
        if !self.is_started() {
            return;
        }
        self.tracker.wait_async().await;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queued: self.intake_tx.len(),
            idle_workers: self.registry.idle(),
            live_workers: self.tracker.live(),
            executed: self.metrics.executed(),
            failed: self.metrics.failed(),
            dropped: self.metrics.dropped(),
        }
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("started", &self.is_started())
            .field("stats", &self.stats())
            .finish()
    }
}
