// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::Receiver;
use futures::executor::LocalPool;
use futures::FutureExt;

use crate::cancellation::CancellationToken;
use crate::idle_registry::IdleRegistry;
use crate::job::Job;
use crate::stats::PoolMetrics;

/// The single control loop matching queued jobs to idle workers. It is the only place
/// where worker handles leave and re-enter the idle registry.
pub(crate) struct Dispatcher {
    intake: Receiver<Job>,
    registry: IdleRegistry,
    cancel: CancellationToken,
    metrics: Arc<PoolMetrics>,
    /// Workers whose inbox is still reachable.
    live_workers: usize,
}

impl Dispatcher {
    pub(crate) fn new(
        intake: Receiver<Job>,
        registry: IdleRegistry,
        cancel: CancellationToken,
        metrics: Arc<PoolMetrics>,
        workers: usize,
    ) -> Self {
        Self {
            intake,
            registry,
            cancel,
            metrics,
            live_workers: workers,
        }
    }

    /// Runs the dispatcher in a dedicated thread.
    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("jobpool-dispatcher".to_string())
            .spawn(move || {
                let mut pool = LocalPool::new();
                pool.run_until(self.run());
            })
    }

    pub(crate) async fn run(mut self) {
        log::info!("Dispatcher started with {} workers", self.live_workers);
        loop {
            // cancellation is polled first: once signalled, no further job leaves the intake
            let next = futures::select_biased! {
                _ = self.cancel.cancelled().fuse() => {
                    log::info!("Dispatcher observed cancellation");
                    None
                }
                job = self.intake.recv().fuse() => match job {
                    Ok(job) => Some(job),
                    Err(_err) => {
                        log::info!("Intake queue closed, all senders dropped");
                        None
                    }
                },
            };

            match next {
                Some(job) => self.route(job).await,
                None => break,
            }
        }
        self.shutdown().await;
        log::info!("Dispatcher shutting down gracefully");
    }

    /// Hands the job to the next idle worker and puts the handle straight back; the
    /// worker's inbox takes care of buffering.
    async fn route(&mut self, mut job: Job) {
        while self.live_workers > 0 {
            let Some(handle) = self.registry.take().await else {
                break;
            };
            match handle.deliver(job).await {
                Ok(()) => {
                    log::debug!("Routed job to worker {}", handle.id());
                    self.registry.put(handle).await;
                    return;
                }
                Err(rejected) => {
                    log::warn!(
                        "Worker {} is gone, discarding its handle and rerouting",
                        handle.id()
                    );
                    self.live_workers -= 1;
                    job = rejected;
                }
            }
        }
        log::error!(
            "No live worker left, dropping job {}",
            job.desc().unwrap_or("<unnamed>")
        );
        self.metrics.jobs_dropped(1);
    }

    /// Refuses new work, drops what is still queued and closes every worker inbox so
    /// that each worker drains what it already has and retires.
    async fn shutdown(&mut self) {
        self.intake.close();
        let mut dropped = 0;
        while self.intake.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::warn!("Dropped {dropped} queued jobs that were never dispatched");
            self.metrics.jobs_dropped(dropped);
        }

        let mut retired = 0;
        while retired < self.live_workers {
            match self.registry.take().await {
                Some(handle) => {
                    handle.retire();
                    retired += 1;
                }
                None => break,
            }
        }
        self.registry.close();
        // a handle that is still buffered at this point belongs to a worker we counted as dead
        while let Some(handle) = self.registry.try_take() {
            handle.retire();
        }
        log::info!("Closed the inboxes of {retired} workers");
    }
}
