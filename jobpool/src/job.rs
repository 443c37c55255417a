// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

// To discuss:
// a job could also carry a result channel. We keep it fire-and-forget: callers that need
// completion put a counter or a sender into the closure themselves.

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A single unit of work: no arguments, no return value, run once for its side effects.
pub struct Job {
    desc: Option<String>,
    task: Task,
}

impl Job {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            desc: None,
            task: Box::new(f),
        }
    }

    /// Job with a free-form description, used for logging and failure reports.
    pub fn named<F>(desc: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            desc: Some(desc.into()),
            task: Box::new(f),
        }
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    /// Runs the job to completion. A panic inside the job is caught and returned as the
    /// panic message; it never unwinds into the caller.
    pub(crate) fn run(self) -> Result<(), String> {
        let task = self.task;
        panic::catch_unwind(AssertUnwindSafe(task)).map_err(panic_message)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("desc", &self.desc).finish()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "job panicked with a non-string payload".to_string()
    }
}

/// Describes a job that panicked while a worker executed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    /// Index of the worker that ran the job.
    pub worker: usize,
    pub desc: Option<String>,
    pub message: String,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.desc {
            Some(desc) => write!(
                f,
                "job '{}' failed on worker {}: {}",
                desc, self.worker, self.message
            ),
            None => write!(f, "job failed on worker {}: {}", self.worker, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn run_executes_the_closure_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let job = Job::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(job.run().is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_turns_a_panic_into_its_message() {
        let job = Job::named("boom", || panic!("intentional test panic"));
        assert_eq!(job.desc(), Some("boom"));
        assert_eq!(job.run(), Err("intentional test panic".to_string()));

        let job = Job::new(|| panic!("formatted {}", 42));
        assert_eq!(job.run(), Err("formatted 42".to_string()));
    }

    #[test]
    fn failure_display_mentions_the_description() {
        let failure = JobFailure {
            worker: 3,
            desc: Some("send mail".into()),
            message: "smtp down".into(),
        };
        assert_eq!(
            failure.to_string(),
            "job 'send mail' failed on worker 3: smtp down"
        );
    }
}
