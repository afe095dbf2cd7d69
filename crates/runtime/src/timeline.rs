//! An in-order execution queue with its own worker thread and fence.
//!
//! A timeline stands in for a device queue: commands run strictly in
//! submission order, `signal` advances the timeline's fence once everything
//! before it has run, and `wait_for` makes the queue itself (not the
//! submitting thread) wait on another timeline's fence.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::{Fence, RuntimeError};

type Job = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

enum Command {
    Run(Job),
    Signal(u64),
    Wait(Arc<Fence>, u64),
}

pub struct Timeline {
    name: &'static str,
    sender: Option<Sender<Command>>,
    fence: Arc<Fence>,
    last_signaled: u64,
    failure: Arc<Mutex<Option<String>>>,
    worker: Option<JoinHandle<()>>,
}

impl Timeline {
    /// Starts the worker thread for a timeline called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeline`] if the thread cannot be spawned.
    pub fn spawn(name: &'static str) -> Result<Self, RuntimeError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let fence = Arc::new(Fence::new(name));
        let failure = Arc::new(Mutex::new(None));

        let worker_fence = Arc::clone(&fence);
        let worker_failure = Arc::clone(&failure);
        let worker = std::thread::Builder::new()
            .name(format!("{name}-timeline"))
            .spawn(move || {
                for command in receiver {
                    match command {
                        Command::Run(job) => {
                            // After a failure only fence traffic is processed.
                            if worker_failure.lock().is_some() {
                                continue;
                            }
                            if let Some(message) = run_job(job) {
                                tracing::error!(timeline = name, %message, "job failed");
                                *worker_failure.lock() = Some(message);
                            }
                        }
                        Command::Signal(value) => worker_fence.signal(value),
                        Command::Wait(other, value) => other.wait_until(value),
                    }
                }
                tracing::debug!(timeline = name, "timeline stopped");
            })
            .map_err(|e| RuntimeError::Timeline {
                name,
                message: e.to_string(),
            })?;

        tracing::debug!(timeline = name, "timeline started");
        Ok(Self {
            name,
            sender: Some(sender),
            fence,
            last_signaled: 0,
            failure,
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn fence(&self) -> &Arc<Fence> {
        &self.fence
    }

    /// The value passed to the most recent [`signal`](Self::signal).
    #[must_use]
    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.sender
            .as_ref()
            .ok_or(RuntimeError::TimelineClosed(self.name))?
            .send(command)
            .map_err(|_| RuntimeError::TimelineClosed(self.name))
    }

    /// Enqueues `job` behind everything already submitted.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the worker is gone.
    pub fn submit<F>(&self, job: F) -> Result<(), RuntimeError>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.send(Command::Run(Box::new(job)))
    }

    /// Enqueues a signal of the next fence value and returns that value.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the worker is gone.
    pub fn signal(&mut self) -> Result<u64, RuntimeError> {
        let value = self.last_signaled + 1;
        self.send(Command::Signal(value))?;
        self.last_signaled = value;
        Ok(value)
    }

    /// Makes this queue wait until `fence` reaches `value` before running
    /// anything submitted afterwards. Does not block the caller.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the worker is gone.
    pub fn wait_for(&self, fence: &Arc<Fence>, value: u64) -> Result<(), RuntimeError> {
        self.send(Command::Wait(Arc::clone(fence), value))
    }

    /// Blocks the caller until this timeline's fence reaches `value`.
    pub fn wait_until(&self, value: u64) {
        self.fence.wait_until(value);
    }

    /// Blocks until everything submitted so far has run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::TimelineClosed`] if the worker is gone.
    pub fn wait_idle(&mut self) -> Result<(), RuntimeError> {
        let value = self.signal()?;
        self.wait_until(value);
        Ok(())
    }

    /// Surfaces the first job failure, if any.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Timeline`] once any job has failed.
    pub fn check(&self) -> Result<(), RuntimeError> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(RuntimeError::Timeline {
                name: self.name,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn run_job(job: Job) -> Option<String> {
    match catch_unwind(AssertUnwindSafe(job)) {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(format!("{e:#}")),
        Err(panic) => Some(
            panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "job panicked".to_string()),
        ),
    }
}

impl Drop for Timeline {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(timeline = self.name, "timeline worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn jobs_run_in_submission_order() {
        let mut timeline = Timeline::spawn("test").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..16 {
            let log = Arc::clone(&log);
            timeline
                .submit(move || {
                    log.lock().push(i);
                    Ok(())
                })
                .unwrap();
        }
        timeline.wait_idle().unwrap();
        assert_eq!(*log.lock(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn signal_values_increase() {
        let mut timeline = Timeline::spawn("test").unwrap();
        assert_eq!(timeline.signal().unwrap(), 1);
        assert_eq!(timeline.signal().unwrap(), 2);
        timeline.wait_until(2);
        assert_eq!(timeline.fence().completed(), 2);
        assert_eq!(timeline.last_signaled(), 2);
    }

    #[test]
    fn queue_wait_defers_later_jobs() {
        let gate = Arc::new(Fence::new("gate"));
        let mut timeline = Timeline::spawn("test").unwrap();
        let ran = Arc::new(AtomicUsize::new(0));

        timeline.wait_for(&gate, 1).unwrap();
        let counter = Arc::clone(&ran);
        timeline
            .submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        let done = timeline.signal().unwrap();

        assert!(!timeline.fence().wait_until_timeout(done, Duration::from_millis(30)));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        gate.signal(1);
        timeline.wait_until(done);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_reported_and_fences_still_advance() {
        let mut timeline = Timeline::spawn("test").unwrap();
        timeline.submit(|| anyhow::bail!("device lost")).unwrap();
        let skipped = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&skipped);
        timeline
            .submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        timeline.wait_idle().unwrap();

        let err = timeline.check().unwrap_err();
        assert!(err.to_string().contains("device lost"), "{err}");
        assert_eq!(skipped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_job_is_a_failure() {
        let mut timeline = Timeline::spawn("test").unwrap();
        timeline.submit(|| panic!("boom")).unwrap();
        timeline.wait_idle().unwrap();
        assert!(timeline.check().unwrap_err().to_string().contains("boom"));
    }
}
