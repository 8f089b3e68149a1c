//! Task scheduling for the health-check tick and deferred recovery requests
//!
//! `ThreadTaskScheduler` runs each periodic task on its own named thread and
//! every one-shot task on a single worker fed by a crossbeam channel. Panics
//! inside tasks are caught and logged; the threads keep running.

use crate::utils::panic::panic_message;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Repeating task body
pub type PeriodicTask = Box<dyn Fn() + Send + Sync + 'static>;

/// Fire-once task body
pub type OneShotTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs one repeating tick plus arbitrary fire-once tasks
///
/// Tasks fire on scheduler-owned threads. One-shot tasks have no cancellation handle.
pub trait TaskScheduler: Send + Sync {
    fn run_periodic(&self, name: &str, interval: Duration, task: PeriodicTask);

    fn run_once(&self, name: &str, task: OneShotTask);
}

/// Run a task body, logging instead of unwinding into the scheduler thread
pub(crate) fn run_guarded<F: FnOnce()>(name: &str, task: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        error!(task = name, message = %panic_message(payload.as_ref()), "Scheduled task panicked");
    }
}

struct Job {
    name: String,
    task: OneShotTask,
}

/// Thread-backed scheduler
pub struct ThreadTaskScheduler {
    jobs: Mutex<Option<Sender<Job>>>,
    // Dropping the sender wakes every periodic loop with `Disconnected`
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadTaskScheduler {
    /// Create the scheduler and start its one-shot worker thread
    pub fn new() -> std::io::Result<Self> {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (shutdown_tx, shutdown_rx) = unbounded::<()>();

        let worker = thread::Builder::new()
            .name("feedwatch-oneshot".to_string())
            .spawn(move || Self::worker_loop(job_rx))?;

        Ok(Self {
            jobs: Mutex::new(Some(job_tx)),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            handles: Mutex::new(vec![worker]),
        })
    }

    fn worker_loop(receiver: Receiver<Job>) {
        for job in receiver {
            debug!(task = %job.name, "Running one-shot task");
            run_guarded(&job.name, job.task);
        }
        info!("One-shot worker stopping");
    }

    /// Stop all loops and wait for in-flight tasks to finish
    pub fn shutdown(&self) {
        self.shutdown_tx.lock().take();
        self.jobs.lock().take();

        let current = thread::current().id();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            // Last owner dropped from inside one of our own tasks; that thread exits on its own
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("Scheduler thread terminated abnormally");
            }
        }
    }
}

impl TaskScheduler for ThreadTaskScheduler {
    fn run_periodic(&self, name: &str, interval: Duration, task: PeriodicTask) {
        let shutdown = self.shutdown_rx.clone();
        let task_name = name.to_string();

        let spawned = thread::Builder::new()
            .name(format!("feedwatch-{}", name))
            .spawn(move || loop {
                match shutdown.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => run_guarded(&task_name, &task),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!(task = %task_name, "Periodic task stopping");
                        break;
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                info!(task = name, interval_ms = interval.as_millis() as u64, "Periodic task scheduled");
                self.handles.lock().push(handle);
            }
            Err(e) => error!(task = name, "Failed to spawn periodic task thread: {}", e),
        }
    }

    fn run_once(&self, name: &str, task: OneShotTask) {
        let jobs = self.jobs.lock();
        let Some(sender) = jobs.as_ref() else {
            warn!(task = name, "Scheduler shut down, dropping one-shot task");
            return;
        };

        let job = Job {
            name: name.to_string(),
            task,
        };
        if sender.send(job).is_err() {
            warn!(task = name, "One-shot worker gone, dropping task");
        }
    }
}

impl Drop for ThreadTaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
