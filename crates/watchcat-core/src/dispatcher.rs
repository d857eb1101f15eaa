//! Bounded worker pool for checker tasks.
//!
//! Tasks go onto an MPMC queue of fixed capacity and are pulled by a fixed
//! number of workers. A full queue makes [`Dispatcher::submit`] wait, which
//! is the only backpressure the scheduler sees.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::error::{Result, WatchcatError};

pub type Task = BoxFuture<'static, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_size: 1000,
        }
    }
}

pub struct Dispatcher {
    config: PoolConfig,
    tx: async_channel::Sender<Task>,
    rx: async_channel::Receiver<Task>,
    discard: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(config: PoolConfig) -> Self {
        let (tx, rx) = async_channel::bounded(config.queue_size.max(1));
        Self {
            config,
            tx,
            rx,
            discard: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if !workers.is_empty() {
            return;
        }
        for id in 0..self.config.workers.max(1) {
            let rx = self.rx.clone();
            let discard = self.discard.clone();
            workers.push(tokio::spawn(worker(id, rx, discard)));
        }
        tracing::debug!(
            workers = self.config.workers,
            queue_size = self.config.queue_size,
            "dispatcher started"
        );
    }

    /// Queue a task, waiting while the queue is full.
    pub async fn submit(&self, task: Task) -> Result<()> {
        self.tx
            .send(task)
            .await
            .map_err(|_| WatchcatError::DispatcherStopped)
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.tx.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Close the queue and wait until every queued task has run.
    pub async fn stop(&self) {
        self.tx.close();
        self.join().await;
    }

    /// Close the queue, drop tasks that have not started and wait for the
    /// running ones.
    pub async fn stop_immediately(&self) {
        self.discard.store(true, Ordering::SeqCst);
        self.tx.close();
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::info!(dropped, "discarded queued checks");
        }
        self.join().await;
    }

    async fn join(&self) {
        let handles = {
            let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *workers)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker exited abnormally");
            }
        }
    }
}

async fn worker(id: usize, rx: async_channel::Receiver<Task>, discard: Arc<AtomicBool>) {
    while let Ok(task) = rx.recv().await {
        if discard.load(Ordering::SeqCst) {
            continue;
        }
        // A panicking task takes down its own tokio task, not the worker.
        if let Err(e) = tokio::spawn(task).await {
            tracing::error!(worker = id, error = %e, "check task panicked");
        }
    }
    tracing::trace!(worker = id, "worker exiting");
}
