//! Print dispatch queue
//!
//! Single worker, FIFO. Failed jobs go into a delay heap keyed by their next
//! attempt time and re-enter the tail of the ready queue once due, so the
//! worker keeps printing other jobs while a backoff runs.
//!
//! ```text
//! enqueue ──► ready (FIFO) ──► worker ──► transport.send (with deadline)
//!               ▲                 │
//!               │   due           ├─ ok ─────────► done
//!             delayed ◄── backoff ┤
//!                                 └─ exhausted ──► PrinterError event
//!                                                  + fallback document (receipts)
//! ```
//!
//! The worker task starts lazily on the first enqueue and exits once both
//! queues are empty.

use super::fallback::FallbackSink;
use super::transport::PrintTransport;
use super::types::{PrintJob, PrintPayload, PrintQueueConfig};
use crate::store::Store;
use parking_lot::Mutex;
use pos_printer::PrintError;
use shared::NotificationEvent;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintQueueStats {
    /// Ready to run
    pub queued: usize,
    /// Waiting for their backoff to elapse
    pub delayed: usize,
    pub completed: u64,
    /// Retries scheduled
    pub retried: u64,
    /// Jobs given up
    pub failed: u64,
}

struct Delayed {
    due: Instant,
    seq: u64,
    job: PrintJob,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<PrintJob>,
    delayed: BinaryHeap<Reverse<Delayed>>,
    delay_seq: u64,
    running: bool,
    stats: PrintQueueStats,
}

impl QueueState {
    /// Move due retries to the tail of the ready queue
    fn promote_due(&mut self, now: Instant) {
        while let Some(Reverse(next)) = self.delayed.peek() {
            if next.due > now {
                break;
            }
            if let Some(Reverse(entry)) = self.delayed.pop() {
                self.ready.push_back(entry.job);
            }
        }
    }
}

struct Inner {
    config: PrintQueueConfig,
    transport: Arc<dyn PrintTransport>,
    fallback: Arc<dyn FallbackSink>,
    store: Store,
    state: Mutex<QueueState>,
    /// New work for a sleeping worker
    wakeup: Notify,
    /// Worker exited
    idle: Notify,
}

enum Next {
    Run(PrintJob),
    WaitUntil(Instant),
    Done,
}

/// Handle to the print queue (cheap to clone)
#[derive(Clone)]
pub struct PrintQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PrintQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintQueue")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl PrintQueue {
    pub fn new(
        config: PrintQueueConfig,
        transport: Arc<dyn PrintTransport>,
        fallback: Arc<dyn FallbackSink>,
        store: Store,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                fallback,
                store,
                state: Mutex::new(QueueState::default()),
                wakeup: Notify::new(),
                idle: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &PrintQueueConfig {
        &self.inner.config
    }

    /// Create a job with the configured retry ceiling and enqueue it
    pub fn submit(&self, payload: PrintPayload) -> Uuid {
        self.enqueue(PrintJob::new(payload, self.inner.config.max_retries))
    }

    /// Append a job to the tail of the queue
    ///
    /// Never blocks. Starts the worker if it is not running; outside a tokio
    /// runtime the job stays queued until the next enqueue from inside one.
    pub fn enqueue(&self, job: PrintJob) -> Uuid {
        let id = job.id;
        let kind = job.kind();
        let spawn = {
            let mut state = self.inner.state.lock();
            state.ready.push_back(job);
            if state.running {
                None
            } else {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        state.running = true;
                        Some(handle)
                    }
                    Err(_) => {
                        error!(job_id = %id, "No tokio runtime, print job left queued");
                        None
                    }
                }
            }
        };

        match spawn {
            Some(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(run_worker(inner));
            }
            None => self.inner.wakeup.notify_one(),
        }

        info!(job_id = %id, kind = %kind, "Print job enqueued");
        id
    }

    pub fn stats(&self) -> PrintQueueStats {
        let state = self.inner.state.lock();
        PrintQueueStats {
            queued: state.ready.len(),
            delayed: state.delayed.len(),
            ..state.stats
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Wait until the worker has drained every job, retries included
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

async fn run_worker(inner: Arc<Inner>) {
    info!("Print worker started");
    loop {
        let next = {
            let mut state = inner.state.lock();
            state.promote_due(Instant::now());
            if let Some(job) = state.ready.pop_front() {
                Next::Run(job)
            } else if let Some(Reverse(entry)) = state.delayed.peek() {
                Next::WaitUntil(entry.due)
            } else {
                state.running = false;
                Next::Done
            }
        };

        match next {
            Next::Run(job) => {
                process(&inner, job).await;
                tokio::time::sleep(inner.config.inter_job_delay).await;
            }
            Next::WaitUntil(due) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(due) => {}
                    _ = inner.wakeup.notified() => {}
                }
            }
            Next::Done => {
                info!("Print queue drained, worker stopping");
                inner.idle.notify_waiters();
                return;
            }
        }
    }
}

#[instrument(skip(inner, job), fields(job_id = %job.id, kind = %job.kind(), attempt = job.retries + 1))]
async fn process(inner: &Inner, mut job: PrintJob) {
    let deadline = inner.config.job_timeout;
    let result = match tokio::time::timeout(deadline, inner.transport.send(&job)).await {
        Ok(result) => result,
        Err(_) => Err(PrintError::Timeout(format!("Print job exceeded {:?}", deadline))),
    };

    let err = match result {
        Ok(()) => {
            inner.state.lock().stats.completed += 1;
            info!("Print job completed");
            return;
        }
        Err(e) => e,
    };

    job.retries += 1;
    if err.is_permanent() || job.retries >= job.max_retries {
        exhaust(inner, job, err).await;
        return;
    }

    let delay = inner.config.backoff(job.retries);
    warn!(error = %err, retry_in = ?delay, "Print job failed, scheduling retry");
    let mut state = inner.state.lock();
    state.delay_seq += 1;
    let seq = state.delay_seq;
    state.delayed.push(Reverse(Delayed {
        due: Instant::now() + delay,
        seq,
        job,
    }));
    state.stats.retried += 1;
}

/// Drop the job, report it once and keep a document for receipts
async fn exhaust(inner: &Inner, job: PrintJob, err: PrintError) {
    inner.state.lock().stats.failed += 1;
    error!(
        error = %err,
        attempts = job.retries,
        order_id = ?job.order_id(),
        payment_ids = ?job.payment_ids(),
        "Print job given up"
    );

    let event = NotificationEvent::PrinterError {
        message: err.to_string(),
        job_kind: job.kind(),
        order_id: job.order_id(),
    };
    // redb write transactions block, keep them off the worker
    let store = inner.store.clone();
    let emitted = tokio::task::spawn_blocking(move || {
        let txn = store.begin_write()?;
        store.append_event(&txn, &event)?;
        store.commit(txn)
    })
    .await;
    match emitted {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to record printer error notification"),
        Err(e) => error!(error = %e, "Printer error notification task failed"),
    }

    if let PrintPayload::CustomerReceipt(receipt) = &job.payload {
        match inner.fallback.write_receipt(receipt).await {
            Ok(doc) => info!(path = %doc.path.display(), "Receipt kept as fallback document"),
            Err(e) => error!(error = %e, "Failed to write fallback receipt"),
        }
    }
}
