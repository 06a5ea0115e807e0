//! Debounced saving with bounded retries.
//!
//! A [`DebouncedSaver`] owns a background task. Mutations call
//! [`SaveHandle::schedule`]; rapid calls coalesce into one pending payload that
//! is written once the debounce delay passes without another call. At most one
//! save is in flight. Failed saves retry with linear backoff before the status
//! settles on a persistent error.

use super::{PageStore, StorageError, StorageResult};
use crate::config::EditorConfig;
use crate::document::PagePayload;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Observable state of the save bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// Changes are waiting for the debounce delay.
    Pending,
    Saving,
    Saved { last_modified: DateTime<Utc> },
    Error {
        message: String,
        /// Failed attempts for the current payload.
        attempts: u32,
        /// Another automatic attempt is scheduled.
        retrying: bool,
    },
}

/// Timing parameters for the saver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaverConfig {
    pub debounce: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for SaverConfig {
    fn from(config: &EditorConfig) -> Self {
        Self {
            debounce: config.save_debounce(),
            max_retries: config.max_save_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl SaverConfig {
    fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(attempt)
    }
}

enum SaveCommand {
    Schedule { page_id: String, payload: PagePayload },
    RetryNow,
    Flush(oneshot::Sender<StorageResult<()>>),
    Stop,
}

/// Cheap, cloneable handle for talking to a running saver.
#[derive(Clone)]
pub struct SaveHandle {
    commands: mpsc::UnboundedSender<SaveCommand>,
    status: watch::Receiver<SaveStatus>,
}

impl SaveHandle {
    /// Queue a payload, replacing any pending one and restarting the debounce.
    pub fn schedule(&self, page_id: &str, payload: PagePayload) {
        let command = SaveCommand::Schedule {
            page_id: page_id.to_string(),
            payload,
        };
        if self.commands.send(command).is_err() {
            log::warn!("Save worker stopped; dropping changes for page {}", page_id);
        }
    }

    /// Retry a failed save immediately.
    pub fn retry_now(&self) {
        if self.commands.send(SaveCommand::RetryNow).is_err() {
            log::warn!("Save worker stopped; retry ignored");
        }
    }

    /// Write any pending payload now and wait for the result.
    pub async fn flush(&self) -> StorageResult<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(SaveCommand::Flush(tx))
            .map_err(|_| StorageError::Other("Save worker stopped".to_string()))?;
        rx.await
            .map_err(|_| StorageError::Other("Save worker stopped".to_string()))?
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }
}

/// Background save task with a start/stop lifecycle.
pub struct DebouncedSaver {
    handle: SaveHandle,
    task: Option<JoinHandle<()>>,
}

impl DebouncedSaver {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(store: Arc<dyn PageStore>, config: SaverConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let worker = Worker {
            store,
            config,
            commands: rx,
            status: status_tx,
            pending: None,
            attempts: 0,
            deadline: None,
        };
        let task = tokio::spawn(worker.run());
        Self {
            handle: SaveHandle { commands, status },
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SaveHandle {
        self.handle.clone()
    }

    /// Write any pending payload, then shut the worker down.
    pub async fn stop(mut self) {
        let _ = self.handle.commands.send(SaveCommand::Stop);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Save worker panicked: {}", e);
            }
        }
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Worker {
    store: Arc<dyn PageStore>,
    config: SaverConfig,
    commands: mpsc::UnboundedReceiver<SaveCommand>,
    status: watch::Sender<SaveStatus>,
    pending: Option<(String, PagePayload)>,
    attempts: u32,
    /// When the next automatic save fires (debounce or retry).
    deadline: Option<Instant>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let command = match self.deadline {
                Some(at) => {
                    tokio::select! {
                        command = self.commands.recv() => command,
                        _ = tokio::time::sleep_until(at) => {
                            self.deadline = None;
                            let _ = self.save_pending().await;
                            continue;
                        }
                    }
                }
                None => self.commands.recv().await,
            };

            match command {
                Some(SaveCommand::Schedule { page_id, payload }) => {
                    self.pending = Some((page_id, payload));
                    self.attempts = 0;
                    self.deadline = Some(Instant::now() + self.config.debounce);
                    self.status.send_replace(SaveStatus::Pending);
                }
                Some(SaveCommand::RetryNow) => {
                    if self.pending.is_some() {
                        self.attempts = 0;
                        self.deadline = None;
                        let _ = self.save_pending().await;
                    }
                }
                Some(SaveCommand::Flush(reply)) => {
                    self.deadline = None;
                    let result = self.save_pending().await;
                    let _ = reply.send(result);
                }
                Some(SaveCommand::Stop) | None => {
                    if self.pending.is_some() {
                        let _ = self.save_pending().await;
                    }
                    break;
                }
            }
        }
        log::debug!("Save worker stopped");
    }

    /// Attempt to write the pending payload once, scheduling a retry on failure.
    async fn save_pending(&mut self) -> StorageResult<()> {
        let Some((page_id, payload)) = self.pending.as_ref() else {
            return Ok(());
        };
        self.status.send_replace(SaveStatus::Saving);

        match self.store.save_page(page_id, payload).await {
            Ok(receipt) => {
                log::info!("Saved page {}", page_id);
                self.pending = None;
                self.attempts = 0;
                self.status.send_replace(SaveStatus::Saved {
                    last_modified: receipt.last_modified,
                });
                Ok(())
            }
            Err(e) => {
                self.attempts += 1;
                let retrying = self.attempts <= self.config.max_retries;
                if retrying {
                    let delay = self.config.retry_delay(self.attempts);
                    log::warn!(
                        "Save of page {} failed (attempt {}), retrying in {:?}: {}",
                        page_id,
                        self.attempts,
                        delay,
                        e
                    );
                    self.deadline = Some(Instant::now() + delay);
                } else {
                    log::error!("Save of page {} failed after {} attempts: {}", page_id, self.attempts, e);
                }
                self.status.send_replace(SaveStatus::Error {
                    message: e.to_string(),
                    attempts: self.attempts,
                    retrying,
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DEFAULT_CANVAS_SIZE;
    use crate::storage::{BoxFuture, LoadedPage, MemoryStore, SaveReceipt};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Wraps a memory store, failing the first `failures` saves.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl PageStore for FlakyStore {
        fn load_page(&self, page_id: &str) -> BoxFuture<'_, StorageResult<LoadedPage>> {
            self.inner.load_page(page_id)
        }

        fn save_page(&self, page_id: &str, payload: &PagePayload) -> BoxFuture<'_, StorageResult<SaveReceipt>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Box::pin(async { Err(StorageError::Io("disk unplugged".to_string())) });
            }
            self.inner.save_page(page_id, payload)
        }
    }

    fn payload(n: usize) -> PagePayload {
        use crate::element::{ElementSpec, ShapeKind};
        PagePayload {
            canvas_size: DEFAULT_CANVAS_SIZE,
            elements: (0..n)
                .map(|i| ElementSpec::shape(0.0, 0.0, 10.0, 10.0, ShapeKind::Rectangle).into_element(i as i64))
                .collect(),
        }
    }

    async fn wait_for(handle: &SaveHandle, f: impl FnMut(&SaveStatus) -> bool) -> SaveStatus {
        let mut rx = handle.subscribe();
        let status = rx.wait_for(f).await.map(|s| s.clone());
        status.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce() {
        let store = Arc::new(FlakyStore::new(0));
        let saver = DebouncedSaver::start(store.clone(), SaverConfig::default());
        let handle = saver.handle();

        for n in 1..=3 {
            handle.schedule("p1", payload(n));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(handle.status(), SaveStatus::Pending);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        wait_for(&handle, |s| matches!(s, SaveStatus::Saved { .. })).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        let loaded = store.inner.load_page("p1").await.unwrap();
        assert_eq!(loaded.elements.as_array().map(Vec::len), Some(3));

        saver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_then_success() {
        let store = Arc::new(FlakyStore::new(2));
        let saver = DebouncedSaver::start(store.clone(), SaverConfig::default());
        let handle = saver.handle();

        let started = Instant::now();
        handle.schedule("p1", payload(1));
        wait_for(&handle, |s| matches!(s, SaveStatus::Saved { .. })).await;

        // 1s debounce + 3s + 6s backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "{elapsed:?}");
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);

        saver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_error_then_manual_retry() {
        let store = Arc::new(FlakyStore::new(4));
        let saver = DebouncedSaver::start(store.clone(), SaverConfig::default());
        let handle = saver.handle();

        handle.schedule("p1", payload(1));
        let status = wait_for(&handle, |s| matches!(s, SaveStatus::Error { retrying: false, .. })).await;
        assert!(matches!(status, SaveStatus::Error { attempts: 4, .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);

        handle.retry_now();
        wait_for(&handle, |s| matches!(s, SaveStatus::Saved { .. })).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), 5);

        saver.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_stop_write_pending() {
        let store = Arc::new(FlakyStore::new(0));
        let saver = DebouncedSaver::start(store.clone(), SaverConfig::default());
        let handle = saver.handle();

        handle.schedule("p1", payload(2));
        handle.flush().await.unwrap();
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        handle.schedule("p2", payload(1));
        saver.stop().await;
        assert!(store.inner.load_page("p2").await.is_ok());
        assert!(handle.flush().await.is_err());
    }
}
