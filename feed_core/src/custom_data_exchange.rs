//! Custom-data exchange. A single background worker cooperatively polls a
//! registry of slow/polled producers (coarse-universe snapshots, custom
//! data, time-triggered universe ticks) on a shared sleep interval, so none
//! of them need their own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::data_model::{DataPoint, Symbol};
use crate::point_source::BoxedSource;

type OnData = Arc<dyn Fn(DataPoint) + Send + Sync>;
type OnFinished = Arc<dyn Fn() + Send + Sync>;

struct Entry {
    source: BoxedSource,
    on_data: OnData,
    on_finished: OnFinished,
}

/// `add`/`remove` are safe to call while the worker is running — both
/// operate on a `DashMap` shared between this registration API and the
/// background polling task.
pub struct CustomDataExchange {
    entries: Arc<DashMap<Symbol, Entry>>,
    sleep_interval: StdDuration,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CustomDataExchange {
    pub fn new(sleep_interval: StdDuration) -> Self {
        CustomDataExchange {
            entries: Arc::new(DashMap::new()),
            sleep_interval,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Registers a polled source. Replaces any existing entry under the same
    /// symbol without firing its `on_finished` hook (a plain replace, not a
    /// stop).
    pub fn add(&self, symbol: Symbol, source: BoxedSource, on_data: OnData, on_finished: OnFinished) {
        self.entries.insert(symbol, Entry { source, on_data, on_finished });
    }

    pub fn remove(&self, symbol: &Symbol) {
        self.entries.remove(symbol);
    }

    pub fn is_registered(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    /// Starts the shared worker task. Idempotent: a second call while
    /// already running is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return;
        }
        self.running.store(true, Ordering::Release);
        let entries = self.entries.clone();
        let running = self.running.clone();
        let sleep_interval = self.sleep_interval;
        *worker = Some(tokio::spawn(async move {
            Self::run(entries, running, sleep_interval).await;
        }));
    }

    async fn run(entries: Arc<DashMap<Symbol, Entry>>, running: Arc<AtomicBool>, sleep_interval: StdDuration) {
        while running.load(Ordering::Acquire) {
            let mut finished = Vec::new();
            for mut kv in entries.iter_mut() {
                let symbol = kv.key().clone();
                let entry = kv.value_mut();
                if entry.source.move_next() {
                    if let Some(point) = entry.source.current().cloned() {
                        (entry.on_data)(point);
                    }
                } else {
                    debug!("custom-data exchange: no data this cycle for {symbol}");
                }
                if entry.source.is_finished() {
                    finished.push(symbol);
                }
            }
            for symbol in finished {
                if let Some((_, mut entry)) = entries.remove(&symbol) {
                    entry.source.dispose();
                    (entry.on_finished)();
                }
            }
            tokio::time::sleep(sleep_interval).await;
        }
    }

    /// Signals every registered entry to finish and stops the worker within
    /// one sleep interval. Drains no data itself.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
        }
        let symbols: Vec<Symbol> = self.entries.iter().map(|kv| kv.key().clone()).collect();
        for symbol in symbols {
            if let Some((_, mut entry)) = self.entries.remove(&symbol) {
                entry.source.dispose();
                (entry.on_finished)();
            }
        }
    }
}

impl Drop for CustomDataExchange {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::AcqRel) {
            warn!("CustomDataExchange dropped without stop() — registered entries were not signalled");
        }
    }
}
