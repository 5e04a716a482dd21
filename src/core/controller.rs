use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::core::config::ScanConfig;
use crate::core::exchange::Identifier;
use crate::core::platform::PcscProvider;
use crate::core::service::{CardServiceProvider, ProtocolVariant};
use crate::core::worker::ScanWorker;

/// Snapshot of the scanner flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanStatus {
    /// A worker is active
    pub running: bool,
    /// An identifier has been published since the last start
    pub ready: bool,
    /// No unrecoverable error since the last start
    pub ok: bool,
}

/// A published identifier together with where and when it was read
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanRecord {
    pub identifier: Identifier,
    pub reader: Option<String>,
    pub protocol: Option<ProtocolVariant>,
    pub read_at: Option<DateTime<Utc>>,
}

/// State shared between a controller and its worker
#[derive(Debug)]
pub(crate) struct SharedScanState {
    pub(crate) running: AtomicBool,
    pub(crate) ready: AtomicBool,
    pub(crate) ok: AtomicBool,
    pub(crate) cancel: AtomicBool,
    record: Mutex<ScanRecord>,
}

impl SharedScanState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            ok: AtomicBool::new(true),
            cancel: AtomicBool::new(false),
            record: Mutex::new(ScanRecord::default()),
        }
    }

    fn lock_record(&self) -> MutexGuard<'_, ScanRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Prepare for a new worker. Only called once the previous one has been joined.
    fn reset(&self) {
        let mut record = self.lock_record();
        *record = ScanRecord::default();
        self.ready.store(false, Ordering::Release);
        self.ok.store(true, Ordering::Release);
        self.cancel.store(false, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    /// Store the record, then raise `ready` while still holding the lock
    pub(crate) fn publish(&self, published: ScanRecord) {
        let mut record = self.lock_record();
        *record = published;
        self.ready.store(true, Ordering::Release);
        self.ok.store(true, Ordering::Release);
    }

    pub(crate) fn fail(&self) {
        self.ok.store(false, Ordering::Release);
    }
}

/// Runs card scans on a background thread and exposes their result.
///
/// All methods are meant to be called from one thread, typically once per
/// frame or tick. Only [`ScanController::start`] and [`ScanController::stop`]
/// block, and only while a previous worker winds down.
pub struct ScanController<P: CardServiceProvider = PcscProvider> {
    provider: Arc<P>,
    config: ScanConfig,
    state: Arc<SharedScanState>,
    worker: Option<JoinHandle<()>>,
}

impl ScanController<PcscProvider> {
    /// Controller scanning through the system PCSC service
    pub fn pcsc(config: ScanConfig) -> Self {
        Self::new(PcscProvider::new(config.scope), config)
    }
}

impl<P: CardServiceProvider> ScanController<P> {
    pub fn new(provider: P, config: ScanConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
            state: Arc::new(SharedScanState::new()),
            worker: None,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a new scan, stopping and joining any scan still in progress
    pub fn start(&mut self) {
        self.stop();
        self.state.reset();

        let worker = ScanWorker {
            provider: Arc::clone(&self.provider),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        };

        match thread::Builder::new()
            .name("idm-scan".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                log::error!("Failed to spawn scan worker: {e}");
                self.state.fail();
                self.state.running.store(false, Ordering::Release);
            }
        }
    }

    /// Cancel the current scan and wait for the worker to exit.
    ///
    /// Returns at most one poll interval after the worker last checked for
    /// cancellation. Does nothing when no worker is active.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        self.state.cancel.store(true, Ordering::Release);
        if handle.join().is_err() {
            log::error!("Scan worker panicked");
            self.state.fail();
            self.state.running.store(false, Ordering::Release);
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::Acquire)
    }

    pub fn is_ok(&self) -> bool {
        self.state.ok.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ScanStatus {
        ScanStatus {
            running: self.is_running(),
            ready: self.is_ready(),
            ok: self.is_ok(),
        }
    }

    /// Last published identifier; all zero until [`Self::is_ready`] is true
    pub fn identifier(&self) -> Identifier {
        self.state.lock_record().identifier
    }

    /// The published record, if the current scan has read a card
    pub fn record(&self) -> Option<ScanRecord> {
        let record = self.state.lock_record();
        self.is_ready().then(|| record.clone())
    }
}

impl<P: CardServiceProvider> Drop for ScanController<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
