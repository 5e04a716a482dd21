use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::core::config::ScanConfig;
use crate::core::controller::{ScanRecord, SharedScanState};
use crate::core::error::ScanError;
use crate::core::exchange::read_identifier;
use crate::core::presence::{Presence, PresenceMonitor};
use crate::core::reader::{choose_reader, list_readers};
use crate::core::service::{CardChannel, CardService, CardServiceProvider, ReaderName};
use crate::core::utils::describe_status_word;

/// How a scan ended
#[derive(Debug)]
pub enum ScanOutcome {
    /// An identifier was read
    Published(ScanRecord),
    /// The cancel flag was raised before a card answered
    Cancelled,
    /// The session or reader enumeration failed
    Failed(ScanError),
}

/// Run one scan to completion on the calling thread.
///
/// Fatal errors (see [`ScanError::is_fatal`]) end the scan. Connect and
/// exchange failures are retried on the next presence change until a card
/// answers or `cancel` is raised. `cancel` is checked once per poll interval.
pub fn run_scan<P: CardServiceProvider>(
    provider: &P,
    config: &ScanConfig,
    cancel: &AtomicBool,
) -> ScanOutcome {
    match scan(provider, config, cancel) {
        Ok(Some(record)) => ScanOutcome::Published(record),
        Ok(None) => ScanOutcome::Cancelled,
        Err(e) => ScanOutcome::Failed(e),
    }
}

fn scan<P: CardServiceProvider>(
    provider: &P,
    config: &ScanConfig,
    cancel: &AtomicBool,
) -> Result<Option<ScanRecord>, ScanError> {
    let service = provider.establish()?;
    let mut readers = list_readers(&service)?;
    let reader = readers.swap_remove(choose_reader(&readers, &config.preferred_readers));
    log::info!("Scanning on reader: {reader}");

    let interval = config.poll_interval();
    let mut monitor = PresenceMonitor::new();

    while !cancel.load(Ordering::Acquire) {
        match monitor.wait_for_change(&service, &reader, interval) {
            Ok(Presence::Changed { present: true }) => {}
            Ok(Presence::Changed { present: false }) | Ok(Presence::TimedOut) => continue,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::debug!("Presence wait failed: {e}");
                thread::sleep(interval);
                continue;
            }
        }

        match read_card(&service, &reader) {
            Ok(record) => return Ok(Some(record)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(ScanError::StatusWord { sw1, sw2 }) => log::debug!(
                "Card rejected identifier read: {}",
                describe_status_word(sw1, sw2)
            ),
            Err(e) => log::debug!("Card read failed, waiting for next presence change: {e}"),
        }
    }

    Ok(None)
}

/// Connect, read the identifier, and release the card before returning
fn read_card<S: CardService>(service: &S, reader: &ReaderName) -> Result<ScanRecord, ScanError> {
    let card = service.connect(reader)?;
    let identifier = read_identifier(&card)?;

    Ok(ScanRecord {
        identifier,
        reader: Some(reader.to_string()),
        protocol: Some(card.protocol()),
        read_at: Some(Utc::now()),
    })
}

/// The unit of work run on a controller's background thread
pub(crate) struct ScanWorker<P> {
    pub(crate) provider: Arc<P>,
    pub(crate) config: ScanConfig,
    pub(crate) state: Arc<SharedScanState>,
}

impl<P: CardServiceProvider> ScanWorker<P> {
    pub(crate) fn run(self) {
        match run_scan(self.provider.as_ref(), &self.config, &self.state.cancel) {
            ScanOutcome::Published(record) => {
                log::info!("Read card identifier {}", record.identifier);
                self.state.publish(record);
            }
            ScanOutcome::Cancelled => log::debug!("Scan cancelled"),
            ScanOutcome::Failed(e) => {
                log::error!("Scan aborted: {e}");
                self.state.fail();
            }
        }

        self.state.running.store(false, Ordering::Release);
    }
}
