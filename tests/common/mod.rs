//! Scripted card service for exercising the scanner without hardware
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use idm_scanner::core::error::ScanError;
use idm_scanner::core::service::{
    CardChannel, CardService, CardServiceProvider, PresenceState, ProtocolVariant, ReaderName,
};

pub const GOOD_RESPONSE: [u8; 10] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x90, 0x00];
pub const FILE_NOT_FOUND: [u8; 2] = [0x6A, 0x82];

#[derive(Default)]
pub struct Script {
    pub establish_fails: bool,
    pub list_fails: bool,
    pub raw_readers: Vec<u8>,
    pub protocol: Option<ProtocolVariant>,
    events: Mutex<VecDeque<Result<Option<PresenceState>, ScanError>>>,
    responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    connect_failures: AtomicUsize,

    pub establishes: AtomicUsize,
    pub releases: AtomicUsize,
    pub waits: AtomicUsize,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub transmits: AtomicUsize,
    pub seen_states: Mutex<Vec<PresenceState>>,
    pub connected_readers: Mutex<Vec<String>>,
}

impl Script {
    /// One reader, no card activity
    pub fn new() -> Self {
        Self::with_readers(&["Mock Reader 0"])
    }

    pub fn with_readers(readers: &[&str]) -> Self {
        let mut raw = Vec::new();
        for reader in readers {
            raw.extend_from_slice(reader.as_bytes());
            raw.push(0);
        }
        raw.push(0);

        Self {
            raw_readers: raw,
            ..Default::default()
        }
    }

    pub fn establish_fails(mut self) -> Self {
        self.establish_fails = true;
        self
    }

    pub fn list_fails(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn raw_readers(mut self, raw: &[u8]) -> Self {
        self.raw_readers = raw.to_vec();
        self
    }

    pub fn protocol(mut self, protocol: ProtocolVariant) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Queue `count` card taps: each tap reports the card arriving, then leaving
    pub fn taps(self, count: usize) -> Self {
        {
            let mut events = self.events.lock().unwrap();
            for _ in 0..count {
                events.push_back(Ok(Some(PresenceState::CHANGED | PresenceState::PRESENT)));
                events.push_back(Ok(Some(PresenceState::CHANGED | PresenceState::EMPTY)));
            }
        }
        self
    }

    pub fn event(self, event: Result<Option<PresenceState>, ScanError>) -> Self {
        self.events.lock().unwrap().push_back(event);
        self
    }

    pub fn response(self, response: &[u8]) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response.to_vec()));
        self
    }

    pub fn transmit_error(self, reason: &str) -> Self {
        self.responses.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn connect_failures(self, count: usize) -> Self {
        self.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeProvider {
    pub script: Arc<Script>,
}

impl FakeProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
        }
    }
}

impl CardServiceProvider for FakeProvider {
    type Service = FakeService;

    fn establish(&self) -> Result<FakeService, ScanError> {
        if self.script.establish_fails {
            return Err(ScanError::Establish("Service not available".into()));
        }
        self.script.establishes.fetch_add(1, Ordering::SeqCst);
        Ok(FakeService {
            script: Arc::clone(&self.script),
        })
    }
}

pub struct FakeService {
    script: Arc<Script>,
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.script.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl CardService for FakeService {
    type Card = FakeCard;

    fn reader_list_len(&self) -> Result<usize, ScanError> {
        if self.script.list_fails {
            return Err(ScanError::ListReaders("Access denied".into()));
        }
        Ok(self.script.raw_readers.len())
    }

    fn read_reader_list(&self, buf: &mut [u8]) -> Result<(), ScanError> {
        buf.copy_from_slice(&self.script.raw_readers);
        Ok(())
    }

    fn wait_for_change(
        &self,
        _reader: &ReaderName,
        current: PresenceState,
        timeout: Duration,
    ) -> Result<Option<PresenceState>, ScanError> {
        self.script.waits.fetch_add(1, Ordering::SeqCst);
        self.script.seen_states.lock().unwrap().push(current);

        let next = self.script.events.lock().unwrap().pop_front();
        match next {
            Some(event) => event,
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn connect(&self, reader: &ReaderName) -> Result<FakeCard, ScanError> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        self.script
            .connected_readers
            .lock()
            .unwrap()
            .push(reader.to_string());

        let failing = self
            .script
            .connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ScanError::Connect {
                reader: reader.to_string(),
                reason: "Card removed".into(),
            });
        }

        Ok(FakeCard {
            script: Arc::clone(&self.script),
            protocol: self.script.protocol.unwrap_or(ProtocolVariant::T1),
        })
    }
}

pub struct FakeCard {
    script: Arc<Script>,
    protocol: ProtocolVariant,
}

impl Drop for FakeCard {
    fn drop(&mut self) {
        self.script.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

impl CardChannel for FakeCard {
    fn protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    fn transmit(&self, _command: &[u8]) -> Result<Vec<u8>, ScanError> {
        self.script.transmits.fetch_add(1, Ordering::SeqCst);
        let next = self.script.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(ScanError::Transmit(reason)),
            None => Ok(FILE_NOT_FOUND.to_vec()),
        }
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
