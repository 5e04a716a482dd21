//! [`CardService`] implementation backed by the `pcsc` crate.

use pcsc::{
    Card, Context, Disposition, Protocol, Protocols, ReaderState, ShareMode, State,
    MAX_BUFFER_SIZE,
};
use std::cell::RefCell;
use std::time::Duration;

use crate::core::config::ScopeSetting;
use crate::core::error::ScanError;
use crate::core::service::{
    CardChannel, CardService, CardServiceProvider, PresenceState, ProtocolVariant, ReaderName,
};

/// Establishes PCSC contexts
#[derive(Debug, Clone, Copy, Default)]
pub struct PcscProvider {
    scope: ScopeSetting,
}

impl PcscProvider {
    pub fn new(scope: ScopeSetting) -> Self {
        Self { scope }
    }
}

impl CardServiceProvider for PcscProvider {
    type Service = PcscService;

    fn establish(&self) -> Result<PcscService, ScanError> {
        let context = Context::establish(self.scope.into())
            .map_err(|e| ScanError::Establish(e.to_string()))?;

        log::debug!("PCSC context established ({:?} scope)", self.scope);
        Ok(PcscService {
            context,
            tracked: RefCell::new(None),
        })
    }
}

/// An established PCSC context, released when dropped
pub struct PcscService {
    context: Context,
    tracked: RefCell<Option<TrackedReader>>,
}

/// Reader state kept across waits so the event counter reaches the service
struct TrackedReader {
    reader: ReaderName,
    state: ReaderState,
    /// What the last wait handed back, counter included
    current: PresenceState,
}

impl TrackedReader {
    fn new(reader: &ReaderName, current: PresenceState) -> Result<Self, ScanError> {
        Ok(Self {
            reader: reader.clone(),
            state: ReaderState::new(
                reader.to_cstring()?,
                State::from_bits_truncate(current.bits() as _),
            ),
            current,
        })
    }

    fn continues(&self, reader: &ReaderName, current: PresenceState) -> bool {
        self.reader == *reader && self.current == current
    }
}

impl CardService for PcscService {
    type Card = PcscCard;

    fn reader_list_len(&self) -> Result<usize, ScanError> {
        match self.context.list_readers_len() {
            Ok(len) => Ok(len),
            // Reported as an empty list so enumeration fails with NoReaders
            Err(pcsc::Error::NoReadersAvailable) => Ok(0),
            Err(e) => Err(ScanError::ListReaders(e.to_string())),
        }
    }

    fn read_reader_list(&self, buf: &mut [u8]) -> Result<(), ScanError> {
        match self.context.list_readers(buf) {
            Ok(_) => Ok(()),
            Err(pcsc::Error::NoReadersAvailable) => Err(ScanError::NoReaders),
            Err(e) => Err(ScanError::ListReaders(e.to_string())),
        }
    }

    fn wait_for_change(
        &self,
        reader: &ReaderName,
        current: PresenceState,
        timeout: Duration,
    ) -> Result<Option<PresenceState>, ScanError> {
        let mut tracked = match self.tracked.borrow_mut().take() {
            Some(tracked) if tracked.continues(reader, current) => tracked,
            _ => TrackedReader::new(reader, current)?,
        };

        match self
            .context
            .get_status_change(timeout, std::slice::from_mut(&mut tracked.state))
        {
            Ok(()) => {
                let observed = PresenceState::from_event(
                    tracked.state.event_state().bits() as u32,
                    tracked.state.event_count(),
                );
                tracked.state.sync_current_state();
                tracked.current = observed;
                self.tracked.replace(Some(tracked));
                Ok(Some(observed))
            }
            Err(pcsc::Error::Timeout) => {
                self.tracked.replace(Some(tracked));
                Ok(None)
            }
            // Selected reader no longer exists
            Err(pcsc::Error::UnknownReader) => Err(ScanError::NoReaders),
            Err(e) => Err(ScanError::StatusChange(e.to_string())),
        }
    }

    fn connect(&self, reader: &ReaderName) -> Result<PcscCard, ScanError> {
        let reader_cstr = reader.to_cstring()?;
        let connect_error = |reason: String| ScanError::Connect {
            reader: reader.to_string(),
            reason,
        };

        let card = self
            .context
            .connect(&reader_cstr, ShareMode::Shared, Protocols::T0 | Protocols::T1)
            .map_err(|e| connect_error(e.to_string()))?;

        let protocol = match card.status2_owned().map(|status| status.protocol2()) {
            Ok(Some(Protocol::T0)) => ProtocolVariant::T0,
            Ok(Some(Protocol::T1)) => ProtocolVariant::T1,
            Ok(other) => {
                release(card);
                return Err(connect_error(format!("unexpected protocol {other:?}")));
            }
            Err(e) => {
                release(card);
                return Err(connect_error(e.to_string()));
            }
        };

        log::debug!("Connected to card on {reader} using {protocol}");
        Ok(PcscCard {
            card: Some(card),
            protocol,
        })
    }
}

/// A connected card, left untouched (not reset) when dropped
pub struct PcscCard {
    card: Option<Card>,
    protocol: ProtocolVariant,
}

impl CardChannel for PcscCard {
    fn protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    fn transmit(&self, command: &[u8]) -> Result<Vec<u8>, ScanError> {
        let card = self
            .card
            .as_ref()
            .ok_or_else(|| ScanError::Transmit("card already released".to_string()))?;

        let mut response_buf = [0; MAX_BUFFER_SIZE];
        card.transmit(command, &mut response_buf)
            .map(|response| response.to_vec())
            .map_err(|e| ScanError::Transmit(e.to_string()))
    }
}

impl Drop for PcscCard {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            release(card);
        }
    }
}

fn release(card: Card) {
    if let Err((_card, e)) = card.disconnect(Disposition::LeaveCard) {
        log::warn!("Failed to disconnect cleanly from card: {e}");
    }
}
