use std::time::Duration;

use crate::core::error::ScanError;
use crate::core::service::{CardService, PresenceState, ReaderName};

/// Outcome of one bounded presence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Nothing changed within the timeout
    TimedOut,
    /// The reader state changed
    Changed { present: bool },
}

/// Tracks card presence on one reader across poll iterations.
///
/// Each observed state becomes the reference for the next wait, so a card
/// that stays on the reader is reported once rather than on every poll.
#[derive(Debug, Default)]
pub struct PresenceMonitor {
    current: PresenceState,
}

impl PresenceMonitor {
    pub fn new() -> Self {
        Self {
            current: PresenceState::UNAWARE,
        }
    }

    pub fn wait_for_change<S: CardService>(
        &mut self,
        service: &S,
        reader: &ReaderName,
        timeout: Duration,
    ) -> Result<Presence, ScanError> {
        match service.wait_for_change(reader, self.current, timeout)? {
            None => Ok(Presence::TimedOut),
            Some(observed) => {
                self.current = observed;
                Ok(Presence::Changed {
                    present: observed.is_present(),
                })
            }
        }
    }
}
