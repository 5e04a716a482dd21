//! Seam between the scan loop and the platform card service.
//!
//! The worker only talks to these traits; [`crate::core::platform`] implements
//! them on top of the `pcsc` crate.

use std::ffi::CString;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::ScanError;

/// Name of one reader visible to the card service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReaderName(String);

impl ReaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to the null-terminated form expected by PCSC
    pub fn to_cstring(&self) -> Result<CString, ScanError> {
        CString::new(self.0.as_bytes()).map_err(|_| ScanError::InvalidReaderName(self.0.clone()))
    }
}

impl fmt::Display for ReaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReaderName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Card presence bitmask as reported by the card service.
///
/// The low word holds the state flags, the high word the reader's event
/// counter. Both must be handed back unchanged on the next wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresenceState(u32);

impl PresenceState {
    pub const UNAWARE: Self = Self(0x0000);
    pub const CHANGED: Self = Self(0x0002);
    pub const EMPTY: Self = Self(0x0010);
    pub const PRESENT: Self = Self(0x0020);

    const FLAGS_MASK: u32 = 0x0000_FFFF;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Combine reported state flags with the reader's event counter
    pub fn from_event(flags: u32, count: u32) -> Self {
        Self(flags & Self::FLAGS_MASK) | Self(count << 16)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn event_count(self) -> u32 {
        self.0 >> 16
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a card currently occupies the reader
    pub const fn is_present(self) -> bool {
        self.contains(Self::PRESENT)
    }
}

impl std::ops::BitOr for PresenceState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Transmission protocol negotiated when connecting to a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVariant {
    T0,
    T1,
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::T0 => f.write_str("T=0"),
            ProtocolVariant::T1 => f.write_str("T=1"),
        }
    }
}

/// A connected card. Dropping it releases the card without resetting it.
#[cfg_attr(test, mockall::automock)]
pub trait CardChannel {
    /// Protocol negotiated at connect time
    fn protocol(&self) -> ProtocolVariant;

    /// Send a command using the negotiated framing and return the raw response
    fn transmit(&self, command: &[u8]) -> Result<Vec<u8>, ScanError>;
}

/// An established session with the card service
pub trait CardService {
    type Card: CardChannel;

    /// Size in bytes of the raw multi-string reader list
    fn reader_list_len(&self) -> Result<usize, ScanError>;

    /// Fill `buf` with the raw null-separated reader list
    fn read_reader_list(&self, buf: &mut [u8]) -> Result<(), ScanError>;

    /// Block up to `timeout` for the state of `reader` to differ from `current`.
    ///
    /// Returns `Ok(None)` on timeout, otherwise the newly observed state.
    fn wait_for_change(
        &self,
        reader: &ReaderName,
        current: PresenceState,
        timeout: Duration,
    ) -> Result<Option<PresenceState>, ScanError>;

    /// Connect in shared mode, accepting either T=0 or T=1
    fn connect(&self, reader: &ReaderName) -> Result<Self::Card, ScanError>;
}

/// Opens sessions with the card service. Lives for the controller's lifetime
/// and is shared with every worker it spawns.
pub trait CardServiceProvider: Send + Sync + 'static {
    type Service: CardService;

    fn establish(&self) -> Result<Self::Service, ScanError>;
}
