use thiserror::Error;

/// Errors raised while scanning for a card identifier
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to establish PCSC context: {0}")]
    Establish(String),

    #[error("Failed to list readers: {0}")]
    ListReaders(String),

    #[error("No readers available")]
    NoReaders,

    #[error("Invalid reader name: {0:?}")]
    InvalidReaderName(String),

    #[error("Failed to wait for status change: {0}")]
    StatusChange(String),

    #[error("Failed to connect to card on {reader}: {reason}")]
    Connect { reader: String, reason: String },

    #[error("Transmit failed: {0}")]
    Transmit(String),

    #[error("Card answered with status {sw1:02X} {sw2:02X}")]
    StatusWord { sw1: u8, sw2: u8 },

    #[error("Response too short: {0} bytes")]
    ShortResponse(usize),
}

impl ScanError {
    /// Whether the error ends the scan instead of retrying on the next poll.
    ///
    /// Session and enumeration failures, and the selected reader vanishing
    /// while polling, point at a missing service or missing hardware.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Establish(_) | ScanError::ListReaders(_) | ScanError::NoReaders
        )
    }
}
