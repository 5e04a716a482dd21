use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::ScanError;
use crate::core::service::CardChannel;
use crate::core::utils::{format_hex, format_hex_spaced, parse_hex};

/// GET DATA (UID) pseudo-APDU understood by contactless readers
pub const READ_IDENTIFIER: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Status word of a successful response
pub const SW_SUCCESS: (u8, u8) = (0x90, 0x00);

/// Length of a card identifier in bytes
pub const IDENTIFIER_LEN: usize = 8;

/// Shortest acceptable response: identifier plus status word
pub const MIN_RESPONSE_LEN: usize = IDENTIFIER_LEN + 2;

/// Unique identifier (IDm) of a contactless card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier([u8; IDENTIFIER_LEN]);

impl Identifier {
    pub const fn new(bytes: [u8; IDENTIFIER_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }

    /// Compact upper-case hex, e.g. `0102030405060708`
    pub fn to_hex(&self) -> String {
        format_hex(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex_spaced(&self.0))
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for Identifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = parse_hex(&value).map_err(|e| e.to_string())?;
        let bytes: [u8; IDENTIFIER_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| format!("Identifier must be 8 bytes, got {}", b.len()))?;
        Ok(Self(bytes))
    }
}

/// Whether `response` ends with the `90 00` success trailer
pub fn is_success_trailer(response: &[u8]) -> bool {
    matches!(response, [.., sw1, sw2] if (*sw1, *sw2) == SW_SUCCESS)
}

/// Ask the card for its identifier and validate the answer
pub fn read_identifier<C: CardChannel + ?Sized>(card: &C) -> Result<Identifier, ScanError> {
    log::debug!(
        "Transmitting {} using {}",
        format_hex_spaced(&READ_IDENTIFIER),
        card.protocol()
    );

    let response = card.transmit(&READ_IDENTIFIER)?;
    log::debug!("Received response: {}", format_hex_spaced(&response));

    if !is_success_trailer(&response) {
        let (sw1, sw2) = match response.as_slice() {
            [.., sw1, sw2] => (*sw1, *sw2),
            _ => (0, 0),
        };
        return Err(ScanError::StatusWord { sw1, sw2 });
    }

    if response.len() < MIN_RESPONSE_LEN {
        return Err(ScanError::ShortResponse(response.len()));
    }

    let mut id = [0; IDENTIFIER_LEN];
    id.copy_from_slice(&response[..IDENTIFIER_LEN]);
    Ok(Identifier(id))
}
