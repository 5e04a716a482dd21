/// IDm Scanner - Background reader for contactless card identifiers
///
/// This library scans a PCSC reader on a background thread, reads the
/// 8-byte identifier of the first card presented, and exposes the result
/// through a thread-safe status surface. A CLI and a GUI are built on top.
pub mod cli;
pub mod core;
pub mod gui;

// Re-export commonly used types
pub use crate::core::{
    config::ScanConfig,
    controller::{ScanController, ScanRecord, ScanStatus},
    error::ScanError,
    exchange::Identifier,
    utils::{format_hex, format_hex_spaced, parse_hex},
};

// Common error type
pub type Result<T> = anyhow::Result<T>;
