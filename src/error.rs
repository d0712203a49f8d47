//! Error types.

use thiserror::Error;

/// Failure below the device session boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to access HID: {0}")]
    Api(#[source] hidapi::HidError),

    #[error("unable to open device: {0} (root permissions required)")]
    Open(#[source] hidapi::HidError),

    #[error("unable to write report: {0}")]
    Write(#[source] hidapi::HidError),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("write worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Malformed report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad report length: {0} (expected 65)")]
    BadLength(usize),

    #[error("bad report id: {0:#04x}")]
    BadReportId(u8),

    #[error("unknown instruction: {0:#04x}")]
    UnknownInstruction(u8),

    #[error("unknown control command: {0:#04x}")]
    UnknownCommand(u8),

    #[error("unknown mode: {0}")]
    UnknownMode(u8),
}
