//! Structured error types for the etikett engine.
//!
//! Layout computation itself is total and never returns an error; these
//! variants cover the seams around it: job parsing, unknown layout keys,
//! per-row QR encoding, and output I/O.

use thiserror::Error;

/// The unified error type returned by the public etikett API.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The requested layout key is not present in the registry.
    #[error("unknown layout: {0}")]
    UnknownLayout(String),

    /// JSON input failed to parse as a print job, schema, or data row.
    #[error("failed to parse input: {0}")]
    Parse(#[from] serde_json::Error),

    /// A QR payload could not be encoded into a matrix.
    #[error("qr encoding failed: {0}")]
    Qr(String),

    /// Writing the rendered output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
