//! Error types for archive patching.
//!
//! Every fallible function in this crate returns [`Result<T>`], which uses [`Error`]
//! as the error type. Per-entry failures inside a patch run are *recorded* in the
//! [`RunReport`](crate::RunReport) rather than propagated, so only run-level
//! preconditions ever surface from [`PatchOrchestrator::run`](crate::PatchOrchestrator::run).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, encoding, or writing replacement entries.
#[derive(Error, Debug)]
pub enum Error {
    /// The archive index has no slot for this logical path (or returned the
    /// reserved offset `0`).
    #[error("File path does not resolve to a slot: {path}")]
    NotFound { path: String },

    /// Another entry in the same run already targeted this offset.
    #[error("Another file already has this offset ({offset:x})")]
    DuplicateOffset { offset: u64 },

    /// The replacement file is larger than the slot's decoded size limit.
    #[error("Decoded size ({size}) exceeds its limit: ({limit})")]
    DecodedTooLarge { size: u64, limit: u32 },

    /// No compression level produced an output that could be padded to the target.
    #[error("File unable to be compressed to {target} bytes ({levels_tried} levels tried)")]
    EncodeInfeasible { target: u32, levels_tried: usize },

    /// A stored (uncompressed) slot requires the file to match its size exactly.
    #[error("Uncompressed file must match the slot size ({expected}), got {actual}")]
    SizeMismatch { expected: u32, actual: u64 },

    /// The encoded buffer is too short to contain the frame header it describes.
    #[error("Malformed frame header ({len} bytes)")]
    MalformedFrame { len: usize },

    /// The padded frame did not come out at the target size. This indicates a bug.
    #[error("Padded frame size mismatch: expected {expected}, got {actual}")]
    EncodeInternalError { expected: u32, actual: usize },

    /// The sink failed to write or upload an encoded block.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// The block compressor itself failed.
    #[error("Compression error: {0}")]
    Compression(String),

    /// A compression level outside `1..=22` was configured.
    #[error("Compression level must be between 1 and 22 inclusive (got {0})")]
    InvalidLevel(i32),

    /// The mod tree root does not exist or is not a directory.
    #[error("Invalid mod directory: {0}")]
    InvalidModRoot(Utf8PathBuf),

    /// Dump-only runs cannot target the in-place archive writer.
    #[error("Dump mode requires a folder or remote sink")]
    ModeSinkMismatch,

    /// The worker pool needs at least one thread.
    #[error("Job count must be at least 1 (got {0})")]
    InvalidJobs(usize),

    /// The run was cancelled before this entry was processed.
    #[error("Cancelled")]
    Cancelled,

    /// Filesystem I/O failed (reading mod files, reading the container, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a slot manifest.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal of the mod tree failed.
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Catch-all for errors from index implementations and other sources.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

/// Errors raised by [`Sink`](crate::sink::Sink) implementations.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Local file write failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote answered with a non-success status.
    #[error("Remote returned status {status} for {path}")]
    Http { status: u16, path: String },

    /// The remote did not answer within the configured timeout.
    #[error("Remote request timed out: {path}")]
    Timeout { path: String },

    /// Any other transport-level failure (connection refused, TLS, ...).
    #[error("Transport error: {0}")]
    Transport(String),
}
