//! Error kinds for the scan pipeline.

use thiserror::Error;

/// Errors a scan can surface. Most engine/policy failures are caught and
/// logged at the call site instead of propagating one of these — this
/// type exists for the cases that genuinely must abort (malformed request,
/// exhausted AI quota, unrecoverable internal failure).
#[derive(Debug, Error)]
pub enum ScanError {
    /// A policy file or rule pack could not be parsed. Callers treat this
    /// as "not found" and fall back to defaults; it is not fatal to a scan.
    #[error("config error: {0}")]
    Config(String),

    /// A single engine failed to analyze a file. Recoverable: the file is
    /// retained with whatever violations were already collected.
    #[error("engine error: {0}")]
    Engine(String),

    /// The AI adapter's quota has been exhausted for this window.
    #[error("AI quota exceeded: {0}")]
    Quota(String),

    /// The incoming `ScanRequest` is malformed (e.g. an unrecognized
    /// severity literal in a policy override).
    #[error("validation error: {0}")]
    Validation(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ScanOutcome<T> = Result<T, ScanError>;
