//! Cuekit Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::{captions::ParseError, CaptionId, TimeSec};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Caption Validation Errors
    // =========================================================================
    #[error("Caption text is empty")]
    EmptyText,

    #[error("Invalid caption text: {0}")]
    InvalidText(String),

    #[error("Invalid time range: {start}~{end} seconds ({reason})")]
    InvalidTime {
        start: TimeSec,
        end: TimeSec,
        reason: String,
    },

    #[error("Caption overlap: {start:.3}~{end:.3}s conflicts with caption {existing_id}")]
    Overlap {
        existing_id: CaptionId,
        start: TimeSec,
        end: TimeSec,
    },

    #[error("Caption not found: {0}")]
    NotFound(CaptionId),

    // =========================================================================
    // Format Errors
    // =========================================================================
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // =========================================================================
    // Playback Errors
    // =========================================================================
    #[error("Timeline invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Playback clock unavailable: {0}")]
    ClockUnavailable(String),

    #[error("Invalid video source: {0}")]
    InvalidSource(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub(crate) fn invalid_time(start: TimeSec, end: TimeSec, reason: &str) -> Self {
        Self::InvalidTime {
            start,
            end,
            reason: reason.to_string(),
        }
    }

    /// Returns true for errors caused by a rejected caption edit.
    ///
    /// These are the errors a host shows next to the edit form; the store is
    /// unchanged when one is returned.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyText
                | Self::InvalidText(_)
                | Self::InvalidTime { .. }
                | Self::Overlap { .. }
        )
    }
}
