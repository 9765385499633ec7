//! Caption Data Models
//!
//! Defines the caption entry held by the timeline store and the draft used to
//! create or replace one.
//!
//! # Overview
//!
//! Intervals are closed on both ends: a caption ending at 3.0s and another
//! starting at 3.0s overlap. Bounds are compared at millisecond resolution
//! (see [`to_millis`]).

use serde::{Deserialize, Serialize};

use crate::core::{
    is_valid_time_sec, to_millis, CaptionId, CoreError, CoreResult, Millis, TimeSec,
};

// =============================================================================
// Caption Entry
// =============================================================================

/// A single committed caption with text and timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEntry {
    /// Unique identifier, stable across updates
    pub id: CaptionId,
    /// Start time in seconds
    pub start_sec: TimeSec,
    /// End time in seconds
    pub end_sec: TimeSec,
    /// Caption text (may contain line breaks)
    pub text: String,
}

impl CaptionEntry {
    pub(crate) fn from_draft(id: CaptionId, draft: CaptionDraft) -> Self {
        Self {
            id,
            start_sec: draft.start_sec,
            end_sec: draft.end_sec,
            text: draft.text,
        }
    }

    /// Returns the duration of this caption in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }

    /// Returns true if the caption is showing at the given time.
    ///
    /// Both bounds are inclusive.
    pub fn contains(&self, time_sec: TimeSec) -> bool {
        time_sec >= self.start_sec && time_sec <= self.end_sec
    }

    /// Returns true if this caption's closed interval intersects the given one
    pub fn overlaps_range(&self, start_sec: TimeSec, end_sec: TimeSec) -> bool {
        ranges_touch(self.millis(), (to_millis(start_sec), to_millis(end_sec)))
    }

    /// Returns true if the two captions overlap under the closed-interval rule
    pub fn overlaps(&self, other: &CaptionEntry) -> bool {
        ranges_touch(self.millis(), other.millis())
    }

    /// Returns the draft that would recreate this entry
    pub fn to_draft(&self) -> CaptionDraft {
        CaptionDraft {
            text: self.text.clone(),
            start_sec: self.start_sec,
            end_sec: self.end_sec,
        }
    }

    fn millis(&self) -> (Millis, Millis) {
        (to_millis(self.start_sec), to_millis(self.end_sec))
    }
}

fn ranges_touch(a: (Millis, Millis), b: (Millis, Millis)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

// =============================================================================
// Caption Draft
// =============================================================================

/// The complete desired state of a caption, before validation.
///
/// Updates replace an entry with a whole draft; there is no partial merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionDraft {
    pub text: String,
    pub start_sec: TimeSec,
    pub end_sec: TimeSec,
}

impl CaptionDraft {
    pub fn new(start_sec: TimeSec, end_sec: TimeSec, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_sec,
            end_sec,
        }
    }

    /// Builds a draft from raw form input.
    ///
    /// Times are parsed as decimal seconds; anything that does not parse is an
    /// `InvalidTime` error rather than a silent zero.
    pub fn from_input(text: &str, start: &str, end: &str) -> CoreResult<Self> {
        let start_sec = parse_seconds(start);
        let end_sec = parse_seconds(end);
        match (start_sec, end_sec) {
            (Some(start_sec), Some(end_sec)) => Ok(Self::new(start_sec, end_sec, text)),
            _ => Err(CoreError::invalid_time(
                start_sec.unwrap_or(f64::NAN),
                end_sec.unwrap_or(f64::NAN),
                "start and end must be numbers",
            )),
        }
    }

    /// Checks everything about the draft that does not depend on other entries
    pub fn check_shape(&self) -> CoreResult<()> {
        if self.text.trim().is_empty() {
            return Err(CoreError::EmptyText);
        }
        if self.text.contains("-->") {
            return Err(CoreError::InvalidText(
                "caption text cannot contain \"-->\"".to_string(),
            ));
        }
        // Cue readers fold "\r\n" into a line break, so a stored '\r' would not survive export
        if self.text.contains('\r') {
            return Err(CoreError::InvalidText(
                "caption text cannot contain carriage returns".to_string(),
            ));
        }
        if self.text.split('\n').any(|line| line.trim().is_empty()) {
            return Err(CoreError::InvalidText(
                "caption text cannot contain blank lines".to_string(),
            ));
        }

        if !is_valid_time_sec(self.start_sec) || !self.end_sec.is_finite() {
            return Err(CoreError::invalid_time(
                self.start_sec,
                self.end_sec,
                "times must be finite and non-negative",
            ));
        }
        if to_millis(self.start_sec) >= to_millis(self.end_sec) {
            return Err(CoreError::invalid_time(
                self.start_sec,
                self.end_sec,
                "start must be before end",
            ));
        }
        Ok(())
    }
}

fn parse_seconds(raw: &str) -> Option<TimeSec> {
    raw.trim().parse::<TimeSec>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Tests
// =============================================================================
