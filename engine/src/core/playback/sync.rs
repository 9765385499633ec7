//! Playback Synchronizer
//!
//! Maps a playback position to the caption showing at that instant. The
//! lookup is a pure function of `(entries, time)` and keeps no memory between
//! calls, so edits made mid-playback are picked up on the very next sample.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{captions::CaptionEntry, is_valid_time_sec, CaptionId, CoreError, CoreResult, TimeSec};

/// Below this many entries a linear scan is used when the strategy is `Auto`
pub const DEFAULT_SCAN_THRESHOLD: usize = 64;

/// How the active caption is located
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStrategy {
    /// Scan small timelines, bisect large ones
    #[default]
    Auto,
    /// Check every entry and count matches
    Scan,
    /// Binary search by start time
    Bisect,
}

/// Lookup strategy plus the size at which `Auto` switches to bisection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub strategy: LookupStrategy,
    pub scan_threshold: usize,
}

impl Default for Lookup {
    fn default() -> Self {
        Self {
            strategy: LookupStrategy::Auto,
            scan_threshold: DEFAULT_SCAN_THRESHOLD,
        }
    }
}

impl Lookup {
    pub fn new(strategy: LookupStrategy, scan_threshold: usize) -> Self {
        Self {
            strategy,
            scan_threshold,
        }
    }

    /// Finds the caption containing `time` (both bounds inclusive).
    ///
    /// `entries` must be ordered by start time, as every snapshot is. More
    /// than one match means the non-overlap invariant was broken somewhere
    /// upstream and is reported instead of silently picking one.
    pub fn find<'a>(
        &self,
        entries: &'a [CaptionEntry],
        time: TimeSec,
    ) -> CoreResult<Option<&'a CaptionEntry>> {
        if !is_valid_time_sec(time) {
            return Ok(None);
        }

        let bisect = match self.strategy {
            LookupStrategy::Scan => false,
            LookupStrategy::Bisect => true,
            LookupStrategy::Auto => entries.len() >= self.scan_threshold,
        };

        if bisect {
            find_bisect(entries, time)
        } else {
            find_scan(entries, time)
        }
    }
}

fn find_scan(entries: &[CaptionEntry], time: TimeSec) -> CoreResult<Option<&CaptionEntry>> {
    let mut matches = entries.iter().filter(|e| e.contains(time));
    let first = matches.next();
    if let Some(second) = matches.next() {
        let first_id = first.map(|e| e.id.as_str()).unwrap_or_default();
        return Err(overlap_violation(time, first_id, &second.id));
    }
    Ok(first)
}

/// Binary search by start time.
///
/// On a valid timeline only the last entry starting at or before `time` can
/// contain it. If that entry overlaps its predecessor the ordering is broken,
/// and the prefix is scanned so the answer matches `Scan`. Corruption that
/// does not involve the candidate's neighbour goes unnoticed here.
fn find_bisect(entries: &[CaptionEntry], time: TimeSec) -> CoreResult<Option<&CaptionEntry>> {
    let idx = entries.partition_point(|e| e.start_sec <= time);
    let Some(last) = idx.checked_sub(1) else {
        return Ok(None);
    };
    let candidate = &entries[last];

    let disordered = last
        .checked_sub(1)
        .is_some_and(|prev| entries[prev].overlaps(candidate));
    if disordered {
        return find_scan(&entries[..idx], time);
    }

    Ok(candidate.contains(time).then_some(candidate))
}

fn overlap_violation(time: TimeSec, a: &str, b: &str) -> CoreError {
    warn!("Captions {} and {} are both active at {:.3}s", a, b, time);
    CoreError::InvariantViolation(format!(
        "captions {a} and {b} are both active at {time:.3}s"
    ))
}

/// Finds the caption active at `time` using the default lookup
pub fn active_caption_at(
    entries: &[CaptionEntry],
    time: TimeSec,
) -> CoreResult<Option<&CaptionEntry>> {
    Lookup::default().find(entries, time)
}

/// Text of the caption active at `time`, if any
pub fn active_caption_text(entries: &[CaptionEntry], time: TimeSec) -> CoreResult<Option<String>> {
    Ok(active_caption_at(entries, time)?.map(|e| e.text.clone()))
}

// =============================================================================
// Active Caption
// =============================================================================

/// The caption currently showing, as published to the overlay
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCaption {
    pub id: CaptionId,
    pub text: String,
}

impl From<&CaptionEntry> for ActiveCaption {
    fn from(entry: &CaptionEntry) -> Self {
        Self {
            id: entry.id.clone(),
            text: entry.text.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
