//! Playback Clocks
//!
//! The engine never owns the media surface. It only reads "where is playback
//! now" through [`PlaybackClock`], implemented by the host for a native media
//! element or an embedded third-party player.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::{is_valid_time_sec, round_to_decimals, CoreError, CoreResult, TimeSec};

/// What kind of surface a clock reads from.
///
/// Native media elements announce time updates themselves; embedded players
/// have to be polled on a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockKind {
    NativeMedia,
    EmbeddedPlayer,
}

/// Source of the current playback position
pub trait PlaybackClock: Send + Sync {
    /// Current position in seconds.
    ///
    /// Returns `ClockUnavailable` when the surface cannot answer yet (an embed
    /// that is still loading, a media element that was torn down).
    fn current_time(&self) -> CoreResult<TimeSec>;

    fn kind(&self) -> ClockKind;
}

impl<T: PlaybackClock + ?Sized> PlaybackClock for Arc<T> {
    fn current_time(&self) -> CoreResult<TimeSec> {
        (**self).current_time()
    }

    fn kind(&self) -> ClockKind {
        (**self).kind()
    }
}

/// Samples the clock for a "set start/end to now" action.
///
/// The reading is rounded to `decimals` places, matching what the user sees
/// in the edit form. The result goes through the normal insert/update
/// validation like any typed-in value.
pub fn capture_current_time(clock: &dyn PlaybackClock, decimals: u32) -> CoreResult<TimeSec> {
    let now = clock.current_time()?;
    if !is_valid_time_sec(now) {
        return Err(CoreError::ClockUnavailable(format!(
            "clock returned an unusable time: {now}"
        )));
    }
    Ok(round_to_decimals(now, decimals))
}

// =============================================================================
// Manual Clock
// =============================================================================

/// A clock whose position is set explicitly.
///
/// Clones share the same position, so a host can keep one handle to drive
/// the clock and hand another to a poller.
#[derive(Clone, Debug)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
    detached: Arc<AtomicBool>,
    kind: ClockKind,
}

impl ManualClock {
    pub fn new(kind: ClockKind) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(0f64.to_bits())),
            detached: Arc::new(AtomicBool::new(false)),
            kind,
        }
    }

    pub fn set(&self, time: TimeSec) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, delta: TimeSec) {
        let now = f64::from_bits(self.bits.load(Ordering::Acquire));
        self.set(now + delta);
    }

    /// Makes subsequent reads fail until [`ManualClock::attach`] is called
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn attach(&self) {
        self.detached.store(false, Ordering::Release);
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> CoreResult<TimeSec> {
        if self.detached.load(Ordering::Acquire) {
            return Err(CoreError::ClockUnavailable("clock is detached".to_string()));
        }
        Ok(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }

    fn kind(&self) -> ClockKind {
        self.kind
    }
}

// =============================================================================
// Wall Clock
// =============================================================================

/// Plays back against real time from a starting position.
///
/// Used by headless hosts to preview a caption track without a video.
#[derive(Clone, Debug)]
pub struct WallClock {
    started: Instant,
    origin: TimeSec,
    rate: f64,
}

impl WallClock {
    pub fn start_at(origin: TimeSec, rate: f64) -> Self {
        Self {
            started: Instant::now(),
            origin: origin.max(0.0),
            rate: if rate.is_finite() && rate > 0.0 { rate } else { 1.0 },
        }
    }
}

impl PlaybackClock for WallClock {
    fn current_time(&self) -> CoreResult<TimeSec> {
        Ok(self.origin + self.started.elapsed().as_secs_f64() * self.rate)
    }

    fn kind(&self) -> ClockKind {
        ClockKind::EmbeddedPlayer
    }
}
