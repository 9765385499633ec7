//! Playback Module
//!
//! Connects the caption timeline to a playing video:
//! - `clock.rs`  - the host-provided playback position
//! - `sync.rs`   - stateless active-caption lookup
//! - `poller.rs` - cancellable task publishing the active caption

mod clock;
mod poller;
mod sync;

pub use clock::{capture_current_time, ClockKind, ManualClock, PlaybackClock, WallClock};
pub use poller::{CaptionPoller, PollMode};
pub use sync::{
    active_caption_at, active_caption_text, ActiveCaption, Lookup, LookupStrategy,
    DEFAULT_SCAN_THRESHOLD,
};
