//! Cuekit Core Library
//!
//! Caption timeline engine for attaching timed text to a video and exporting
//! it as a WebVTT track. The host (a UI, or the bundled CLI) owns the media
//! surface; this library owns the caption data and everything derived from it.

pub mod core;

pub use crate::core::{
    captions::{
        format_display_time, format_vtt_timestamp, parse_vtt, parse_vtt_timestamp,
        serialize_vtt, CaptionDraft, CaptionEntry, ParseError, SharedTimeline, TimelineSnapshot,
        TimelineStore,
    },
    playback::{
        active_caption_at, active_caption_text, capture_current_time, ActiveCaption,
        CaptionPoller, ClockKind, LookupStrategy, ManualClock, PlaybackClock, WallClock,
    },
    CaptionId, CoreError, CoreResult, TimeSec,
};
