//! Caption Timeline Module
//!
//! The caption model at the heart of Cuekit:
//! - Caption data models (`CaptionEntry`, `CaptionDraft`)
//! - The validated, non-overlapping timeline store
//! - WebVTT export and import
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption Timeline                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs     - Entry and draft types, interval rules          │
//! │  store.rs      - TimelineStore, snapshots, SharedTimeline       │
//! │  formats.rs    - WebVTT serialize/parse                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use cuekit_lib::core::captions::{serialize_vtt, CaptionDraft, TimelineStore};
//!
//! let mut store = TimelineStore::new();
//! store.insert(CaptionDraft::new(1.0, 3.0, "Hello")).unwrap();
//! assert!(store.insert(CaptionDraft::new(3.0, 5.0, "World")).is_err());
//! store.insert(CaptionDraft::new(3.1, 5.0, "World")).unwrap();
//!
//! let vtt = serialize_vtt(&store.list());
//! assert!(vtt.starts_with("WEBVTT\n\n1\n00:00:01.000 --> 00:00:03.000\nHello\n\n2\n"));
//! ```

mod formats;
mod models;
mod store;

// Re-export models
pub use models::{CaptionDraft, CaptionEntry};

// Re-export store
pub use store::{SharedTimeline, TimelineSnapshot, TimelineStore};

// Re-export format functions
pub use formats::{
    format_display_time, format_vtt_timestamp, parse_vtt, parse_vtt_timestamp, serialize_vtt,
    ParseError, VTT_HEADER,
};
