//! Cuekit Core Engine
//!
//! Caption store, playback synchronization, WebVTT serialization, media source
//! classification and settings.

pub mod captions;
pub mod fs;
pub mod media;
pub mod playback;
pub mod settings;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_destructive;
