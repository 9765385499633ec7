//! Media Source Module
//!
//! Classifies the video URL a user loads and builds the embed URL for known
//! hosting platforms. The caption engine only cares about the outcome as a
//! [`ClockKind`]: a direct media file is a native element that reports its own
//! time updates, everything else is an embedded player that must be polled.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::core::{playback::ClockKind, CoreError, CoreResult};

/// Video hosting platform recognized from a URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPlatform {
    /// A media file played by a native element
    Direct,
    YouTube,
    Vimeo,
    Dailymotion,
    Facebook,
    Twitch,
}

impl VideoPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::YouTube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Dailymotion => "dailymotion",
            Self::Facebook => "facebook",
            Self::Twitch => "twitch",
        }
    }

    pub fn clock_kind(&self) -> ClockKind {
        match self {
            Self::Direct => ClockKind::NativeMedia,
            _ => ClockKind::EmbeddedPlayer,
        }
    }
}

impl std::fmt::Display for VideoPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detects the hosting platform from the URL's text (case-insensitive)
pub fn detect_platform(url: &str) -> VideoPlatform {
    let lower = url.to_lowercase();

    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        VideoPlatform::YouTube
    } else if lower.contains("vimeo.com") {
        VideoPlatform::Vimeo
    } else if lower.contains("dailymotion.com") || lower.contains("dai.ly") {
        VideoPlatform::Dailymotion
    } else if lower.contains("facebook.com") && lower.contains("video") {
        VideoPlatform::Facebook
    } else if lower.contains("twitch.tv") {
        VideoPlatform::Twitch
    } else {
        VideoPlatform::Direct
    }
}

// =============================================================================
// Embed URLs
// =============================================================================

static YOUTUBE_ID: OnceLock<Regex> = OnceLock::new();
static VIMEO_ID: OnceLock<Regex> = OnceLock::new();
static DAILYMOTION_ID: OnceLock<Regex> = OnceLock::new();
static DAILYMOTION_SHORT_ID: OnceLock<Regex> = OnceLock::new();
static TWITCH_VIDEO_ID: OnceLock<Regex> = OnceLock::new();
static TWITCH_CHANNEL: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> CoreResult<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern)
        .map_err(|e| CoreError::Internal(format!("invalid URL pattern {pattern}: {e}")))?;
    Ok(cell.get_or_init(|| re))
}

fn capture<'u>(
    cell: &'static OnceLock<Regex>,
    pattern: &str,
    url: &'u str,
    group: usize,
) -> CoreResult<Option<&'u str>> {
    let re = compiled(cell, pattern)?;
    Ok(re
        .captures(url)
        .and_then(|c: Captures<'u>| c.get(group))
        .map(|m| m.as_str()))
}

/// Builds the player embed URL for `url` on `platform`.
///
/// Returns `None` when the platform has no embed (direct media) or the video
/// id cannot be found in the URL. `parent_host` is the page host Twitch
/// requires in its player URL.
pub fn embed_url(
    url: &str,
    platform: VideoPlatform,
    parent_host: &str,
) -> CoreResult<Option<String>> {
    let embed = match platform {
        VideoPlatform::Direct => None,
        VideoPlatform::YouTube => capture(
            &YOUTUBE_ID,
            r"^.*((youtu\.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*",
            url,
            7,
        )?
        .filter(|id| id.len() == 11)
        .map(|id| format!("https://www.youtube.com/embed/{id}?enablejsapi=1")),
        VideoPlatform::Vimeo => capture(&VIMEO_ID, r"vimeo\.com/(?:video/)?(\d+)", url, 1)?
            .map(|id| format!("https://player.vimeo.com/video/{id}")),
        VideoPlatform::Dailymotion => {
            let long = capture(
                &DAILYMOTION_ID,
                r"dailymotion\.com/(?:video/|embed/video/)?([a-zA-Z0-9]+)",
                url,
                1,
            )?;
            let id = match long {
                Some(id) => Some(id),
                None => capture(&DAILYMOTION_SHORT_ID, r"dai\.ly/([a-zA-Z0-9]+)", url, 1)?,
            };
            id.map(|id| format!("https://www.dailymotion.com/embed/video/{id}"))
        }
        VideoPlatform::Facebook => Some(url.to_string()),
        VideoPlatform::Twitch => {
            if url.contains("/videos/") {
                capture(&TWITCH_VIDEO_ID, r"twitch\.tv/videos/(\d+)", url, 1)?.map(|id| {
                    format!("https://player.twitch.tv/?video={id}&parent={parent_host}")
                })
            } else {
                capture(&TWITCH_CHANNEL, r"twitch\.tv/([a-zA-Z0-9_]+)", url, 1)?.map(|channel| {
                    format!("https://player.twitch.tv/?channel={channel}&parent={parent_host}")
                })
            }
        }
    };
    Ok(embed)
}

// =============================================================================
// Video Source
// =============================================================================

/// A loaded video: where it lives and how its playback clock behaves
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    pub url: String,
    pub platform: VideoPlatform,
    /// Player URL for embedded platforms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
}

impl VideoSource {
    /// Classifies `url` and builds its embed URL.
    ///
    /// Fails for an empty URL, or for a recognized platform whose video id
    /// cannot be extracted.
    pub fn resolve(url: &str, parent_host: &str) -> CoreResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CoreError::InvalidSource("video URL is empty".to_string()));
        }

        let platform = detect_platform(url);
        let embed = embed_url(url, platform, parent_host)?;
        if platform != VideoPlatform::Direct && embed.is_none() {
            return Err(CoreError::InvalidSource(format!(
                "unable to parse {platform} URL: {url}"
            )));
        }

        tracing::debug!("Resolved video source {} as {}", url, platform);
        Ok(Self {
            url: url.to_string(),
            platform,
            embed_url: embed,
        })
    }

    pub fn clock_kind(&self) -> ClockKind {
        self.platform.clock_kind()
    }
}
