//! WebVTT Export and Import
//!
//! Serializes a timeline snapshot into a WebVTT document and parses one back
//! into a validated store.
//!
//! # Document Layout
//!
//! ```text
//! WEBVTT
//!
//! 1
//! 00:00:01.000 --> 00:00:03.000
//! Hello
//!
//! 2
//! 00:00:03.100 --> 00:00:05.000
//! World
//!
//! ```

use super::{CaptionDraft, TimelineSnapshot, TimelineStore};
use crate::core::{from_millis, to_millis, CoreError, CoreResult, Millis, TimeSec};

/// Literal first-line token of every WebVTT document
pub const VTT_HEADER: &str = "WEBVTT";

const TIMING_ARROW: &str = "-->";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing a WebVTT document.
///
/// Line numbers are 1-based.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing WEBVTT header")]
    MissingHeader,

    #[error("Invalid timestamp on line {line}: {value}")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Invalid format on line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Cue on line {line} has no text")]
    MissingText { line: usize },

    #[error("Unexpected end of input")]
    UnexpectedEnd,

    #[error("Cue {cue} rejected: {source}")]
    RejectedCue {
        cue: usize,
        #[source]
        source: Box<CoreError>,
    },
}

// =============================================================================
// Export
// =============================================================================

/// Serializes the timeline into a WebVTT document.
///
/// Cues are numbered from 1 in ascending start order and every cue block,
/// including the last, ends with a blank line. An empty timeline yields the
/// header alone.
pub fn serialize_vtt(snapshot: &TimelineSnapshot) -> String {
    let mut output = format!("{VTT_HEADER}\n\n");

    for (index, caption) in snapshot.iter().enumerate() {
        output.push_str(&format!("{}\n", index + 1));

        let start = format_vtt_timestamp(caption.start_sec);
        let end = format_vtt_timestamp(caption.end_sec);
        output.push_str(&format!("{start} {TIMING_ARROW} {end}\n"));

        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

/// Formats seconds as a WebVTT timestamp (`HH:MM:SS.mmm`).
///
/// Milliseconds are rounded half away from zero. Hours widen past two digits
/// instead of wrapping.
pub fn format_vtt_timestamp(seconds: TimeSec) -> String {
    let total_ms = to_millis(seconds).max(0);
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}

/// Formats seconds for list display (`MM:SS`, floored)
pub fn format_display_time(seconds: TimeSec) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}

// =============================================================================
// Import
// =============================================================================

/// Parses a WebVTT document into a timeline store.
///
/// Every cue is inserted through [`TimelineStore::insert`], so a document that
/// breaks the overlap or ordering rules is rejected the same way an
/// interactive edit would be.
pub fn parse_vtt(content: &str) -> CoreResult<TimelineStore> {
    let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l)).peekable();

    let header = lines.next().map(|(_, l)| l).ok_or(ParseError::MissingHeader)?;
    if !is_header_line(header) {
        return Err(ParseError::MissingHeader.into());
    }

    // Header metadata runs until the first blank line
    while lines.peek().is_some_and(|(_, l)| !l.trim().is_empty()) {
        lines.next();
    }

    let mut store = TimelineStore::new();
    let mut cue = 0;

    loop {
        while lines.peek().is_some_and(|(_, l)| l.trim().is_empty()) {
            lines.next();
        }
        let Some((first_no, first_line)) = lines.next() else {
            break;
        };

        // The identifier line is optional
        let (timing_no, timing_line) = if first_line.contains(TIMING_ARROW) {
            (first_no, first_line)
        } else {
            match lines.next() {
                Some((no, line)) if line.contains(TIMING_ARROW) => (no, line),
                Some((no, _)) => {
                    return Err(ParseError::InvalidFormat {
                        line: no,
                        message: format!("expected a timing line after cue identifier '{first_line}'"),
                    }
                    .into())
                }
                None => return Err(ParseError::UnexpectedEnd.into()),
            }
        };
        let (start_ms, end_ms) = parse_timing_line(timing_line, timing_no)?;

        let mut text_lines = Vec::new();
        while let Some((_, line)) = lines.peek() {
            if line.trim().is_empty() {
                break;
            }
            text_lines.push(*line);
            lines.next();
        }
        if text_lines.is_empty() {
            return Err(ParseError::MissingText { line: timing_no }.into());
        }

        cue += 1;
        let draft = CaptionDraft::new(
            from_millis(start_ms),
            from_millis(end_ms),
            text_lines.join("\n"),
        );
        store.insert(draft).map_err(|e| {
            tracing::warn!("Rejected cue {} on line {}: {}", cue, timing_no, e);
            ParseError::RejectedCue {
                cue,
                source: Box::new(e),
            }
        })?;
    }

    Ok(store)
}

fn is_header_line(line: &str) -> bool {
    match line.strip_prefix(VTT_HEADER) {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

/// Parses `start --> end [settings]` into millisecond bounds
fn parse_timing_line(line: &str, line_no: usize) -> Result<(Millis, Millis), ParseError> {
    let Some((start, rest)) = line.split_once(TIMING_ARROW) else {
        return Err(ParseError::InvalidFormat {
            line: line_no,
            message: format!("expected 'start --> end': {line}"),
        });
    };

    // Cue settings may follow the end timestamp
    let end = rest.split_whitespace().next().unwrap_or_default();

    let parse = |ts: &str| {
        parse_vtt_timestamp(ts.trim()).ok_or_else(|| ParseError::InvalidTimestamp {
            line: line_no,
            value: ts.trim().to_string(),
        })
    };

    Ok((parse(start)?, parse(end)?))
}

/// Parses a WebVTT timestamp (`HH:MM:SS.mmm` or `MM:SS.mmm`) into milliseconds
pub fn parse_vtt_timestamp(ts: &str) -> Option<Millis> {
    let (clock, frac) = ts.split_once('.')?;
    if frac.len() != 3 {
        return None;
    }
    let ms = parse_digits(frac)?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0, parse_two_digits(m)?, parse_two_digits(s)?),
        [h, m, s] if h.len() >= 2 => (parse_digits(h)?, parse_two_digits(m)?, parse_two_digits(s)?),
        _ => return None,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    // Absurd hour fields overflow instead of wrapping into a bogus bound
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(ms)
}

fn parse_two_digits(s: &str) -> Option<Millis> {
    if s.len() != 2 {
        return None;
    }
    parse_digits(s)
}

fn parse_digits(s: &str) -> Option<Millis> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// =============================================================================
// Tests
// =============================================================================
