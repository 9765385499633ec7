//! Subcommand handlers.
//!
//! Every handler writes its report to `out` and leaves logging to `tracing`,
//! so stdout stays clean enough to pipe (`cuekit export s.json > t.vtt`).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use cuekit_lib::core::captions::{
    format_display_time, parse_vtt, serialize_vtt, CaptionDraft, TimelineStore,
};
use cuekit_lib::core::fs::atomic_write_text;
use cuekit_lib::core::media::VideoSource;
use cuekit_lib::core::playback::{CaptionPoller, PlaybackClock, PollMode, WallClock};
use cuekit_lib::core::settings::AppSettings;
use cuekit_lib::{CaptionId, SharedTimeline, TimeSec};

// =============================================================================
// File Helpers
// =============================================================================

fn read_vtt(path: &Path) -> Result<TimelineStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_vtt(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_vtt(path: &Path, store: &TimelineStore) -> Result<()> {
    atomic_write_text(path, &serialize_vtt(&store.list()))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Loads a JSON array of `{ text, startSec, endSec }` drafts
fn read_session(path: &Path) -> Result<TimelineStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session {}", path.display()))?;
    let drafts: Vec<CaptionDraft> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid session file {}", path.display()))?;
    TimelineStore::from_drafts(drafts)
        .with_context(|| format!("Session {} has an invalid caption", path.display()))
}

/// Maps a 1-based cue number to the caption's id
fn cue_id(store: &TimelineStore, cue: usize) -> Result<CaptionId> {
    let list = store.list();
    match cue.checked_sub(1).and_then(|i| list.get(i)) {
        Some(entry) => Ok(entry.id.clone()),
        None => bail!("Cue {} does not exist (track has {} cues)", cue, list.len()),
    }
}

fn cue_number(store: &TimelineStore, id: &str) -> usize {
    store
        .list()
        .iter()
        .position(|e| e.id == id)
        .map_or(0, |i| i + 1)
}

// =============================================================================
// Commands
// =============================================================================

pub fn export(session: &Path, output: Option<&Path>, out: &mut impl Write) -> Result<()> {
    let store = read_session(session)?;
    if store.is_empty() {
        warn!("Timeline is empty, exporting header only");
    }

    let vtt = serialize_vtt(&store.list());
    match output {
        Some(path) => {
            atomic_write_text(path, &vtt)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported {} captions to {}", store.len(), path.display());
        }
        None => out.write_all(vtt.as_bytes())?,
    }
    Ok(())
}

pub fn check(file: &Path, out: &mut impl Write) -> Result<()> {
    let store = read_vtt(file)?;
    writeln!(out, "{}: {} cues OK", file.display(), store.len())?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CueRow {
    cue: usize,
    id: CaptionId,
    start_sec: TimeSec,
    end_sec: TimeSec,
    text: String,
}

pub fn list(file: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let store = read_vtt(file)?;
    let snapshot = store.list();

    if json {
        let rows: Vec<CueRow> = snapshot
            .iter()
            .enumerate()
            .map(|(i, e)| CueRow {
                cue: i + 1,
                id: e.id.clone(),
                start_sec: e.start_sec,
                end_sec: e.end_sec,
                text: e.text.clone(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut *out, &rows)?;
        writeln!(out)?;
        return Ok(());
    }

    for (i, entry) in snapshot.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {} - {}  {}",
            i + 1,
            format_display_time(entry.start_sec),
            format_display_time(entry.end_sec),
            entry.text.replace('\n', " / ")
        )?;
    }
    Ok(())
}

pub fn at(file: &Path, seconds: f64, settings: &AppSettings, out: &mut impl Write) -> Result<()> {
    let store = read_vtt(file)?;
    let snapshot = store.list();
    match settings.playback.lookup().find(&snapshot, seconds)? {
        Some(entry) => writeln!(out, "{}", entry.text)?,
        None => writeln!(out, "(no caption)")?,
    }
    Ok(())
}

pub fn add(file: &Path, text: &str, start: &str, end: &str, out: &mut impl Write) -> Result<()> {
    let mut store = read_vtt(file)?;
    let entry = store.insert(CaptionDraft::from_input(text, start, end)?)?;
    write_vtt(file, &store)?;
    writeln!(out, "Added cue {}", cue_number(&store, &entry.id))?;
    Ok(())
}

/// Replacement values for `edit`; `None` keeps the current value
#[derive(Debug, Default)]
pub struct EditFields {
    pub text: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

pub fn edit(file: &Path, cue: usize, fields: EditFields, out: &mut impl Write) -> Result<()> {
    let mut store = read_vtt(file)?;
    let id = cue_id(&store, cue)?;

    let current = store.begin_edit(&id)?;
    let text = fields.text.unwrap_or(current.text);
    let start = fields.start.unwrap_or_else(|| current.start_sec.to_string());
    let end = fields.end.unwrap_or_else(|| current.end_sec.to_string());

    let entry = store.commit(CaptionDraft::from_input(&text, &start, &end)?)?;
    write_vtt(file, &store)?;
    writeln!(out, "Updated cue {}", cue_number(&store, &entry.id))?;
    Ok(())
}

pub fn delete(file: &Path, cue: usize, out: &mut impl Write) -> Result<()> {
    let mut store = read_vtt(file)?;
    let id = cue_id(&store, cue)?;
    store.delete(&id);
    write_vtt(file, &store)?;
    writeln!(out, "Deleted cue {}", cue)?;
    Ok(())
}

pub async fn play(
    file: &Path,
    from: f64,
    rate: f64,
    duration: Option<f64>,
    settings: &AppSettings,
    out: &mut impl Write,
) -> Result<()> {
    if !from.is_finite() || from < 0.0 {
        bail!("--from must be a non-negative number of seconds");
    }
    if !rate.is_finite() || rate <= 0.0 {
        bail!("--rate must be positive");
    }

    let store = read_vtt(file)?;
    let track_end = store.list().last().map_or(from, |e| e.end_sec);
    let wall_secs = match duration {
        Some(d) if d.is_finite() && d >= 0.0 => d,
        Some(_) => bail!("--duration must be a non-negative number of seconds"),
        None => ((track_end - from) / rate).max(0.0) + 0.1,
    };

    let Ok(run_for) = Duration::try_from_secs_f64(wall_secs) else {
        bail!("Playback would run for {wall_secs}s, which is too long to schedule");
    };

    let clock = WallClock::start_at(from, rate);
    let poller = CaptionPoller::spawn_timer(
        SharedTimeline::new(store),
        Arc::new(clock.clone()),
        settings.playback.poll_interval(),
        settings.playback.lookup(),
    );
    let mut active = poller.subscribe();

    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            changed = active.changed() => {
                if changed.is_err() {
                    break;
                }
                let caption = active.borrow_and_update().clone();
                let now = format_display_time(clock.current_time()?);
                match caption {
                    Some(c) => writeln!(out, "[{now}] {}", c.text.replace('\n', " / "))?,
                    None => writeln!(out, "[{now}] -")?,
                }
                out.flush()?;
            }
        }
    }

    poller.stop().await;
    Ok(())
}

pub fn source(url: &str, settings: &AppSettings, out: &mut impl Write) -> Result<()> {
    let source = VideoSource::resolve(url, &settings.media.embed_parent_host)?;

    writeln!(out, "platform: {}", source.platform)?;
    if let Some(embed) = &source.embed_url {
        writeln!(out, "embed:    {}", embed)?;
    }
    match PollMode::for_clock(source.clock_kind(), &settings.playback) {
        PollMode::Timer(interval) => {
            writeln!(out, "sync:     poll every {}ms", interval.as_millis())?
        }
        PollMode::TimeUpdates => writeln!(out, "sync:     media time updates")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const TRACK: &str = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:03.000\nHello\n\n2\n00:00:03.100 --> 00:00:05.000\nWorld\n\n";

    fn track(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("track.vtt");
        std::fs::write(&path, TRACK).unwrap();
        path
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    #[test]
    fn test_export_session_to_stdout() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("session.json");
        std::fs::write(
            &session,
            r#"[{"text": "World", "startSec": 3.1, "endSec": 5},
                {"text": "Hello", "startSec": 1, "endSec": 3}]"#,
        )
        .unwrap();

        let mut buf = Vec::new();
        export(&session, None, &mut buf).unwrap();
        assert_eq!(output(buf), TRACK);
    }

    #[test]
    fn test_export_rejects_overlapping_session() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("session.json");
        std::fs::write(
            &session,
            r#"[{"text": "Hello", "startSec": 1, "endSec": 3},
                {"text": "World", "startSec": 3, "endSec": 5}]"#,
        )
        .unwrap();

        let out_path = dir.path().join("out.vtt");
        assert!(export(&session, Some(&out_path), &mut Vec::new()).is_err());
        assert!(!out_path.exists());
    }

    #[test]
    fn test_export_empty_session_to_file() {
        let dir = TempDir::new().unwrap();
        let session = dir.path().join("session.json");
        std::fs::write(&session, "[]").unwrap();

        let out_path = dir.path().join("out.vtt");
        export(&session, Some(&out_path), &mut Vec::new()).unwrap();
        assert_eq!(std::fs::read_to_string(out_path).unwrap(), "WEBVTT\n\n");
    }

    // ------------------------------------------------------------------------
    // Read-only commands
    // ------------------------------------------------------------------------

    #[test]
    fn test_check_and_list() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        let mut buf = Vec::new();
        check(&path, &mut buf).unwrap();
        assert!(output(buf).ends_with("2 cues OK\n"));

        let mut buf = Vec::new();
        list(&path, false, &mut buf).unwrap();
        let text = output(buf);
        assert!(text.contains("  1  00:01 - 00:03  Hello"));
        assert!(text.contains("  2  00:03 - 00:05  World"));
    }

    #[test]
    fn test_list_json() {
        let dir = TempDir::new().unwrap();
        let mut buf = Vec::new();
        list(&track(&dir), true, &mut buf).unwrap();

        let rows: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(rows[1]["cue"], 2);
        assert_eq!(rows[1]["startSec"], 3.1);
        assert_eq!(rows[1]["text"], "World");
    }

    #[test]
    fn test_check_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.vtt");
        std::fs::write(&path, "not a caption file").unwrap();

        let err = check(&path, &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("Missing WEBVTT header"));
    }

    #[test]
    fn test_at() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);
        let settings = AppSettings::default();

        let mut buf = Vec::new();
        at(&path, 3.0, &settings, &mut buf).unwrap();
        at(&path, 3.05, &settings, &mut buf).unwrap();
        assert_eq!(output(buf), "Hello\n(no caption)\n");
    }

    // ------------------------------------------------------------------------
    // Mutating commands
    // ------------------------------------------------------------------------

    #[test]
    fn test_add_inserts_in_order() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        let mut buf = Vec::new();
        add(&path, "Intro", "0", "0.5", &mut buf).unwrap();
        assert_eq!(output(buf), "Added cue 1\n");

        let store = read_vtt(&path).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.list()[0].text, "Intro");
    }

    #[test]
    fn test_add_rejects_overlap_and_bad_input() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        assert!(add(&path, "x", "2", "4", &mut Vec::new()).is_err());
        assert!(add(&path, "x", "abc", "9", &mut Vec::new()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TRACK);
    }

    #[test]
    fn test_edit_keeps_unspecified_fields() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        let fields = EditFields {
            text: Some("Hi there".to_string()),
            ..EditFields::default()
        };
        edit(&path, 1, fields, &mut Vec::new()).unwrap();

        let store = read_vtt(&path).unwrap();
        let first = &store.list()[0];
        assert_eq!(first.text, "Hi there");
        assert_eq!((first.start_sec, first.end_sec), (1.0, 3.0));
    }

    #[test]
    fn test_edit_rejected_leaves_file() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        let fields = EditFields {
            end: Some("4".to_string()),
            ..EditFields::default()
        };
        assert!(edit(&path, 1, fields, &mut Vec::new()).is_err());
        assert!(edit(&path, 9, EditFields::default(), &mut Vec::new()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), TRACK);
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        delete(&path, 1, &mut Vec::new()).unwrap();
        let store = read_vtt(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].text, "World");

        assert!(delete(&path, 0, &mut Vec::new()).is_err());
    }

    // ------------------------------------------------------------------------
    // Playback and sources
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_play_prints_active_caption() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);

        let mut buf = Vec::new();
        play(&path, 1.5, 1.0, Some(0.3), &AppSettings::default(), &mut buf)
            .await
            .unwrap();
        assert!(output(buf).lines().any(|l| l.ends_with("] Hello")));
    }

    #[tokio::test]
    async fn test_play_rejects_bad_rate() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);
        assert!(play(&path, 0.0, 0.0, None, &AppSettings::default(), &mut Vec::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_play_rejects_unschedulable_duration() {
        let dir = TempDir::new().unwrap();
        let path = track(&dir);
        let settings = AppSettings::default();

        let err = play(&path, 0.0, 1.0, Some(1e300), &settings, &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too long to schedule"));

        // A tiny rate stretches the track past what a timer can represent
        assert!(play(&path, 0.0, 1e-300, None, &settings, &mut Vec::new())
            .await
            .is_err());
    }

    #[test]
    fn test_source() {
        let settings = AppSettings::default();

        let mut buf = Vec::new();
        source("https://youtu.be/Vgz31QrIWOA", &settings, &mut buf).unwrap();
        let text = output(buf);
        assert!(text.contains("platform: youtube"));
        assert!(text.contains("embed:    https://www.youtube.com/embed/Vgz31QrIWOA?enablejsapi=1"));
        assert!(text.contains("poll every 50ms"));

        let mut buf = Vec::new();
        source("https://cdn.example.com/clip.mp4", &settings, &mut buf).unwrap();
        assert!(output(buf).contains("media time updates"));

        assert!(source("", &settings, &mut Vec::new()).is_err());
    }
}
