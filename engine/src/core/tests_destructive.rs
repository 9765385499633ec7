//! Destructive and Edge Case Tests for the Caption Core
//!
//! These tests push the timeline store, the WebVTT codec and the lookup past
//! the happy path: boundary-touching intervals, sub-millisecond gaps, hostile
//! documents, concurrent writers and poisoned locks.

use std::sync::Arc;
use std::thread;

use crate::core::captions::{
    format_vtt_timestamp, parse_vtt, parse_vtt_timestamp, serialize_vtt, CaptionDraft,
    ParseError, SharedTimeline, TimelineStore,
};
use crate::core::playback::{active_caption_at, Lookup, LookupStrategy};
use crate::core::CoreError;

fn draft(start: f64, end: f64, text: &str) -> CaptionDraft {
    CaptionDraft::new(start, end, text)
}

fn is_sorted(store: &TimelineStore) -> bool {
    store
        .list()
        .windows(2)
        .all(|w| w[0].start_sec <= w[1].start_sec && w[0].end_sec < w[1].start_sec)
}

// -----------------------------------------------------------------------------
// Store
// -----------------------------------------------------------------------------

#[test]
fn test_destructive_sub_millisecond_gap_is_an_overlap() {
    let mut store = TimelineStore::new();
    store.insert(draft(1.0, 2.0, "a")).unwrap();

    // 2.0004 rounds to the same millisecond as the existing end
    let err = store.insert(draft(2.0004, 3.0, "b")).unwrap_err();
    assert!(matches!(err, CoreError::Overlap { .. }));

    store.insert(draft(2.001, 3.0, "b")).unwrap();
    assert_eq!(store.len(), 2);
}

#[test]
fn test_destructive_zero_length_after_rounding() {
    let mut store = TimelineStore::new();
    let err = store.insert(draft(1.0, 1.0004, "blink")).unwrap_err();
    assert!(matches!(err, CoreError::InvalidTime { .. }));
    assert!(store.is_empty());
}

#[test]
fn test_destructive_non_finite_times() {
    let mut store = TimelineStore::new();
    for (start, end) in [
        (f64::NAN, 1.0),
        (0.0, f64::NAN),
        (0.0, f64::INFINITY),
        (f64::NEG_INFINITY, 1.0),
        (-1.0, 1.0),
    ] {
        let err = store.insert(draft(start, end, "x")).unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidTime { .. }),
            "({start}, {end}) gave {err:?}"
        );
    }
    assert!(store.is_empty());
}

#[test]
fn test_destructive_hostile_text() {
    let mut store = TimelineStore::new();
    assert!(matches!(
        store.insert(draft(0.0, 1.0, " \n\t ")),
        Err(CoreError::EmptyText)
    ));
    assert!(matches!(
        store.insert(draft(0.0, 1.0, "a --> b")),
        Err(CoreError::InvalidText(_))
    ));
    assert!(matches!(
        store.insert(draft(0.0, 1.0, "first\n\nsecond")),
        Err(CoreError::InvalidText(_))
    ));
    assert!(store.is_empty());
}

#[test]
fn test_destructive_failed_update_leaves_store_untouched() {
    let mut store = TimelineStore::new();
    let a = store.insert(draft(0.0, 2.0, "a")).unwrap();
    store.insert(draft(3.0, 5.0, "b")).unwrap();
    let before = store.list();

    assert!(store.update(&a.id, draft(1.0, 4.0, "a")).is_err());
    assert!(store.update(&a.id, draft(1.0, 0.5, "a")).is_err());
    assert!(store.update(&a.id, draft(0.0, 2.0, "")).is_err());

    assert_eq!(store.list().entries(), before.entries());
}

#[test]
fn test_destructive_update_reorders_entry() {
    let mut store = TimelineStore::new();
    let first = store.insert(draft(0.0, 1.0, "first")).unwrap();
    store.insert(draft(2.0, 3.0, "second")).unwrap();

    store.update(&first.id, draft(10.0, 11.0, "moved")).unwrap();

    let list = store.list();
    assert_eq!(list[0].text, "second");
    assert_eq!(list[1].id, first.id);
    assert!(is_sorted(&store));
}

#[test]
fn test_destructive_reverse_insertion_stays_sorted() {
    let mut store = TimelineStore::new();
    for i in (0..200).rev() {
        let start = i as f64 * 2.0;
        store.insert(draft(start, start + 1.0, &format!("cue {i}"))).unwrap();
    }
    assert_eq!(store.len(), 200);
    assert!(is_sorted(&store));
}

#[test]
fn test_destructive_delete_twice_and_unknown() {
    let mut store = TimelineStore::new();
    let a = store.insert(draft(0.0, 1.0, "a")).unwrap();

    assert!(store.delete(&a.id).is_some());
    assert!(store.delete(&a.id).is_none());
    assert!(store.delete("").is_none());
    assert!(matches!(
        store.update(&a.id, draft(0.0, 1.0, "a")),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn test_destructive_commit_after_edited_entry_deleted() {
    let mut store = TimelineStore::new();
    let a = store.insert(draft(0.0, 1.0, "a")).unwrap();

    let form = store.begin_edit(&a.id).unwrap();
    store.delete(&a.id);
    assert!(store.editing().is_none());

    // With the edit gone the form saves as a new caption
    let saved = store.commit(form).unwrap();
    assert_ne!(saved.id, a.id);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_destructive_snapshot_isolated_from_later_edits() {
    let mut store = TimelineStore::new();
    let a = store.insert(draft(0.0, 1.0, "a")).unwrap();
    let snapshot = store.list();

    store.update(&a.id, draft(0.0, 1.0, "changed")).unwrap();
    store.insert(draft(5.0, 6.0, "b")).unwrap();
    store.clear();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].text, "a");
    assert!(store.is_empty());
}

// -----------------------------------------------------------------------------
// Shared timeline
// -----------------------------------------------------------------------------

#[test]
fn test_destructive_concurrent_writers() {
    let shared = SharedTimeline::default();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let start = (worker * 1000 + i * 10) as f64;
                    shared.insert(draft(start, start + 5.0, "x")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = shared.snapshot();
    assert_eq!(snapshot.len(), 400);
    assert!(snapshot
        .windows(2)
        .all(|w| w[0].end_sec < w[1].start_sec));
}

#[test]
fn test_destructive_concurrent_conflicting_inserts() {
    let shared = SharedTimeline::default();

    // Every thread races for the same interval; exactly one may win
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.insert(draft(1.0, 2.0, "race")).is_ok())
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    assert_eq!(shared.snapshot().len(), 1);
}

#[test]
fn test_destructive_poisoned_lock_recovers() {
    let shared = SharedTimeline::default();
    shared.insert(draft(0.0, 1.0, "kept")).unwrap();

    let poisoner = shared.clone();
    let outcome = thread::spawn(move || poisoner.with(|_| panic!("host panicked mid-edit"))).join();
    assert!(outcome.is_err());

    assert_eq!(shared.snapshot()[0].text, "kept");
    shared.insert(draft(2.0, 3.0, "after")).unwrap();
    assert_eq!(shared.snapshot().len(), 2);
}

// -----------------------------------------------------------------------------
// WebVTT
// -----------------------------------------------------------------------------

#[test]
fn test_destructive_header_variants() {
    assert!(parse_vtt("WEBVTT").unwrap().is_empty());
    assert!(parse_vtt("\u{FEFF}WEBVTT\n\n").unwrap().is_empty());
    assert!(parse_vtt("WEBVTT - Episode 1\nKind: captions\n\n").unwrap().is_empty());

    for bad in ["", "WEBVTTX\n\n", "webvtt\n\n", "\nWEBVTT\n\n"] {
        assert!(
            matches!(parse_vtt(bad), Err(CoreError::Parse(ParseError::MissingHeader))),
            "{bad:?}"
        );
    }
}

#[test]
fn test_destructive_overlapping_document_rejected() {
    let doc = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:03.000\nA\n\n2\n00:00:03.000 --> 00:00:04.000\nB\n\n";
    match parse_vtt(doc) {
        Err(CoreError::Parse(ParseError::RejectedCue { cue, source })) => {
            assert_eq!(cue, 2);
            assert!(matches!(*source, CoreError::Overlap { .. }));
        }
        other => panic!("expected rejected cue, got {other:?}"),
    }
}

#[test]
fn test_destructive_malformed_cues() {
    let srt_comma = "WEBVTT\n\n1\n00:00:01,000 --> 00:00:02,000\nA\n";
    assert!(matches!(
        parse_vtt(srt_comma),
        Err(CoreError::Parse(ParseError::InvalidTimestamp { line: 4, .. }))
    ));

    let no_text = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\n\n";
    assert!(matches!(
        parse_vtt(no_text),
        Err(CoreError::Parse(ParseError::MissingText { line: 4 }))
    ));

    let dangling_id = "WEBVTT\n\nintro";
    assert!(matches!(
        parse_vtt(dangling_id),
        Err(CoreError::Parse(ParseError::UnexpectedEnd))
    ));

    let inverted = "WEBVTT\n\n00:00:05.000 --> 00:00:01.000\nA\n";
    assert!(matches!(
        parse_vtt(inverted),
        Err(CoreError::Parse(ParseError::RejectedCue { cue: 1, .. }))
    ));
}

#[test]
fn test_destructive_timestamp_edges() {
    for bad in ["1:00.000", "00:60.000", "00:00:00.00", "00:00:00.0000", "aa:00.000", "-01:00.000", ""] {
        assert_eq!(parse_vtt_timestamp(bad), None, "{bad:?}");
    }

    // Hours widen rather than wrap
    assert_eq!(format_vtt_timestamp(360_000.0), "100:00:00.000");
    assert_eq!(parse_vtt_timestamp("100:00:00.000"), Some(360_000_000));
    assert_eq!(format_vtt_timestamp(59.9996), "00:01:00.000");
}

#[test]
fn test_destructive_unicode_and_multiline_roundtrip() {
    let mut store = TimelineStore::new();
    store.insert(draft(0.5, 1.5, "héllo wörld 字幕")).unwrap();
    store.insert(draft(2.0, 3.25, "line one\nline two")).unwrap();

    let parsed = parse_vtt(&serialize_vtt(&store.list())).unwrap();
    let texts: Vec<_> = parsed.list().iter().map(|e| e.text.clone()).collect();
    assert_eq!(texts, vec!["héllo wörld 字幕", "line one\nline two"]);
}

#[test]
fn test_destructive_crlf_document() {
    let doc = "WEBVTT\r\n\r\n1\r\n00:00:01.000 --> 00:00:02.000\r\nA\r\n\r\n";
    let store = parse_vtt(doc).unwrap();
    assert_eq!(store.list()[0].text, "A");
}

// -----------------------------------------------------------------------------
// Lookup
// -----------------------------------------------------------------------------

#[test]
fn test_destructive_lookup_at_extremes() {
    let mut store = TimelineStore::new();
    store.insert(draft(0.0, 1.0, "a")).unwrap();
    let snapshot = store.list();

    assert!(active_caption_at(&snapshot, f64::INFINITY).unwrap().is_none());
    assert!(active_caption_at(&snapshot, f64::MAX).unwrap().is_none());
    assert!(active_caption_at(&snapshot, -0.0).unwrap().is_some());

    let bisect = Lookup::new(LookupStrategy::Bisect, 1);
    assert!(bisect.find(&[], 1.0).unwrap().is_none());
    assert!(bisect.find(&snapshot, 1.0).unwrap().is_some());
}

#[test]
fn test_destructive_snapshot_shared_across_threads() {
    let mut store = TimelineStore::new();
    store.insert(draft(0.0, 1.0, "a")).unwrap();
    let snapshot = Arc::new(store.list());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let snapshot = Arc::clone(&snapshot);
            thread::spawn(move || active_caption_at(&snapshot, 0.5).unwrap().is_some())
        })
        .collect();
    for reader in readers {
        assert!(reader.join().unwrap());
    }
}
