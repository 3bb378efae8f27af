//! Integration tests for the session workflow.
//!
//! These tests drive the public API end to end:
//! - Capture, persist, restore and compare
//! - Frame sources feeding the monitor loop
//! - Recovery from bad persisted state

use image::{Rgb, RgbImage};
use roi_match::core::decision::Label;
use roi_match::core::frame::Frame;
use roi_match::core::monitor::{Action, Monitor};
use roi_match::core::region::RegionBounds;
use roi_match::core::session::{SessionConfig, SessionState};
use roi_match::core::similarity::compare;
use roi_match::core::source::{open_source, FrameSource};
use roi_match::core::storage::SessionStore;
use roi_match::error::{CompareError, SessionError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Textured test scene; `shift` slides the pattern horizontally
fn scene(width: u32, height: u32, shift: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let stripe = (((x + shift) / 8) % 2) as u8 * 150;
        let ramp = ((y * 255) / height.max(1)) as u8 / 4;
        Rgb([stripe + ramp, stripe / 2 + ramp, 40 + ramp])
    })
}

fn write_frame(dir: &Path, name: &str, image: &RgbImage) {
    image.save(dir.join(name)).unwrap();
}

#[test]
fn capture_persist_restore_compare() {
    let state = TempDir::new().unwrap();
    let store = SessionStore::open(state.path()).unwrap();

    let frame = Frame::new(scene(640, 480, 0));
    let mut session = store.load_session();
    let reference = session.capture(&frame).unwrap();
    assert_eq!(reference.dimensions(), (384, 288));

    store.save_reference(&reference).unwrap();
    store
        .save_config(&SessionConfig {
            region: session.region(),
            threshold: session.threshold(),
        })
        .unwrap();

    // A fresh process sees the same session
    let mut restored = store.load_session();
    assert!(restored.has_reference());
    assert_eq!(restored.region(), session.region());

    let comparison = restored.compare_live(&frame).unwrap();
    assert_eq!(comparison.result.score(), 1.0);
    assert_eq!(comparison.decision.label, Label::Similar);
}

#[test]
fn compare_without_reference_fails_cleanly() {
    let mut session = SessionState::default();
    let frame = Frame::new(scene(100, 100, 0));

    assert_eq!(
        session.compare_live(&frame).unwrap_err(),
        SessionError::NoReference
    );
    assert!(session.last_comparison().is_none());
}

#[test]
fn region_change_requires_recapture() {
    let mut session = SessionState::default();
    let frame = Frame::new(scene(200, 100, 0));
    session.capture(&frame).unwrap();

    session
        .update_region(RegionBounds {
            top: 0.0,
            left: 0.0,
            bottom: 0.5,
            right: 0.5,
        })
        .unwrap();

    let err = session.compare_live(&frame).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Compare(CompareError::DimensionMismatch { .. })
    ));

    session.capture(&frame).unwrap();
    assert_eq!(session.compare_live(&frame).unwrap().result.score(), 1.0);
}

#[test]
fn growing_noise_lowers_the_score() {
    let reference = scene(96, 64, 0);
    let noisy = |amount: u8| {
        RgbImage::from_fn(96, 64, |x, y| {
            let p = reference.get_pixel(x, y);
            // Deterministic pseudo-noise
            let n = ((x * 7 + y * 13) % 5) as u8 * amount;
            Rgb([
                p[0].saturating_add(n),
                p[1].saturating_add(n),
                p[2].saturating_add(n),
            ])
        })
    };

    let slight = compare(&reference, &noisy(2)).unwrap().score();
    let heavy = compare(&reference, &noisy(12)).unwrap().score();

    assert!(slight < 1.0);
    assert!(heavy < slight);
}

#[test]
fn sequence_source_drives_monitor() {
    let frames = TempDir::new().unwrap();
    write_frame(frames.path(), "frame_000.png", &scene(160, 120, 0));
    write_frame(frames.path(), "frame_001.png", &scene(160, 120, 0));
    write_frame(frames.path(), "frame_002.png", &scene(160, 120, 4));

    let state = TempDir::new().unwrap();
    let store = SessionStore::open(state.path()).unwrap();

    let source = open_source(frames.path(), false, false).unwrap();
    let mut monitor = Monitor::new(source, store.load_session())
        .with_store(store.clone())
        .continuous(true);

    let first = monitor.tick([Action::UpdateThreshold(0.9), Action::Capture]);
    let second = monitor.tick([]);
    let third = monitor.tick([]);
    let exhausted = monitor.tick([]);

    assert!(first.captured);
    assert_eq!(second.comparisons[0].decision.label, Label::Similar);
    assert_eq!(third.comparisons[0].decision.label, Label::Dissimilar);
    assert!(exhausted.frame.is_none());

    // Capture and threshold were persisted
    let restored = store.load_session();
    assert!(restored.has_reference());
    assert_eq!(restored.threshold(), 0.9);
}

#[test]
fn corrupt_state_falls_back_to_defaults() {
    let state = TempDir::new().unwrap();
    let store = SessionStore::open(state.path()).unwrap();

    fs::write(store.config_path(), b"{ not json").unwrap();
    fs::write(store.reference_path(), b"not a png").unwrap();

    let session = store.load_session();
    assert_eq!(session.threshold(), SessionConfig::DEFAULT_THRESHOLD);
    assert_eq!(session.region(), SessionConfig::default().region);
    assert!(!session.has_reference());
}

#[test]
fn partial_config_keeps_defaults_for_missing_keys() {
    let state = TempDir::new().unwrap();
    let store = SessionStore::open(state.path()).unwrap();

    fs::write(store.config_path(), br#"{"threshold": 0.7}"#).unwrap();

    let config = store.load_config();
    assert_eq!(config.threshold, 0.7);
    assert_eq!(config.region, SessionConfig::default().region);
}

#[test]
fn still_source_feeds_single_frame() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshot.png");
    scene(80, 60, 0).save(&path).unwrap();

    let mut source = open_source(&path, false, false).unwrap();
    let frame = source.next_frame().unwrap();
    assert_eq!(frame.dimensions(), (80, 60));

    // Unchanged file is not decoded again
    let again = source.next_frame().unwrap();
    assert_eq!(again.sequence(), frame.sequence());
}
