mod common;

use common::{FakeAcquisition, FakeDecoder, Harness};
use std::sync::atomic::Ordering;
use tempfile::tempdir;
use video_intro::commands::{recording, VideoIntroState};
use video_intro::{MaxDuration, MediaError, MediaFile, RecorderState, VideoIntroConfig};

const MB: usize = 1024 * 1024;

#[tokio::test]
async fn test_long_upload_rejected_without_artifact() {
    let harness = Harness::with(FakeAcquisition::new(), FakeDecoder::new(90.0), VideoIntroConfig::default());
    let file = MediaFile::from_bytes("long.mp4", "video/mp4", vec![0u8; 40 * MB]);

    let err = harness
        .controller
        .accept_upload(file, MaxDuration::default())
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::DurationExceeded { max: 60, .. }));
    assert_eq!(harness.controller.state(), RecorderState::Idle);
    assert!(harness.controller.artifact().is_none());
    assert!(harness.controller.urls().is_empty());
    assert!(harness.changes.lock().is_empty());
    assert_eq!(harness.decoder.frames.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_valid_upload_produces_artifact() {
    let harness = Harness::with(FakeAcquisition::new(), FakeDecoder::new(30.0), VideoIntroConfig::default());
    let file = MediaFile::from_bytes("intro.webm", "video/webm", vec![7u8; 10 * MB]);

    let artifact = harness
        .controller
        .accept_upload(file, MaxDuration::default())
        .await
        .unwrap();

    assert!((artifact.duration - 30.0).abs() <= 0.5);
    assert_eq!(artifact.file.size, (10 * MB) as u64);

    let thumbnail = harness.controller.urls().resolve(&artifact.thumbnail).unwrap();
    let png = std::fs::read(thumbnail).unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    assert_eq!(harness.controller.state(), RecorderState::Reviewing);
    assert_eq!(harness.changes.lock().len(), 1);
}

#[tokio::test]
async fn test_rejections_leave_state_untouched() {
    let harness = Harness::with(FakeAcquisition::new(), FakeDecoder::new(30.0), VideoIntroConfig::default());
    harness.controller.open_camera().await.unwrap();

    let text = MediaFile::from_bytes("notes.txt", "text/plain", vec![0u8; 10]);
    let err = harness
        .controller
        .accept_upload(text, MaxDuration::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::InvalidMediaType(_)));

    let huge = MediaFile::from_bytes("huge.mov", "video/quicktime", vec![0u8; 51 * MB]);
    let err = harness
        .controller
        .accept_upload(huge, MaxDuration::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::FileTooLarge { .. }));

    assert_eq!(harness.controller.state(), RecorderState::CameraReady);
    assert_eq!(harness.acquisition.live_tracks(), 2);
}

#[tokio::test]
async fn test_upload_replaces_live_camera_and_previous_artifact() {
    let harness = Harness::with(FakeAcquisition::new(), FakeDecoder::new(20.0), VideoIntroConfig::default());
    harness.controller.open_camera().await.unwrap();

    let first = harness
        .controller
        .accept_upload(
            MediaFile::from_bytes("a.webm", "video/webm", vec![1u8; 64]),
            MaxDuration::default(),
        )
        .await
        .unwrap();
    assert_eq!(harness.acquisition.live_tracks(), 0);
    assert_eq!(harness.controller.status().pending_timers, 0);

    let second = harness
        .controller
        .accept_upload(
            MediaFile::from_bytes("b.webm", "video/webm", vec![2u8; 64]),
            MaxDuration::default(),
        )
        .await
        .unwrap();

    assert!(harness.controller.urls().resolve(&first.thumbnail).is_none());
    assert!(harness.controller.urls().resolve(&second.thumbnail).is_some());
    assert_eq!(harness.controller.artifact().unwrap().file.name, "b.webm");
}

#[tokio::test]
async fn test_probe_failure_reported() {
    let decoder = FakeDecoder::new(10.0);
    decoder.fail_probe.store(true, Ordering::SeqCst);
    let harness = Harness::with(FakeAcquisition::new(), decoder, VideoIntroConfig::default());

    let err = harness
        .controller
        .accept_upload(
            MediaFile::from_bytes("broken.webm", "video/webm", vec![0u8; 64]),
            MaxDuration::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::DurationProbe(_)));
    assert_eq!(harness.controller.state(), RecorderState::Idle);
}

#[tokio::test]
async fn test_upload_command_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("intro.webm");
    std::fs::write(&path, vec![3u8; 10 * MB]).unwrap();

    let state = VideoIntroState::new(
        VideoIntroConfig::default(),
        FakeAcquisition::new(),
        FakeDecoder::new(30.0),
    );

    let err = recording::upload_video(&state, path.to_string_lossy().to_string(), 90)
        .await
        .unwrap_err();
    assert_eq!(err.code, "INVALID_CONFIG");

    let artifact = recording::upload_video(&state, path.to_string_lossy().to_string(), 60)
        .await
        .unwrap();
    assert_eq!(artifact.file.mime_type, "video/webm");
    assert_eq!(artifact.file.path(), Some(path.as_path()));

    let url = recording::get_thumbnail_path(&state, artifact.clone()).await.unwrap();
    assert!(url.starts_with("file://"));

    let status = recording::get_recorder_status(&state).await.unwrap();
    assert!(status.status.has_artifact);

    recording::reset_recording(&state).await.unwrap();
    let err = recording::get_thumbnail_path(&state, artifact).await.unwrap_err();
    assert_eq!(err.code, "THUMBNAIL_REVOKED");
}
