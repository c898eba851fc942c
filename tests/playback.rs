mod common;

use common::{FakeAcquisition, FakeDecoder};
use std::time::Duration;
use video_intro::commands::{effects, playback, VideoIntroState};
use video_intro::playback::{PlayerView, ProgressBar};
use video_intro::{MaxDuration, MediaFile, VideoIntroConfig};

async fn reviewing_state(duration: f64) -> VideoIntroState {
    let state = VideoIntroState::new(
        VideoIntroConfig::default(),
        FakeAcquisition::new(),
        FakeDecoder::new(duration),
    );
    state
        .controller
        .accept_upload(
            MediaFile::from_bytes("intro.webm", "video/webm", vec![5u8; 1024]),
            MaxDuration::default(),
        )
        .await
        .unwrap();
    state
}

#[tokio::test(start_paused = true)]
async fn test_click_at_half_seeks_to_middle() {
    let state = reviewing_state(37.0).await;
    let snapshot = playback::load_artifact(&state).await.unwrap();
    assert_eq!(snapshot.view, PlayerView::Ready);
    assert_eq!(snapshot.duration_display, "0:37");

    let bar = ProgressBar { left: 24.0, width: 640.0 };
    let time = playback::seek_by_click(&state, 24.0 + 320.0, bar).await.unwrap();
    let frame = 1.0 / 30.0;
    assert!((time - 18.5).abs() <= frame);

    let snapshot = playback::get_player_state(&state).await.unwrap();
    assert!((snapshot.state.current_time - 18.5).abs() <= frame);
    assert_eq!(snapshot.time_display, "0:18");
}

#[tokio::test(start_paused = true)]
async fn test_mute_round_trip_restores_volume() {
    let state = reviewing_state(20.0).await;
    playback::load_artifact(&state).await.unwrap();

    playback::set_volume(&state, 0.42).await.unwrap();
    assert!(playback::toggle_mute(&state).await.unwrap());
    let muted = playback::get_player_state(&state).await.unwrap();
    assert_eq!(muted.state.effective_volume(), 0.0);

    assert!(!playback::toggle_mute(&state).await.unwrap());
    let restored = playback::get_player_state(&state).await.unwrap();
    assert_eq!(restored.state.volume, 0.42);
    assert_eq!(restored.state.effective_volume(), 0.42);
}

#[tokio::test(start_paused = true)]
async fn test_transport_controls() {
    let state = reviewing_state(45.0).await;
    playback::load_artifact(&state).await.unwrap();

    assert!(playback::toggle_play(&state).await.unwrap());
    playback::time_update(&state, 12.0).await.unwrap();
    playback::set_playback_rate(&state, 1.25).await.unwrap();

    let snapshot = playback::get_player_state(&state).await.unwrap();
    assert_eq!(snapshot.state.rate, 1.25);
    assert_eq!(snapshot.state.current_time, 12.0);

    let err = playback::set_playback_rate(&state, 4.0).await.unwrap_err();
    assert_eq!(err.code, "UNSUPPORTED_RATE");

    assert_eq!(playback::skip(&state, true).await.unwrap(), 22.0);
    assert_eq!(playback::skip(&state, false).await.unwrap(), 12.0);
    assert_eq!(playback::seek_to(&state, 500.0).await.unwrap(), 45.0);

    assert!(playback::toggle_fullscreen(&state).await.unwrap());
    assert!(!playback::toggle_fullscreen(&state).await.unwrap());

    // Controls hide while playing and come back on pointer movement
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!playback::get_player_state(&state).await.unwrap().controls_visible);
    playback::pointer_moved(&state).await.unwrap();
    assert!(playback::get_player_state(&state).await.unwrap().controls_visible);

    // and never hide while paused
    assert!(!playback::toggle_play(&state).await.unwrap());
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(playback::get_player_state(&state).await.unwrap().controls_visible);

    playback::playback_ended(&state).await.unwrap();
    let snapshot = playback::get_player_state(&state).await.unwrap();
    assert!(!snapshot.state.playing);
    assert_eq!(snapshot.state.current_time, 45.0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_source_shows_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.webm");
    std::fs::write(&path, vec![1u8; 256]).unwrap();

    let state = VideoIntroState::new(
        VideoIntroConfig::default(),
        FakeAcquisition::new(),
        FakeDecoder::new(10.0),
    );
    state
        .controller
        .accept_upload(MediaFile::from_path(&path).unwrap(), MaxDuration::default())
        .await
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    let snapshot = playback::load_artifact(&state).await.unwrap();
    assert!(matches!(snapshot.view, PlayerView::Unavailable { .. }));
    assert_eq!(playback::toggle_play(&state).await.unwrap_err().code, "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_preview_css_for_backgrounds() {
    let state = VideoIntroState::new(
        VideoIntroConfig::default(),
        FakeAcquisition::new(),
        FakeDecoder::new(10.0),
    );
    state.controller.open_camera().await.unwrap();

    effects::set_background(&state, "virtual-gradient".to_string()).await.unwrap();
    let css = effects::get_preview_css(&state).await.unwrap();
    assert_eq!(css.overlays.len(), 1);
    assert!(css.filter.contains("brightness"));
    assert!(css.overlays[0].background.starts_with("linear-gradient("));

    effects::set_background(&state, "none".to_string()).await.unwrap();
    let css = effects::get_preview_css(&state).await.unwrap();
    assert!(css.overlays.is_empty());
    assert_eq!(css.filter, "none");

    let err = effects::set_background(&state, "beach".to_string()).await.unwrap_err();
    assert_eq!(err.code, "UNKNOWN_BACKGROUND");
}
