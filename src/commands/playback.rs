//! Playback commands

use crate::commands::VideoIntroState;
use crate::playback::{PlaybackState, PlayerView, ProgressBar};
use crate::utils::error::ErrorResponse;
use serde::Serialize;

/// Everything the player UI renders
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub view: PlayerView,
    #[serde(flatten)]
    pub state: PlaybackState,
    pub controls_visible: bool,
    pub time_display: String,
    pub duration_display: String,
}

/// Load the artifact under review into the player
///
/// A load failure is reported through the `Unavailable` view, not as an
/// error.
pub async fn load_artifact(state: &VideoIntroState) -> Result<PlayerSnapshot, ErrorResponse> {
    let artifact = state.controller.artifact();
    let mut transport = state.transport.lock().await;

    match artifact {
        Some(artifact) => {
            if let Err(e) = transport.load(&artifact) {
                tracing::warn!("Showing playback fallback: {}", e);
            }
        }
        None => transport.unload(),
    }
    drop(transport);

    get_player_state(state).await
}

pub async fn get_player_state(state: &VideoIntroState) -> Result<PlayerSnapshot, ErrorResponse> {
    let transport = state.transport.lock().await;
    let playback = transport.state().clone();

    Ok(PlayerSnapshot {
        view: transport.view().clone(),
        controls_visible: transport.controls_visible(),
        time_display: crate::playback::format_timestamp(playback.current_time),
        duration_display: crate::playback::format_timestamp(playback.duration),
        state: playback,
    })
}

/// Returns whether playback is now running
pub async fn toggle_play(state: &VideoIntroState) -> Result<bool, ErrorResponse> {
    state.transport.lock().await.toggle_play().map_err(ErrorResponse::from)
}

/// Seek to a click at `x` on the progress bar
pub async fn seek_by_click(state: &VideoIntroState, x: f64, bar: ProgressBar) -> Result<f64, ErrorResponse> {
    Ok(state.transport.lock().await.seek_by_click(x, bar))
}

pub async fn seek_to(state: &VideoIntroState, secs: f64) -> Result<f64, ErrorResponse> {
    Ok(state.transport.lock().await.seek_to(secs))
}

/// Skip forward or backward by the configured step
pub async fn skip(state: &VideoIntroState, forward: bool) -> Result<f64, ErrorResponse> {
    let mut transport = state.transport.lock().await;
    Ok(if forward {
        transport.skip_forward()
    } else {
        transport.skip_backward()
    })
}

pub async fn set_volume(state: &VideoIntroState, volume: f32) -> Result<f32, ErrorResponse> {
    Ok(state.transport.lock().await.set_volume(volume))
}

/// Returns whether the player is now muted
pub async fn toggle_mute(state: &VideoIntroState) -> Result<bool, ErrorResponse> {
    Ok(state.transport.lock().await.toggle_mute())
}

pub async fn set_playback_rate(state: &VideoIntroState, rate: f32) -> Result<(), ErrorResponse> {
    state.transport.lock().await.set_rate(rate).map_err(ErrorResponse::from)
}

pub async fn toggle_fullscreen(state: &VideoIntroState) -> Result<bool, ErrorResponse> {
    state
        .transport
        .lock()
        .await
        .toggle_fullscreen()
        .map_err(ErrorResponse::from)
}

pub async fn pointer_moved(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.transport.lock().await.pointer_moved();
    Ok(())
}

/// Position update reported by the rendering surface
pub async fn time_update(state: &VideoIntroState, secs: f64) -> Result<(), ErrorResponse> {
    state.transport.lock().await.sync_time(secs);
    Ok(())
}

pub async fn playback_ended(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.transport.lock().await.on_ended();
    Ok(())
}
