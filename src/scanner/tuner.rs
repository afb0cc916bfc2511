// Best-effort stream tuning
//
// Continuous autofocus and exposure noticeably improve 1-D decode rates,
// but neither is required; every step here is individually guarded and a
// failure leaves the video perfectly usable.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::types::{ExposureMode, FocusMode, TrackConstraint};
use super::VideoTrack;

/// Schedule tuning of a freshly opened track.
///
/// Waits out a settle delay first so the track has initialized. The guard
/// token belongs to the current stream generation: once the session tears
/// the stream down it cancels the token, and a late-firing tuner becomes a
/// silent no-op instead of poking a released track.
pub fn spawn(
    track: Arc<dyn VideoTrack>,
    settle: Duration,
    guard: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = guard.cancelled() => return,
            _ = tokio::time::sleep(settle) => {}
        }
        if guard.is_cancelled() {
            return;
        }
        apply_best_effort(track.as_ref()).await;
    })
}

/// Apply focus and exposure constraints, each independently guarded.
pub(crate) async fn apply_best_effort(track: &dyn VideoTrack) {
    let caps = match track.capabilities().await {
        Ok(caps) => caps,
        Err(err) => {
            log::debug!("track capability query failed: {err}");
            return;
        }
    };

    let focus = if caps.focus_modes.contains(&FocusMode::Continuous) {
        Some(FocusMode::Continuous)
    } else if caps.focus_modes.contains(&FocusMode::SingleShot) {
        Some(FocusMode::SingleShot)
    } else {
        None
    };
    if let Some(mode) = focus {
        if let Err(err) = track.apply(TrackConstraint::Focus(mode)).await {
            log::debug!("focus constraint rejected: {err}");
        }
    }

    if caps.exposure_modes.contains(&ExposureMode::Continuous) {
        if let Err(err) = track
            .apply(TrackConstraint::Exposure(ExposureMode::Continuous))
            .await
        {
            log::debug!("exposure constraint rejected: {err}");
        }
    }
}
