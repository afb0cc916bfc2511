// Camera negotiation
//
// Candidates are tried strictly in priority order, one at a time; the
// platform may reject concurrent acquisition requests, so negotiation is
// never parallel.

use super::error::{CameraFailure, ErrorClass};
use super::types::CameraCandidate;
use super::{CameraBackend, LiveStream};

/// Try candidates in order until one yields a live stream.
///
/// A permission refusal short-circuits: further candidates would be refused
/// identically and only re-prompt the user. Every other failure moves on to
/// the next candidate. When all candidates are exhausted, the most
/// informative captured failure is returned, never a stream.
pub async fn open(
    backend: &dyn CameraBackend,
    candidates: &[CameraCandidate],
) -> Result<Box<dyn LiveStream>, CameraFailure> {
    if candidates.is_empty() {
        return Err(CameraFailure::new(
            ErrorClass::NoCamera,
            "no camera configurations to try",
        ));
    }

    let mut best: Option<CameraFailure> = None;
    for (attempt, &candidate) in candidates.iter().enumerate() {
        log::debug!("camera attempt {}: {candidate:?}", attempt + 1);
        match backend.open(candidate).await {
            Ok(stream) => {
                log::info!("camera opened with candidate {candidate:?}");
                return Ok(stream);
            }
            Err(mut failure) => {
                release_partial(&mut failure).await;
                log::debug!("candidate {candidate:?} failed: {failure}");

                if failure.class == ErrorClass::PermissionDenied {
                    return Err(failure);
                }

                best = Some(match best.take() {
                    Some(prev) if prev.class.specificity() >= failure.class.specificity() => prev,
                    _ => failure,
                });
            }
        }
    }

    Err(best.unwrap_or_else(|| {
        CameraFailure::new(ErrorClass::NoCamera, "no camera could be opened")
    }))
}

/// Release whatever a failed attempt half-acquired, so no stream leaks
/// across retries.
async fn release_partial(failure: &mut CameraFailure) {
    if let Some(mut stream) = failure.partial.take() {
        if let Err(err) = stream.stop().await {
            log::debug!("releasing partial stream failed: {err}");
        }
    }
}
