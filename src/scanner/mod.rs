// Barcode scan session core
//
// This module is the scanning subsystem of a field price-collection tool:
// a capability prober, a camera negotiator with classified failures, a
// best-effort stream tuner, a fixed-rate decode loop over EAN symbologies,
// a typed-entry fallback, and the session state machine gluing them
// together. Camera hardware and the host UI sit behind traits; the core
// owns the lifecycle, not the devices.

pub mod capability;
pub mod config;
pub mod decode;
pub mod ean;
pub mod error;
pub mod manual;
pub mod negotiate;
pub mod session;
pub mod tuner;
pub mod types;

pub use capability::{probe, Capability, HostEnvironment};
pub use config::{ScannerConfig, SessionContext};
pub use decode::DecodeLoop;
pub use ean::EanDecoder;
pub use error::{permission_guidance, CameraFailure, ErrorClass, ScanError, ScanResult};
pub use session::{ScanController, ScanEvent, ScanEventHandler, ScanHandle};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Platform camera access, one attempt per candidate constraint.
///
/// An implementation suspends until the platform grants or denies access.
/// On failure it returns a classified [`CameraFailure`]; anything it
/// half-acquired before failing travels back in `partial` so the
/// negotiator can release it.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn open(&self, candidate: CameraCandidate)
        -> Result<Box<dyn LiveStream>, CameraFailure>;
}

/// An open handle to camera video frames, exclusively owned by one session.
#[async_trait]
pub trait LiveStream: Send + Sync {
    /// The most recent frame, or `None` once the stream has ended.
    async fn grab_frame(&mut self) -> Option<VideoFrame>;

    /// The active video track, for best-effort constraint tuning.
    fn track(&self) -> Arc<dyn VideoTrack>;

    /// Stop frame delivery and release the camera handle. Idempotent;
    /// callers swallow errors since teardown is best-effort cleanup.
    async fn stop(&mut self) -> ScanResult<()>;
}

/// Constraint surface of an open video track
#[async_trait]
pub trait VideoTrack: Send + Sync {
    async fn capabilities(&self) -> ScanResult<TrackCapabilities>;
    async fn apply(&self, constraint: TrackConstraint) -> ScanResult<()>;
}

/// Symbology matcher invoked by the decode loop on each sampled frame.
///
/// Returns `None` when no symbol is found; that is the expected steady
/// state, not an error.
pub trait BarcodeDecoder: Send + Sync {
    fn decode(
        &self,
        frame: &VideoFrame,
        region: &ScanRegion,
        formats: &[BarcodeFormat],
    ) -> Option<Decoded>;
}
