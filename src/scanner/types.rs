// Core scanning data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a scan session
pub type SessionId = Uuid;

/// One camera configuration attempted during negotiation.
///
/// Candidates are tried strictly in priority order: the rear camera gives
/// the most legible barcode frames, unconstrained acquisition is the desktop
/// fallback, and the front camera is the last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraCandidate {
    /// Prefer a rear-facing camera, but accept any
    RearFacing,
    /// Require a rear-facing camera
    RearExact,
    /// No facing constraint at all
    Unconstrained,
    /// Front-facing camera
    FrontFacing,
}

impl CameraCandidate {
    /// Default priority order for candidate negotiation
    pub fn priority_order() -> Vec<CameraCandidate> {
        vec![
            CameraCandidate::RearFacing,
            CameraCandidate::RearExact,
            CameraCandidate::Unconstrained,
            CameraCandidate::FrontFacing,
        ]
    }
}

/// A single grayscale video frame sampled from the live stream
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Luma plane, row-major, one byte per pixel
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl VideoFrame {
    /// Create a frame from a luma plane. The plane length must be
    /// `width * height`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            data,
            width,
            height,
        }
    }

    /// A uniform frame, useful as a placeholder in hosts and tests
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            data: vec![235; (width * height) as usize],
            width,
            height,
        }
    }

    /// One pixel row of the luma plane
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = (y * self.width) as usize;
        self.data.get(start..start + self.width as usize)
    }
}

/// Sub-region of a frame handed to the symbology decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScanRegion {
    /// A thin horizontal band centered in the frame. Restricting decoding to
    /// a band cuts per-frame cost and false positives on cluttered shelves.
    pub fn band(frame_width: u32, frame_height: u32, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.01, 1.0);
        let height = ((frame_height as f32 * fraction) as u32)
            .clamp(1, frame_height.max(1));
        Self {
            x: 0,
            y: (frame_height.saturating_sub(height)) / 2,
            width: frame_width,
            height,
        }
    }
}

/// Focus behavior a video track may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMode {
    Continuous,
    SingleShot,
}

/// Exposure behavior a video track may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposureMode {
    Continuous,
    Manual,
}

/// Capability metadata reported by an open video track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackCapabilities {
    pub focus_modes: Vec<FocusMode>,
    pub exposure_modes: Vec<ExposureMode>,
}

/// A single constraint applied to an open video track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackConstraint {
    Focus(FocusMode),
    Exposure(ExposureMode),
}

/// Retail 1-D symbologies the decoder matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarcodeFormat {
    Ean13,
    Ean8,
}

impl BarcodeFormat {
    /// Number of digits in the symbology, check digit included
    pub fn digits(self) -> usize {
        match self {
            BarcodeFormat::Ean13 => 13,
            BarcodeFormat::Ean8 => 8,
        }
    }
}

/// Where a decoded value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeSource {
    Camera,
    Manual,
}

/// A decoded barcode, produced at most once per session.
///
/// Ownership transfers to the caller that requested the scan; the core does
/// nothing further with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Symbology, when known. Manual entries of non-standard length carry
    /// no format.
    pub format: Option<BarcodeFormat>,
    pub source: DecodeSource,
}

/// Lifecycle state of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No stream, no pending permission request
    Idle,
    /// Capability probe and camera negotiation in flight
    Requesting,
    /// Decode loop active over a live stream
    Scanning,
    /// Typed-entry path active; camera path torn down
    ManualEntry,
    /// Terminal: exactly one decoded result was delivered
    Completed,
    /// Terminal: the session was aborted without a result
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}
