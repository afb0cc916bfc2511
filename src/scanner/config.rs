// Scanner configuration
//
// Settings persist as a TOML file with per-field defaults, so a partially
// written file still yields a usable configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::{ScanError, ScanResult};
use super::types::{BarcodeFormat, CameraCandidate};

/// Scanner tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Frame sampling rate of the decode loop
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Height of the decoded horizontal band, as a fraction of frame height
    #[serde(default = "default_band_fraction")]
    pub band_fraction: f32,
    /// Delay before best-effort track tuning, to let the track initialize
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Symbologies the decode loop matches against
    #[serde(default = "default_formats")]
    pub formats: Vec<BarcodeFormat>,
    /// Camera candidates, tried strictly in this order
    #[serde(default = "CameraCandidate::priority_order")]
    pub candidates: Vec<CameraCandidate>,
}

fn default_fps() -> u32 {
    10
}

fn default_band_fraction() -> f32 {
    0.25
}

fn default_settle_delay_ms() -> u64 {
    400
}

fn default_formats() -> Vec<BarcodeFormat> {
    vec![BarcodeFormat::Ean13, BarcodeFormat::Ean8]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            band_fraction: default_band_fraction(),
            settle_delay_ms: default_settle_delay_ms(),
            formats: default_formats(),
            candidates: CameraCandidate::priority_order(),
        }
    }
}

impl ScannerConfig {
    /// Interval between decode-loop frame samples
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1_000 / u64::from(self.fps.max(1)))
    }

    /// Settle delay before track tuning
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate field ranges
    pub fn validate(&self) -> ScanResult<()> {
        if !(1..=60).contains(&self.fps) {
            return Err(ScanError::configuration(format!(
                "fps must be between 1 and 60, got {}",
                self.fps
            )));
        }
        if !(self.band_fraction > 0.0 && self.band_fraction <= 1.0) {
            return Err(ScanError::configuration(format!(
                "band_fraction must be in (0, 1], got {}",
                self.band_fraction
            )));
        }
        if self.settle_delay_ms > 10_000 {
            return Err(ScanError::configuration(format!(
                "settle_delay_ms must be at most 10000, got {}",
                self.settle_delay_ms
            )));
        }
        if self.formats.is_empty() {
            return Err(ScanError::configuration("formats must not be empty"));
        }
        if self.candidates.is_empty() {
            return Err(ScanError::configuration("candidates must not be empty"));
        }
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ScanResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ScanError::configuration(format!("invalid scanner config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration file
    pub fn save(&self, path: &Path) -> ScanResult<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ScanError::configuration(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Read-only context a session is constructed with.
///
/// The previously selected supermarket and survey date are displayed while
/// scanning but never consulted by the scanning logic itself; they are
/// passed in explicitly rather than read from ambient settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    pub supermarket: Option<String>,
    pub survey_date: Option<NaiveDate>,
}

impl SessionContext {
    /// Short label shown alongside the scanning UI, if any context was given
    pub fn display_hint(&self) -> Option<String> {
        match (&self.supermarket, &self.survey_date) {
            (None, None) => None,
            (Some(market), None) => Some(market.clone()),
            (None, Some(date)) => Some(date.format("%Y-%m-%d").to_string()),
            (Some(market), Some(date)) => {
                Some(format!("{market}, {}", date.format("%Y-%m-%d")))
            }
        }
    }
}
