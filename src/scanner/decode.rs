// Fixed-rate decode loop
//
// Samples the stream at the configured rate and hands each frame's scan
// band to the symbology decoder. The loop returns on the first decoded
// value, so sampling has always stopped before the result is handled
// upstream and a second decode can never fire.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::config::ScannerConfig;
use super::types::{BarcodeFormat, Decoded, ScanRegion};
use super::{BarcodeDecoder, LiveStream};

pub struct DecodeLoop {
    decoder: Arc<dyn BarcodeDecoder>,
    formats: Vec<BarcodeFormat>,
    band_fraction: f32,
    interval: Duration,
}

impl DecodeLoop {
    pub fn new(config: &ScannerConfig, decoder: Arc<dyn BarcodeDecoder>) -> Self {
        Self {
            decoder,
            formats: config.formats.clone(),
            band_fraction: config.band_fraction,
            interval: config.frame_interval(),
        }
    }

    /// Sample frames until one decodes or the stream ends.
    ///
    /// Returns `Some` with the single decoded value, or `None` if the
    /// stream stopped delivering frames. Frames with no symbol are the
    /// steady state and are dropped without comment.
    pub async fn run(&self, stream: &mut dyn LiveStream) -> Option<Decoded> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let frame = stream.grab_frame().await?;
            let region = ScanRegion::band(frame.width, frame.height, self.band_fraction);
            if let Some(hit) = self.decoder.decode(&frame, &region, &self.formats) {
                log::debug!("decoded {:?} symbol: {}", hit.format, hit.text);
                return Some(hit);
            }
        }
    }
}
