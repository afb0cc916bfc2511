// EAN-13 / EAN-8 scanline decoder
//
// Pure pixel work: binarize a handful of rows from the scan band,
// run-length encode them, and match the run pattern against the EAN
// structure (guards, L/G/R digit codes, parity-derived leading digit,
// mod-10 checksum). The checksum is the final arbiter, which keeps the
// geometric tolerances loose.

use super::types::{BarcodeFormat, DecodeSource, Decoded, ScanRegion, VideoFrame};
use super::BarcodeDecoder;

/// Run widths of the L-coded digits 0-9, as (space, bar, space, bar)
/// module counts summing to 7. R codes share these widths with bars and
/// spaces swapped; G codes are the reverse.
const L_WIDTHS: [[u8; 4]; 10] = [
    [3, 2, 1, 1], // 0
    [2, 2, 2, 1], // 1
    [2, 1, 2, 2], // 2
    [1, 4, 1, 1], // 3
    [1, 1, 3, 2], // 4
    [1, 2, 3, 1], // 5
    [1, 1, 1, 4], // 6
    [1, 3, 1, 2], // 7
    [1, 2, 1, 3], // 8
    [3, 1, 1, 2], // 9
];

/// Left-half parity pattern encoding the implicit first digit of EAN-13
const FIRST_DIGIT_PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    dark: bool,
    width: u32,
}

/// Default symbology matcher for retail barcodes.
pub struct EanDecoder {
    /// Rows sampled per band; more rows tolerate local glare and smudges
    rows_sampled: u32,
    /// Minimum luma spread below which a row is treated as featureless
    min_contrast: u8,
}

impl Default for EanDecoder {
    fn default() -> Self {
        Self {
            rows_sampled: 3,
            min_contrast: 16,
        }
    }
}

impl BarcodeDecoder for EanDecoder {
    fn decode(
        &self,
        frame: &VideoFrame,
        region: &ScanRegion,
        formats: &[BarcodeFormat],
    ) -> Option<Decoded> {
        if formats.is_empty() {
            return None;
        }
        let x0 = region.x.min(frame.width) as usize;
        let x1 = region.x.saturating_add(region.width).min(frame.width) as usize;
        if x1 <= x0 {
            return None;
        }
        for k in 1..=self.rows_sampled {
            let y = region.y + (region.height * k) / (self.rows_sampled + 1);
            let Some(row) = frame.row(y.min(frame.height.saturating_sub(1))) else {
                continue;
            };
            let Some(bits) = binarize(&row[x0..x1], self.min_contrast) else {
                continue;
            };
            let runs = run_lengths(&bits);
            if let Some(hit) = decode_runs(&runs, formats) {
                return Some(hit);
            }
        }
        None
    }
}

/// Threshold a row at the midpoint of its luma range. A near-uniform row
/// carries no symbol and is skipped outright.
fn binarize(row: &[u8], min_contrast: u8) -> Option<Vec<bool>> {
    let min = *row.iter().min()?;
    let max = *row.iter().max()?;
    if max - min < min_contrast {
        return None;
    }
    let threshold = min + (max - min) / 2;
    Some(row.iter().map(|&px| px < threshold).collect())
}

fn run_lengths(bits: &[bool]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &dark in bits {
        match runs.last_mut() {
            Some(run) if run.dark == dark => run.width += 1,
            _ => runs.push(Run { dark, width: 1 }),
        }
    }
    runs
}

fn decode_runs(runs: &[Run], formats: &[BarcodeFormat]) -> Option<Decoded> {
    for i in 0..runs.len() {
        if !runs[i].dark {
            continue;
        }
        for &format in formats {
            if let Some(text) = try_decode_at(runs, i, format) {
                return Some(Decoded {
                    text,
                    format: Some(format),
                    source: DecodeSource::Camera,
                });
            }
        }
    }
    None
}

/// Attempt one symbology at one start-guard position.
fn try_decode_at(runs: &[Run], start: usize, format: BarcodeFormat) -> Option<String> {
    let half = match format {
        BarcodeFormat::Ean13 => 6,
        BarcodeFormat::Ean8 => 4,
    };
    // guard(3) + left digits + guard(5) + right digits + guard(3)
    let total_runs = 3 + half * 4 + 5 + half * 4 + 3;
    let window = runs.get(start..start + total_runs)?;

    let module =
        (window[0].width + window[1].width + window[2].width) as f32 / 3.0;
    let mid = 3 + half * 4;
    let end = mid + 5 + half * 4;
    if !guard_ok(&window[0..3], module)
        || !guard_ok(&window[mid..mid + 5], module)
        || !guard_ok(&window[end..end + 3], module)
    {
        return None;
    }

    let mut digits: Vec<u8> = Vec::with_capacity(half * 2 + 1);
    let mut parity = String::with_capacity(half);

    // Left half: space,bar,space,bar per digit. Bar-module parity selects
    // the L or G table; EAN-8 left halves are L-coded only.
    for k in 0..half {
        let q = quantize(&window[3 + 4 * k..3 + 4 * k + 4])?;
        if (q[1] + q[3]) % 2 == 1 {
            digits.push(lookup_l(q)?);
            parity.push('L');
        } else {
            if format == BarcodeFormat::Ean8 {
                return None;
            }
            digits.push(lookup_g(q)?);
            parity.push('G');
        }
    }

    if format == BarcodeFormat::Ean13 {
        let first = FIRST_DIGIT_PARITY.iter().position(|p| *p == parity)?;
        digits.insert(0, first as u8);
    }

    // Right half: bar,space,bar,space per digit, R-coded (even bar parity,
    // same widths as L).
    for k in 0..half {
        let q = quantize(&window[mid + 5 + 4 * k..mid + 5 + 4 * k + 4])?;
        if (q[0] + q[2]) % 2 == 1 {
            return None;
        }
        digits.push(lookup_l(q)?);
    }

    if !checksum_ok(&digits) {
        return None;
    }
    Some(digits.iter().map(|&d| char::from(b'0' + d)).collect())
}

/// Guard runs are one module wide each; tolerate moderate skew.
fn guard_ok(runs: &[Run], module: f32) -> bool {
    runs.iter().all(|run| {
        let w = run.width as f32;
        w >= module * 0.5 && w <= module * 1.8
    })
}

/// Map a digit's four run widths to module counts totalling 7.
fn quantize(runs: &[Run]) -> Option<[u8; 4]> {
    let sum: u32 = runs.iter().map(|run| run.width).sum();
    if sum < 7 {
        return None;
    }
    let mut q = [0u8; 4];
    let mut total = 0u32;
    for (slot, run) in q.iter_mut().zip(runs) {
        let v = ((run.width * 7) as f32 / sum as f32).round() as u32;
        let v = v.clamp(1, 4);
        *slot = v as u8;
        total += v;
    }
    if total != 7 {
        return None;
    }
    Some(q)
}

fn lookup_l(q: [u8; 4]) -> Option<u8> {
    L_WIDTHS.iter().position(|w| *w == q).map(|d| d as u8)
}

fn lookup_g(q: [u8; 4]) -> Option<u8> {
    lookup_l([q[3], q[2], q[1], q[0]])
}

/// Standard EAN mod-10 check: weights alternate 1 and 3 from the check
/// digit leftward, and the weighted sum must be divisible by 10.
fn checksum_ok(digits: &[u8]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 1 { 3 * u32::from(d) } else { u32::from(d) })
        .sum();
    sum % 10 == 0
}
