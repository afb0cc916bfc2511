//! Barcode capture core for the relevador field price-collection app.
//!
//! Sessions negotiate camera access across fallback constraint sets,
//! classify failures so the UI can offer retry or typed entry, tune the
//! stream for close-range scanning, and decode EAN-13/EAN-8 symbols from a
//! horizontal band of each sampled frame. Platform camera access and the
//! host UI plug in behind traits; everything in between is owned here.

pub mod scanner;

pub use scanner::*;
