// Host capability probing
//
// All platform feature detection lives here so negotiation and session
// logic stay unaware of it. The probe is pure and idempotent; it can be
// re-run on every request attempt.

use serde::{Deserialize, Serialize};

use super::error::ErrorClass;

/// Fixed user-facing reason when the runtime lacks a capture API
pub const REASON_NO_MEDIA_API: &str =
    "this runtime does not expose a camera capture API; use a modern browser";

/// Fixed user-facing reason when the context is not secure
pub const REASON_INSECURE_CONTEXT: &str =
    "camera access requires a secure connection (HTTPS) or a local address";

/// Snapshot of the host runtime, captured once by the embedding UI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostEnvironment {
    /// Whether a media capture API is exposed at all
    pub media_api: bool,
    /// URL scheme the app was served over ("https", "http", ...)
    pub scheme: String,
    /// Hostname the app was served from
    pub hostname: String,
    /// User agent string, used only to pick permission guidance text
    #[serde(default)]
    pub user_agent: String,
}

impl HostEnvironment {
    /// Secure enough for camera access: encrypted transport, loopback, or
    /// the private ranges field devices are deployed on.
    pub fn secure_context(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
            || self.hostname == "localhost"
            || self.hostname == "127.0.0.1"
            || self.hostname.starts_with("192.168.")
            || self.hostname.starts_with("10.0.")
    }
}

/// Probe outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Capable,
    Incapable {
        class: ErrorClass,
        reason: &'static str,
    },
}

/// Check whether camera negotiation is worth attempting at all.
pub fn probe(env: &HostEnvironment) -> Capability {
    if !env.media_api {
        return Capability::Incapable {
            class: ErrorClass::Unsupported,
            reason: REASON_NO_MEDIA_API,
        };
    }
    if !env.secure_context() {
        return Capability::Incapable {
            class: ErrorClass::InsecureContext,
            reason: REASON_INSECURE_CONTEXT,
        };
    }
    Capability::Capable
}
