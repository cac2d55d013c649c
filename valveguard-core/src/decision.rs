//! Threshold decision engine
//!
//! Pure mapping from the latest snapshot to an actuation verdict. The
//! open/close asymmetry is an intentional safety bias and must not be
//! "fixed":
//!
//! - OPEN uses OR semantics: one sensor over its max is enough to relieve
//!   pressure.
//! - CLOSE uses AND semantics: containment requires both sensors to agree
//!   they are below their min.
//! - Between the two lies the dead-band, where the valve holds its position
//!   so noisy readings near a single threshold cannot make it chatter.
//!
//! An unobserved sensor contributes to neither verdict: it cannot force an
//! open, and it cannot corroborate a close.

use crate::store::Snapshot;
use crate::thresholds::ThresholdConfig;
use serde::Serialize;

/// Actuation verdict for one evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Open the relief valve
    Open,
    /// Close the valve
    Close,
    /// Hold the current position (dead-band)
    NoAction,
}

/// Map the latest readings to a verdict
pub fn decide(snapshot: &Snapshot, thresholds: &ThresholdConfig) -> Verdict {
    let pressure = snapshot.pressure.map(|r| r.value);
    let temperature = snapshot.temperature.map(|r| r.value);

    let pressure_high = pressure.is_some_and(|p| p > thresholds.pressure_max);
    let temperature_high = temperature.is_some_and(|t| t > thresholds.temperature_max);

    if pressure_high || temperature_high {
        return Verdict::Open;
    }

    let pressure_low = pressure.is_some_and(|p| p < thresholds.pressure_min);
    let temperature_low = temperature.is_some_and(|t| t < thresholds.temperature_min);

    // Closing needs corroboration from both signals, which an unobserved
    // sensor cannot give.
    if pressure_low && temperature_low {
        return Verdict::Close;
    }

    Verdict::NoAction
}
