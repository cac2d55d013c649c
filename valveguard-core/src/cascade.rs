//! Cascading-failure risk detector
//!
//! Watches for the failure mode the per-sensor thresholds cannot see: both
//! quantities jointly trending toward their limits, strongly correlated,
//! while each is still inside its band. It keeps a short rolling window per
//! sensor and, per evaluation cycle, aligns the two series over their
//! overlapping time range and computes:
//!
//! - the Pearson correlation coefficient of the aligned series, and
//! - each series' mean fractional change between consecutive samples.
//!
//! Risk is a conjunctive, all-or-nothing gate: correlation above threshold,
//! both trends rising, and both latest values already past a configured
//! fraction of their max. Any single unmet condition suppresses the alert,
//! bounding false positives at the cost of possible late detection.
//!
//! A correlation that is undefined (zero variance in either series) is
//! non-triggering, not an error. Fewer than the minimum number of aligned
//! pairs is `InsufficientData`, reported as no-risk.

use crate::errors::ControlError;
use crate::store::Snapshot;
use crate::thresholds::ThresholdConfig;
use crate::window::{RollingWindow, Sample};
use log::debug;

/// Samples kept per sensor window
///
/// Generous against the five-pair minimum; at a typical 30 s publish
/// interval this spans more than the default window age.
pub const WINDOW_CAPACITY: usize = 64;

/// Tuning constants for the risk gate
///
/// The numeric values are carried over from the original deployment and
/// are configuration, not re-derived thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeConfig {
    /// Minimum aligned pairs before the detector produces a verdict
    pub min_paired_samples: usize,
    /// Pearson correlation above which the series count as coupled
    pub correlation_threshold: f64,
    /// Mean fractional change above which a series counts as rising
    pub trend_threshold: f64,
    /// Fraction of each max threshold the latest value must exceed
    pub threshold_fraction: f64,
    /// Window age in milliseconds
    pub window_ms: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            min_paired_samples: 5,
            correlation_threshold: 0.7,
            trend_threshold: 0.02,
            threshold_fraction: 0.8,
            window_ms: 30 * 60 * 1000,
        }
    }
}

/// Outcome of one risk assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskAssessment {
    /// No developing joint failure detected
    NoRisk,
    /// All risk gates passed; the caller must force the valve closed
    Risk {
        /// Pearson correlation of the aligned series
        correlation: f64,
        /// Mean fractional change of the temperature series
        temperature_trend: f64,
        /// Mean fractional change of the pressure series
        pressure_trend: f64,
        /// Latest aligned temperature value
        latest_temperature: f64,
        /// Latest aligned pressure value
        latest_pressure: f64,
    },
}

impl RiskAssessment {
    /// True for the `Risk` variant
    pub fn is_risk(&self) -> bool {
        matches!(self, RiskAssessment::Risk { .. })
    }
}

/// Rolling-window cross-sensor risk detector
///
/// Stateless across verdicts except for the windows themselves: `assess`
/// never mutates, so repeated calls against the same windows are idempotent.
#[derive(Debug, Clone)]
pub struct CascadeDetector {
    temperature: RollingWindow<WINDOW_CAPACITY>,
    pressure: RollingWindow<WINDOW_CAPACITY>,
    config: CascadeConfig,
}

impl CascadeDetector {
    /// Create a detector with the given tuning
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            temperature: RollingWindow::new(config.window_ms),
            pressure: RollingWindow::new(config.window_ms),
            config,
        }
    }

    /// Insert the latest snapshot values into the per-sensor windows
    ///
    /// Duplicate inserts from repeated polling (identical timestamp and
    /// value) are ignored by the windows.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        if let Some(reading) = snapshot.temperature {
            self.temperature.push(Sample {
                timestamp: reading.observed_at,
                value: reading.value,
            });
        }
        if let Some(reading) = snapshot.pressure {
            self.pressure.push(Sample {
                timestamp: reading.observed_at,
                value: reading.value,
            });
        }
    }

    /// Assess cascading risk against the configured thresholds
    pub fn assess(&self, thresholds: &ThresholdConfig) -> RiskAssessment {
        let (temp_series, pressure_series) = match self.aligned_series() {
            Ok(series) => series,
            Err(e) => {
                // Cold start or sparse telemetry; not an error condition
                debug!("cascade detector idle: {e}");
                return RiskAssessment::NoRisk;
            }
        };

        let correlation = match pearson(&temp_series, &pressure_series) {
            Some(r) => r,
            None => {
                debug!("cascade correlation undefined (zero variance), not triggering");
                return RiskAssessment::NoRisk;
            }
        };

        let temperature_trend = mean_fractional_change(&temp_series);
        let pressure_trend = mean_fractional_change(&pressure_series);
        let latest_temperature = temp_series[temp_series.len() - 1];
        let latest_pressure = pressure_series[pressure_series.len() - 1];

        let coupled = correlation > self.config.correlation_threshold;
        let both_rising = temperature_trend > self.config.trend_threshold
            && pressure_trend > self.config.trend_threshold;
        let both_near_limit = latest_temperature
            > self.config.threshold_fraction * thresholds.temperature_max
            && latest_pressure > self.config.threshold_fraction * thresholds.pressure_max;

        if coupled && both_rising && both_near_limit {
            RiskAssessment::Risk {
                correlation,
                temperature_trend,
                pressure_trend,
                latest_temperature,
                latest_pressure,
            }
        } else {
            RiskAssessment::NoRisk
        }
    }

    /// Align the two windows over their overlapping time range
    ///
    /// Both series are restricted to the interval covered by both windows,
    /// then paired from the newest end so the series have equal length.
    fn aligned_series(&self) -> Result<(Vec<f64>, Vec<f64>), ControlError> {
        let required = self.config.min_paired_samples;

        let (Some(t_first), Some(t_last), Some(p_first), Some(p_last)) = (
            self.temperature.first(),
            self.temperature.last(),
            self.pressure.first(),
            self.pressure.last(),
        ) else {
            return Err(ControlError::InsufficientData {
                required,
                available: 0,
            });
        };

        let start = t_first.timestamp.max(p_first.timestamp);
        let end = t_last.timestamp.min(p_last.timestamp);

        let in_overlap = |s: &&Sample| s.timestamp >= start && s.timestamp <= end;
        let temp: Vec<f64> = self
            .temperature
            .iter()
            .filter(in_overlap)
            .map(|s| s.value)
            .collect();
        let pressure: Vec<f64> = self
            .pressure
            .iter()
            .filter(in_overlap)
            .map(|s| s.value)
            .collect();

        let pairs = temp.len().min(pressure.len());
        if pairs < required {
            return Err(ControlError::InsufficientData {
                required,
                available: pairs,
            });
        }

        // Keep the newest `pairs` entries of each series
        let temp = temp[temp.len() - pairs..].to_vec();
        let pressure = pressure[pressure.len() - pairs..].to_vec();
        Ok((temp, pressure))
    }
}

/// Pearson correlation coefficient of two equal-length series
///
/// Returns `None` when undefined: either series has zero variance, or the
/// result is not finite.
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}

/// Mean fractional change between consecutive samples
///
/// Terms with a zero denominator (or otherwise non-finite) are skipped
/// rather than poisoning the mean.
fn mean_fractional_change(series: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;

    for pair in series.windows(2) {
        let change = (pair[1] - pair[0]) / pair[0];
        if change.is_finite() {
            sum += change;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
