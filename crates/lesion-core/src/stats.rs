//! Statistics computed from linear traces of embryos.

use serde::{Deserialize, Serialize};

/// Samples below this fraction of the trace maximum count as missing
/// fluorescence.
pub const MISSING_FRACTION: f64 = 0.1;

/// Truncation radius of the Gaussian kernel, in standard deviations.
const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Identifier for each trace statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    MinMax,
    Slope,
    Missing,
}

impl StatKind {
    /// Every statistic, in table column order.
    pub fn all() -> [StatKind; 3] {
        [StatKind::MinMax, StatKind::Slope, StatKind::Missing]
    }

    /// Column name used in statistics tables.
    pub fn name(&self) -> &'static str {
        match self {
            StatKind::MinMax => "min_max",
            StatKind::Slope => "slope",
            StatKind::Missing => "missing",
        }
    }

    /// Evaluate this statistic on a trace.
    pub fn compute(&self, tr: &[f64], slope_sigma: Option<f64>) -> f64 {
        match self {
            StatKind::MinMax => min_max(tr),
            StatKind::Slope => slope(tr, slope_sigma),
            StatKind::Missing => missing_fluorescence(tr),
        }
    }
}

/// Ratio of the minimum value of a trace over its maximum.
///
/// Returns NaN for an empty trace or one with no signal at all.
pub fn min_max(tr: &[f64]) -> f64 {
    if tr.is_empty() {
        return f64::NAN;
    }
    let max = tr.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return f64::NAN;
    }
    let min = tr.iter().copied().fold(f64::INFINITY, f64::min);
    min / max
}

/// Absolute slope between the positions of the trace minimum and maximum.
///
/// With `sigma` set, the trace is Gaussian-smoothed first. Ties resolve to
/// the first occurrence. Returns NaN when minimum and maximum coincide.
pub fn slope(tr: &[f64], sigma: Option<f64>) -> f64 {
    if tr.len() < 2 {
        return f64::NAN;
    }
    let smoothed;
    let tr = match sigma {
        Some(sigma) => {
            smoothed = gaussian_filter1d(tr, sigma);
            smoothed.as_slice()
        }
        None => tr,
    };
    let m = argmin(tr);
    let big_m = argmax(tr);
    if m == big_m {
        return f64::NAN;
    }
    ((tr[m] - tr[big_m]) / (m as f64 - big_m as f64)).abs()
}

/// Fraction of trace samples below [`MISSING_FRACTION`] of the trace
/// maximum.
///
/// Returns NaN for an empty trace; a trace with no signal at all is fully
/// missing.
pub fn missing_fluorescence(tr: &[f64]) -> f64 {
    if tr.is_empty() {
        return f64::NAN;
    }
    let max = tr.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 {
        return 1.0;
    }
    let cutoff = max * MISSING_FRACTION;
    let below = tr.iter().filter(|&&v| v < cutoff).count();
    below as f64 / tr.len() as f64
}

/// Smooth a signal with a Gaussian kernel truncated at 4 sigma, using
/// reflected boundaries: (d c b a | a b c d | d c b a).
pub fn gaussian_filter1d(data: &[f64], sigma: f64) -> Vec<f64> {
    if data.is_empty() || sigma <= 0.0 {
        return data.to_vec();
    }

    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let radius = radius.max(1);

    let mut kernel = Vec::with_capacity(2 * radius as usize + 1);
    for i in -radius..=radius {
        let x = i as f64 / sigma;
        kernel.push((-0.5 * x * x).exp());
    }
    let norm: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= norm;
    }

    let len = data.len() as isize;
    let mut out = Vec::with_capacity(data.len());
    for i in 0..len {
        let mut acc = 0.0;
        for (j, k) in kernel.iter().enumerate() {
            let idx = i + j as isize - radius;
            acc += k * data[reflect(idx, len)];
        }
        out.push(acc);
    }
    out
}

fn reflect(idx: isize, len: isize) -> usize {
    let period = 2 * len;
    let mut i = ((idx % period) + period) % period;
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

fn argmin(tr: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in tr.iter().enumerate() {
        if v < tr[best] {
            best = i;
        }
    }
    best
}

fn argmax(tr: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in tr.iter().enumerate() {
        if v > tr[best] {
            best = i;
        }
    }
    best
}
