//! Trace profiles: collapse a fluorescence image to one intensity value per
//! column by following the brightest structure through the frame.

use serde::{Deserialize, Serialize};

use crate::image::Plane;
use crate::stats::gaussian_filter1d;

/// Configuration for trace profiling
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Gaussian sigma applied to each column before locating the cord
    #[serde(default = "default_sigma")]
    pub sigma: f64,

    /// Half-height of the raw-intensity window averaged around the cord
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            sigma: default_sigma(),
            window: default_window(),
        }
    }
}

fn default_sigma() -> f64 {
    4.0
}

fn default_window() -> usize {
    2
}

/// Produce a 1-D intensity profile along the image's horizontal axis.
///
/// For each column the column signal is smoothed, the brightest row is
/// taken as the cord location, and the raw intensities in a window of
/// `config.window` rows either side of it are averaged. The profile has one
/// entry per image column; an empty image yields an empty profile.
pub fn trace_profile(plane: &Plane, config: &TraceConfig) -> Vec<f64> {
    let width = plane.width();
    let height = plane.height();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut profile = Vec::with_capacity(width);
    let mut column = vec![0.0f64; height];
    for x in 0..width {
        for (value, px) in column.iter_mut().zip(plane.column(x)) {
            *value = px as f64;
        }
        let smoothed = gaussian_filter1d(&column, config.sigma);

        let mut peak = 0;
        for (y, &v) in smoothed.iter().enumerate() {
            if v > smoothed[peak] {
                peak = y;
            }
        }

        let lo = peak.saturating_sub(config.window);
        let hi = (peak + config.window).min(height - 1);
        let sum: f64 = column[lo..=hi].iter().sum();
        profile.push(sum / (hi - lo + 1) as f64);
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame with a bright horizontal band whose row drifts across columns.
    fn banded_plane(width: usize, height: usize, band_row: impl Fn(usize) -> usize) -> Plane {
        let mut pixels = vec![0u16; width * height];
        for x in 0..width {
            let row = band_row(x);
            pixels[row * width + x] = 1000;
        }
        Plane::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_profile_length_matches_width() {
        let plane = banded_plane(16, 32, |_| 16);
        let profile = trace_profile(&plane, &TraceConfig::default());
        assert_eq!(profile.len(), 16);
    }

    #[test]
    fn test_profile_follows_band() {
        let config = TraceConfig {
            sigma: 1.0,
            window: 0,
        };
        let plane = banded_plane(16, 32, |x| 8 + x / 2);
        let profile = trace_profile(&plane, &config);
        assert!(profile.iter().all(|&v| v == 1000.0));
    }

    #[test]
    fn test_window_averages_around_band() {
        let config = TraceConfig {
            sigma: 1.0,
            window: 1,
        };
        let plane = banded_plane(4, 16, |_| 8);
        let profile = trace_profile(&plane, &config);
        // 3-row window holds one bright row and two dark ones
        for v in profile {
            assert!((v - 1000.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_image() {
        let plane = Plane::zeroed(0, 0);
        assert!(trace_profile(&plane, &TraceConfig::default()).is_empty());
    }
}
