//! Configuration for the processing engine.

use serde::{Deserialize, Serialize};

use crate::trace::TraceConfig;
use crate::{Error, Result};

/// Processing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Which series to process; `None` means every series in the file
    #[serde(default)]
    pub series: Option<Vec<usize>>,

    /// Channel containing the image to be traced
    #[serde(default)]
    pub channel: usize,

    /// Keep the z-projected frames in the output alongside the traces
    #[serde(default)]
    pub keep_images: bool,

    /// Trace profiling parameters
    #[serde(default)]
    pub trace: TraceConfig,

    /// Gaussian sigma applied to traces before the slope statistic
    #[serde(default)]
    pub slope_sigma: Option<f64>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            series: None,
            channel: 0,
            keep_images: false,
            trace: TraceConfig::default(),
            slope_sigma: None,
        }
    }
}

impl ProcessConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.trace.sigma.is_finite() || self.trace.sigma <= 0.0 {
            return Err(Error::Config(format!(
                "trace sigma must be positive, got {}",
                self.trace.sigma
            )));
        }
        if let Some(sigma) = self.slope_sigma {
            if !sigma.is_finite() || sigma <= 0.0 {
                return Err(Error::Config(format!(
                    "slope sigma must be positive, got {}",
                    sigma
                )));
            }
        }
        if let Some(series) = &self.series {
            if series.is_empty() {
                return Err(Error::Config(
                    "series selection must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
