//! Processing engine: turn a LIF file into traces and statistical time
//! series.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ProcessConfig;
use crate::image::{bad_image, Plane};
use crate::lif::name::parse_series_name;
use crate::lif::reader::{LifReader, Selection};
use crate::metrics::ProcessMetrics;
use crate::stats::StatKind;
use crate::table::StatsTable;
use crate::trace::trace_profile;
use crate::{Error, Result};

/// Accumulated traces for one stage position
#[derive(Debug, Clone, Default)]
pub struct PositionTrace {
    /// Acquisition timepoints in hours, one per trace
    pub times: Vec<f64>,

    /// Trace profiles, one per timepoint
    pub traces: Vec<Vec<f64>>,

    /// The z-projected frames behind the traces, kept only when
    /// `keep_images` is set
    pub images: Vec<Plane>,
}

/// Result of one processing run
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Traces grouped by stage position
    pub traces: BTreeMap<String, PositionTrace>,

    /// Statistics: rows are timepoints, columns are position/statistic
    pub table: StatsTable,
}

/// Engine turning image series into traces and statistics
pub struct ProcessEngine {
    config: ProcessConfig,
    metrics: Arc<ProcessMetrics>,
}

impl ProcessEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: ProcessConfig, metrics: Arc<ProcessMetrics>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, metrics })
    }

    /// Get metrics
    pub fn metrics(&self) -> &ProcessMetrics {
        &self.metrics
    }

    /// Process the selected series of one container.
    pub fn run(&self, reader: &LifReader) -> Result<ProcessOutput> {
        match self.run_inner(reader) {
            Ok(output) => Ok(output),
            Err(e) => {
                self.metrics.record_error();
                Err(e)
            }
        }
    }

    fn run_inner(&self, reader: &LifReader) -> Result<ProcessOutput> {
        let metadata = reader.metadata();
        let indices: Vec<usize> = match &self.config.series {
            Some(series) => series.clone(),
            None => (0..metadata.len()).collect(),
        };
        for &idx in &indices {
            if idx >= metadata.len() {
                return Err(Error::SeriesNotFound {
                    requested: idx,
                    available: metadata.len(),
                });
            }
        }

        let parsed: Vec<(String, Vec<f64>)> = indices
            .iter()
            .map(|&idx| parse_series_name(&metadata.series[idx].name))
            .collect::<Result<_>>()?;

        let table_times = union_times(&parsed);
        let columns = stat_columns(&parsed);
        let mut table = StatsTable::new(table_times, columns);
        let mut traces: BTreeMap<String, PositionTrace> = BTreeMap::new();

        info!(series = indices.len(), "processing container");
        for (run_idx, (&series_idx, (position, times))) in
            indices.iter().zip(&parsed).enumerate()
        {
            let series = &metadata.series[series_idx];
            let name = &series.name;
            debug!(series = name.as_str(), "processing series");

            let stack = reader.series_stack(series_idx, Selection::channel(self.config.channel))?;
            self.metrics.record_planes(stack.plane_count() as u64);
            self.metrics.record_bytes(
                (stack.plane_count() * series.plane_len() * series.bytes_per_pixel()) as u64,
            );
            let frames = stack.sum_project_z(0)?;
            if frames.len() != times.len() {
                warn!(
                    series = name.as_str(),
                    frames = frames.len(),
                    timepoints = times.len(),
                    "frame and timepoint counts differ, zipping to the shorter"
                );
            }

            let entry = traces.entry(position.clone()).or_default();
            for (frame, &time) in frames.iter().zip(times) {
                if bad_image(frame) {
                    warn!(
                        series = name.as_str(),
                        time, "acquisition looks bad (low fluorescence)"
                    );
                }

                let tr = trace_profile(frame, &self.config.trace);
                self.metrics.record_trace();
                for stat in StatKind::all() {
                    table.set(
                        time,
                        position,
                        stat.name(),
                        stat.compute(&tr, self.config.slope_sigma),
                    )?;
                }

                entry.times.push(time);
                entry.traces.push(tr);
                if self.config.keep_images {
                    entry.images.push(frame.clone());
                }
            }

            self.metrics.record_series();
            info!(
                series = name.as_str(),
                index = run_idx + 1,
                total = indices.len(),
                "series processed"
            );
        }

        Ok(ProcessOutput { traces, table })
    }
}

/// Sorted union of every parsed timepoint.
fn union_times(parsed: &[(String, Vec<f64>)]) -> Vec<f64> {
    let mut times: Vec<f64> = parsed.iter().flat_map(|(_, t)| t.iter().copied()).collect();
    times.sort_by(f64::total_cmp);
    times.dedup_by(|a, b| a.to_bits() == b.to_bits());
    times
}

/// Position-by-statistic column labels, positions in first-appearance order.
fn stat_columns(parsed: &[(String, Vec<f64>)]) -> Vec<(String, String)> {
    let mut positions: Vec<&str> = Vec::new();
    for (position, _) in parsed {
        if !positions.contains(&position.as_str()) {
            positions.push(position);
        }
    }
    positions
        .iter()
        .flat_map(|&position| {
            StatKind::all()
                .into_iter()
                .map(move |stat| (position.to_string(), stat.name().to_string()))
        })
        .collect()
}
