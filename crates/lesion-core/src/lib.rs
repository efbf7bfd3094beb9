//! Lesion Core Library
//!
//! This crate provides the core functionality for quantitative analysis of
//! spinal cord lesion images: native parsing of Leica LIF containers,
//! per-series image extraction, trace profiling, trace statistics, PNG
//! conversion and test-fixture retrieval.

pub mod config;
pub mod error;
pub mod export;
pub mod fixtures;
pub mod image;
pub mod lif;
pub mod metrics;
pub mod process;
pub mod stats;
pub mod table;
pub mod trace;

pub use config::ProcessConfig;
pub use error::{Error, Result};
pub use export::{convert_series, write_png};
pub use fixtures::fetch_fixtures;
pub use image::{bad_image, ImageStack, Plane};
pub use lif::{
    parse_series_name, Dimensions, LifMetadata, LifReader, LifVersion, MemoryBlock, Resolution,
    Selection, SeriesMetadata,
};
pub use metrics::{MetricsReport, ProcessMetrics};
pub use process::{PositionTrace, ProcessEngine, ProcessOutput};
pub use stats::{gaussian_filter1d, min_max, missing_fluorescence, slope, StatKind};
pub use table::StatsTable;
pub use trace::{trace_profile, TraceConfig};
