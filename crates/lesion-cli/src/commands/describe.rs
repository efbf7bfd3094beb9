use std::path::Path;

use anyhow::Result;
use lesion_core::{LifMetadata, LifReader};
use tracing::info;

/// Describe command output format
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

pub async fn run(input: &Path, format: &str) -> Result<()> {
    info!("Reading container: {}", input.display());
    let data = tokio::fs::read(input).await?;
    let reader = LifReader::from_bytes(data)?;

    match OutputFormat::from_str(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reader.metadata())?);
        }
        OutputFormat::Text => {
            print_metadata_text(input, reader.metadata());
        }
    }

    Ok(())
}

fn print_metadata_text(input: &Path, metadata: &LifMetadata) {
    println!("File: {}", input.display());
    println!("Version: {:?}", metadata.version);
    println!("Series: {}", metadata.len());
    println!();
    println!(
        "{:<4} {:<28} {:>4} {:>4} {:>6} {:>6} {:>3} {:>5}  {}",
        "#", "Name", "t", "z", "y", "x", "c", "bits", "step z/y/x (um)"
    );
    for (i, series) in metadata.series.iter().enumerate() {
        println!(
            "{:<4} {:<28} {:>4} {:>4} {:>6} {:>6} {:>3} {:>5}  {:.3}/{:.3}/{:.3}",
            i,
            series.name,
            series.dims.t,
            series.dims.z,
            series.dims.y,
            series.dims.x,
            series.channels,
            series.bits_per_pixel,
            series.resolution.z,
            series.resolution.y,
            series.resolution.x
        );
    }
}
