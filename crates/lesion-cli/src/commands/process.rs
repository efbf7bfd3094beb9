use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use lesion_core::{LifReader, ProcessConfig, ProcessEngine, ProcessMetrics};
use tracing::info;

/// Process command output format
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Csv,
        }
    }
}

pub async fn run(
    input: &Path,
    channel: usize,
    series: Option<Vec<usize>>,
    output: Option<&Path>,
    format: &str,
    show_metrics: bool,
) -> Result<()> {
    let data = tokio::fs::read(input).await?;
    let metrics = Arc::new(ProcessMetrics::new());
    let reader = LifReader::from_bytes(data)?;

    let config = ProcessConfig {
        series,
        channel,
        ..Default::default()
    };
    let engine = ProcessEngine::new(config, metrics.clone())?;
    let result = engine.run(&reader)?;

    let rendered = match OutputFormat::from_str(format) {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&result.table)?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            result.table.to_csv(&mut buf)?;
            String::from_utf8(buf)?
        }
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            info!("Wrote statistics to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    if show_metrics {
        println!("{}", metrics.report());
    }

    Ok(())
}
