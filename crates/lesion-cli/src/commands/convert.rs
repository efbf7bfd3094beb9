use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lesion_core::{convert_series, LifReader};
use tracing::{info, warn};

pub async fn run(
    inputs: &[PathBuf],
    channel: usize,
    series: Option<&[usize]>,
    z_slice: Option<usize>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let mut inputs: Vec<&PathBuf> = inputs.iter().collect();
    inputs.sort();

    for input in inputs {
        if input.extension().map_or(true, |ext| ext != "lif") {
            warn!("Skipping non-LIF input: {}", input.display());
            continue;
        }

        let data = tokio::fs::read(input)
            .await
            .with_context(|| format!("reading {}", input.display()))?;
        let reader = LifReader::from_bytes(data)?;

        let indices: Vec<usize> = match series {
            Some(series) => series.to_vec(),
            None => (0..reader.metadata().len()).collect(),
        };
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("series");
        let target = out_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")).to_path_buf());

        let written = convert_series(&reader, &indices, channel, z_slice, &target, stem)?;
        for path in &written {
            println!("{}", path.display());
        }
        info!(
            "Converted {}: {} file(s)",
            input.display(),
            written.len()
        );
    }

    Ok(())
}
