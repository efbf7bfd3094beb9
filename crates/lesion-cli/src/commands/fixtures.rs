use std::path::Path;

use anyhow::Result;
use lesion_core::fetch_fixtures;

pub async fn run(manifest: &Path, out_dir: &Path) -> Result<()> {
    let fetched = fetch_fixtures(manifest, out_dir).await?;

    if fetched.is_empty() {
        println!("All fixtures already present in {}", out_dir.display());
    } else {
        for name in &fetched {
            println!("fetched {}", name);
        }
        println!(
            "{} fixture(s) downloaded to {}",
            fetched.len(),
            out_dir.display()
        );
    }

    Ok(())
}
