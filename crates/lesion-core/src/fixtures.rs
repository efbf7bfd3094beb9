//! Retrieval of test-fixture files listed in a text manifest.

use std::path::Path;

use tracing::{debug, info};

use crate::{Error, Result};

/// Download every file listed in `manifest_path` into `out_dir`.
///
/// The manifest holds one URL per line; blank lines and `#` comments are
/// ignored. Files already present in `out_dir` are skipped. Returns the
/// names of the files actually fetched.
pub async fn fetch_fixtures(manifest_path: &Path, out_dir: &Path) -> Result<Vec<String>> {
    let manifest = tokio::fs::read_to_string(manifest_path).await?;
    tokio::fs::create_dir_all(out_dir).await?;

    let mut fetched = Vec::new();
    for url in manifest_urls(&manifest) {
        let name = file_name(url)?;
        let target = out_dir.join(&name);
        if target.exists() {
            debug!(name = name.as_str(), "fixture already present, skipping");
            continue;
        }

        info!(url, "fetching fixture");
        let response = reqwest::get(url).await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                message: format!("HTTP status {}", response.status()),
            });
        }
        let body = response.bytes().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tokio::fs::write(&target, &body).await?;
        fetched.push(name);
    }

    info!(fetched = fetched.len(), "fixture retrieval complete");
    Ok(fetched)
}

fn manifest_urls(manifest: &str) -> impl Iterator<Item = &str> {
    manifest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn file_name(url: &str) -> Result<String> {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            message: "cannot determine file name from URL".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_parsing() {
        let manifest = "\
# lesion test fixtures
https://example.org/data/exp1.lif

https://example.org/data/exp2.lif
  # indented comment
";
        let urls: Vec<_> = manifest_urls(manifest).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.org/data/exp1.lif",
                "https://example.org/data/exp2.lif"
            ]
        );
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            file_name("https://example.org/data/exp1.lif").unwrap(),
            "exp1.lif"
        );
        assert!(matches!(
            file_name("https://example.org/data/"),
            Err(Error::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_existing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let manifest_path = dir.path().join("fixtures.txt");
        let out_dir = dir.path().join("data");

        tokio::fs::create_dir_all(&out_dir).await.unwrap();
        tokio::fs::write(
            &manifest_path,
            "https://example.invalid/exp1.lif\n",
        )
        .await
        .unwrap();
        tokio::fs::write(out_dir.join("exp1.lif"), b"cached")
            .await
            .unwrap();

        // every listed file exists, so no network access happens
        let fetched = fetch_fixtures(&manifest_path, &out_dir).await.unwrap();
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = fetch_fixtures(&dir.path().join("absent.txt"), dir.path()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
