//! Local caching of the bulk assignee archive.
//!
//! Layout: `<cache_dir>/<version>/<file name>` plus a `VERSION` marker file
//! holding the archive version. The archive is fetched again only when the
//! file is missing or the marker does not match.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use crate::config::BulkConfig;
use crate::error::IndexError;
use crate::sanitize::redact_url;

const VERSION_MARKER: &str = "VERSION";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 30);

/// Where the archive comes from and which content version it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
    /// `http(s)://` URL or local filesystem path.
    pub location: String,
    pub version: String,
}

impl ArchiveSource {
    pub fn new(location: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            version: version.into(),
        }
    }

    pub fn from_config(config: &BulkConfig) -> Self {
        Self::new(config.archive_url.clone(), config.archive_version.clone())
    }

    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }

    /// File name the cached copy is stored under.
    pub fn file_name(&self) -> String {
        let without_query = self.location.split(['?', '#']).next().unwrap_or("");
        without_query
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("archive.bin")
            .to_string()
    }

    /// Location safe to log.
    pub fn display_location(&self) -> String {
        redact_url(&self.location)
    }
}

/// On-disk archive cache.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    root: PathBuf,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, source: &ArchiveSource) -> PathBuf {
        self.root.join(version_dir_name(&source.version))
    }

    /// Path the cached archive for `source` lives at (whether or not present).
    pub fn cached_path(&self, source: &ArchiveSource) -> PathBuf {
        self.version_dir(source).join(source.file_name())
    }

    /// True when the cached copy exists and its marker matches the version.
    pub fn is_cached(&self, source: &ArchiveSource) -> bool {
        let marker = self.version_dir(source).join(VERSION_MARKER);
        let marker_matches = std::fs::read_to_string(&marker)
            .map(|content| content.trim() == source.version)
            .unwrap_or(false);
        marker_matches && self.cached_path(source).is_file()
    }

    /// Returns the path of a cached copy of the archive, fetching it first
    /// when needed.
    pub async fn ensure(
        &self,
        source: &ArchiveSource,
        client: &reqwest::Client,
    ) -> Result<PathBuf, IndexError> {
        let target = self.cached_path(source);
        if self.is_cached(source) {
            tracing::debug!(path = %target.display(), "Bulk archive cache hit");
            return Ok(target);
        }

        let dir = self.version_dir(source);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| IndexError::Io {
                path: dir.clone(),
                source: e,
            })?;

        // Stale or partial copies are replaced through a temp file.
        let partial = dir.join(format!("{}.partial", source.file_name()));
        if source.is_remote() {
            download(source, client, &partial).await?;
        } else {
            tokio::fs::copy(&source.location, &partial)
                .await
                .map_err(|e| IndexError::unavailable(source.display_location(), e))?;
        }

        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| IndexError::Io {
                path: target.clone(),
                source: e,
            })?;

        let marker = dir.join(VERSION_MARKER);
        tokio::fs::write(&marker, &source.version)
            .await
            .map_err(|e| IndexError::Io {
                path: marker,
                source: e,
            })?;

        tracing::info!(
            source = %source.display_location(),
            version = %source.version,
            path = %target.display(),
            "Bulk archive cached"
        );

        Ok(target)
    }
}

async fn download(
    source: &ArchiveSource,
    client: &reqwest::Client,
    dest: &Path,
) -> Result<(), IndexError> {
    let location = source.display_location();
    tracing::info!(source = %location, "Downloading bulk archive");

    let mut response = client
        .get(&source.location)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| IndexError::unavailable(location.clone(), e.without_url()))?;

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| IndexError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| IndexError::unavailable(location.clone(), e.without_url()))?
    {
        file.write_all(&chunk).await.map_err(|e| IndexError::Io {
            path: dest.to_path_buf(),
            source: e,
        })?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| IndexError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(bytes = written, "Bulk archive download finished");
    Ok(())
}

/// Directory name for a version string, restricted to filesystem-safe bytes.
fn version_dir_name(version: &str) -> String {
    let name: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        name
    }
}
