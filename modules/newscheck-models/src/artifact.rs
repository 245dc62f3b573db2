use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use newscheck_common::file_config::ClassifierConfig;
use newscheck_common::NewsCheckError;

/// A remote artifact with a local cache location.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub name: String,
    pub url: String,
    pub cache_path: PathBuf,
    /// Hex SHA-256 the cached file must match, if known.
    pub sha256: Option<String>,
}

impl ArtifactSpec {
    pub fn classifier_weights(config: &ClassifierConfig) -> Self {
        Self {
            name: "classifier weights".to_string(),
            url: config.resolved_download_url(),
            cache_path: config.cache_path.clone(),
            sha256: config.sha256.as_ref().map(|s| s.trim().to_lowercase()),
        }
    }
}

/// Downloads artifacts once and reuses the cached copy afterwards.
pub struct ArtifactFetcher {
    http: reqwest::Client,
}

impl ArtifactFetcher {
    pub fn new(timeout: Duration) -> Result<Self, NewsCheckError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }

    /// Path to a verified local copy of `spec`, downloading it when the cache
    /// is missing or fails verification.
    pub async fn ensure_cached(&self, spec: &ArtifactSpec) -> Result<PathBuf, NewsCheckError> {
        if spec.cache_path.is_file() {
            match verify(&spec.cache_path, spec.sha256.as_deref()).await {
                Ok(()) => {
                    info!(artifact = %spec.name, path = %spec.cache_path.display(), "Using cached artifact");
                    return Ok(spec.cache_path.clone());
                }
                Err(reason) => {
                    warn!(artifact = %spec.name, %reason, "Cached artifact failed verification, downloading again");
                }
            }
        }

        self.download(spec)
            .await
            .map_err(|e| NewsCheckError::model_unavailable(&spec.name, format!("{e:#}")))?;
        Ok(spec.cache_path.clone())
    }

    async fn download(&self, spec: &ArtifactSpec) -> anyhow::Result<()> {
        info!(artifact = %spec.name, url = %spec.url, "Downloading artifact");

        let resp = self
            .http
            .get(&spec.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", spec.url))?;
        if !resp.status().is_success() {
            anyhow::bail!("download returned HTTP {}", resp.status());
        }
        let bytes = resp.bytes().await.context("failed to read download body")?;

        if let Some(expected) = spec.sha256.as_deref() {
            let actual = sha256_hex(&bytes);
            if actual != expected {
                anyhow::bail!("checksum mismatch: expected {expected}, got {actual}");
            }
        }

        if let Some(parent) = spec.cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let partial = spec.cache_path.with_extension("part");
        tokio::fs::write(&partial, &bytes)
            .await
            .with_context(|| format!("failed to write {}", partial.display()))?;
        tokio::fs::rename(&partial, &spec.cache_path)
            .await
            .with_context(|| format!("failed to move download into {}", spec.cache_path.display()))?;

        info!(artifact = %spec.name, bytes = bytes.len(), "Artifact cached");
        Ok(())
    }
}

async fn verify(path: &Path, expected: Option<&str>) -> Result<(), String> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let actual = sha256_hex(&bytes);
    if actual == expected {
        Ok(())
    } else {
        Err(format!("checksum mismatch: expected {expected}, got {actual}"))
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
