//! Artifact storage and persistence.
//!
//! The `ArtifactStore` keeps every accepted artifact version on disk:
//!
//! ```text
//! <root>/
//!   char_count/
//!     v1.json
//!     v2.json
//! ```
//!
//! Each version file records the artifact alongside its digest, so a
//! stored version can be verified before it is loaded back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::artifact::ToolArtifact;
use crate::error::{Result, StorageError, ToolError};
use crate::spec::is_valid_name;

/// Address of a stored artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Tool name.
    pub name: String,

    /// Version number, starting at 1.
    pub version: u32,

    /// SHA-256 of the artifact.
    pub digest: String,

    /// File holding this version.
    pub path: PathBuf,
}

/// On-disk form of one artifact version.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredArtifact {
    version: u32,
    digest: String,
    created_at: DateTime<Utc>,
    artifact: ToolArtifact,
}

/// Versioned storage for synthesized tool artifacts.
pub struct ArtifactStore {
    /// Root directory for artifact storage.
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store at the given root directory, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", root.display())))?;

        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tool_dir(&self, name: &str) -> Result<PathBuf> {
        if !is_valid_name(name) {
            return Err(ToolError::NotFound(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    fn version_path(dir: &Path, version: u32) -> PathBuf {
        dir.join(format!("v{version}.json"))
    }

    /// Stored version numbers for a tool, ascending.
    pub async fn versions(&self, name: &str) -> Result<Vec<u32>> {
        let dir = self.tool_dir(name)?;
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", dir.display())))?;

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let file_name = entry.file_name();
            let version = file_name
                .to_str()
                .and_then(|n| n.strip_prefix('v'))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(version) = version {
                versions.push(version);
            }
        }

        versions.sort_unstable();
        Ok(versions)
    }

    /// Persist an artifact as the next version of its tool.
    ///
    /// Persisting content identical to the latest version returns that
    /// version instead of writing a duplicate.
    pub async fn persist(&self, artifact: &ToolArtifact) -> Result<ArtifactRef> {
        let dir = self.tool_dir(&artifact.name)?;
        let digest = artifact.digest()?;

        let latest = self.versions(&artifact.name).await?.last().copied();
        if let Some(version) = latest {
            let path = Self::version_path(&dir, version);
            if let Ok(stored) = self.read_version(&path).await {
                if stored.digest == digest {
                    debug!("Artifact {} v{version} unchanged", artifact.name);
                    return Ok(ArtifactRef {
                        name: artifact.name.clone(),
                        version,
                        digest,
                        path,
                    });
                }
            }
        }

        let version = latest.map_or(1, |v| v + 1);
        let path = Self::version_path(&dir, version);
        let stored = StoredArtifact {
            version,
            digest: digest.clone(),
            created_at: Utc::now(),
            artifact: artifact.clone(),
        };

        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::CreateDirectory(format!("{}: {e}", dir.display())))?;

        // Write atomically
        let content = serde_json::to_string_pretty(&stored)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::WriteFile(format!("{}: {e}", path.display())))?;

        info!("Saved artifact {} v{version}", artifact.name);
        Ok(ArtifactRef {
            name: artifact.name.clone(),
            version,
            digest,
            path,
        })
    }

    async fn read_version(&self, path: &Path) -> Result<StoredArtifact> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load and verify one version.
    pub async fn load(&self, name: &str, version: u32) -> Result<(ArtifactRef, ToolArtifact)> {
        let dir = self.tool_dir(name)?;
        let path = Self::version_path(&dir, version);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ToolError::NotFound(format!("{name} v{version}")));
        }

        let stored = self.read_version(&path).await?;
        if stored.artifact.name != name || stored.artifact.digest()? != stored.digest {
            return Err(StorageError::Corrupt {
                name: name.to_string(),
                version,
            }
            .into());
        }

        Ok((
            ArtifactRef {
                name: name.to_string(),
                version,
                digest: stored.digest,
                path,
            },
            stored.artifact,
        ))
    }

    /// Load and verify the newest version.
    pub async fn load_latest(&self, name: &str) -> Result<(ArtifactRef, ToolArtifact)> {
        let version = self
            .versions(name)
            .await?
            .last()
            .copied()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        self.load(name, version).await
    }

    /// Names of all stored tools, ordered.
    pub async fn names(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| StorageError::ReadFile(format!("{}: {e}", self.root.display())))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ReadFile(format!("{e}")))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            match entry.file_name().to_str() {
                Some(name) if is_dir && is_valid_name(name) => names.push(name.to_string()),
                Some(name) => warn!("Skipping unexpected entry in artifact store: {name}"),
                None => {}
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete every version of a tool.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let dir = self.tool_dir(name)?;
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(ToolError::NotFound(name.to_string()));
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| StorageError::DeleteFile(format!("{}: {e}", dir.display())))?;

        debug!("Deleted artifact: {name}");
        Ok(())
    }
}
