use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::SiteList;

/// The site list file. Every load and save covers the whole collection.
///
/// There is no locking; one process at a time is assumed.
#[derive(Debug, Clone)]
pub struct SiteStore {
    path: PathBuf,
}

impl SiteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every site record. A missing file is an empty list.
    pub fn load(&self) -> Result<SiteList> {
        tracing::debug!("Reading site list from {}", self.path.display());

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Site list {} does not exist yet", self.path.display());
                return Ok(SiteList::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read site list {}", self.path.display())
                })
            }
        };

        // Older versions wrote `null` for an empty collection.
        let sites: Option<SiteList> = serde_json::from_slice(&data)
            .with_context(|| format!("Failed to parse site list {}", self.path.display()))?;

        Ok(sites.unwrap_or_default())
    }

    /// Replace the stored list with `sites`.
    ///
    /// Writes a sibling temporary file and renames it into place so readers
    /// see either the old or the new list.
    pub fn save(&self, sites: &SiteList) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut data =
            serde_json::to_vec_pretty(sites).context("Failed to serialize site list")?;
        data.push(b'\n');

        let tmp = self.tmp_path();
        fs::write(&tmp, &data)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace site list {}", self.path.display()))?;

        tracing::debug!(
            "Wrote {} site(s) to {}",
            sites.len(),
            self.path.display()
        );
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
