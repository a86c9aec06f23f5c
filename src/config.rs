use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

const SITELIST_FILE: &str = "hap2.sitelist.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding every site record.
    pub sitelist_path: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `sitelist` takes precedence over `HAP2_SITELIST`; the home directory
    /// is only consulted when neither is given.
    pub fn from_env(sitelist: Option<PathBuf>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let sitelist_path = resolve_sitelist_path(
            sitelist,
            env::var_os("HAP2_SITELIST").map(PathBuf::from),
            dirs::home_dir,
        )?;

        Ok(Config {
            sitelist_path,
            log_level: env::var("HAP2_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sitelist_path.as_os_str().is_empty() {
            anyhow::bail!("HAP2_SITELIST must not be empty");
        }

        if self.sitelist_path.is_dir() {
            anyhow::bail!(
                "Site list path {} is a directory",
                self.sitelist_path.display()
            );
        }

        if self.log_level.trim().is_empty() {
            anyhow::bail!("HAP2_LOG_LEVEL must not be empty");
        }

        Ok(())
    }
}

/// Explicit path, then the environment, then `$HOME/.config/hap2.sitelist.json`.
fn resolve_sitelist_path(
    explicit: Option<PathBuf>,
    from_env: Option<PathBuf>,
    home_dir: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit.or(from_env) {
        return Ok(path);
    }
    let home = home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(SITELIST_FILE))
}
