use crate::config::Config;
use crate::db::SiteStore;

/// Everything a command handler needs, built once from the configuration.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub store: SiteStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = SiteStore::new(config.sitelist_path.clone());
        Self { config, store }
    }
}
