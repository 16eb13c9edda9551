use std::sync::Arc;

use crate::config::Config;
use crate::registry::Registry;

/// Handles shared by every request. Built once at startup; tests build their own.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            registry: Arc::new(Registry::new(config.mailbox_capacity)),
            config: Arc::new(config),
        }
    }
}
