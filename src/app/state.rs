//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::SessionSettings;
use crate::matchmaking::MatchmakingRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<MatchmakingRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // One registry for the whole process
        let registry = Arc::new(MatchmakingRegistry::new(SessionSettings {
            tick_interval: config.tick_interval,
            ..SessionSettings::default()
        }));

        Self { config, registry }
    }
}
