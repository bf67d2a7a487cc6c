//! Shared application state.

use std::sync::Arc;

use tally_db::Database;

use crate::config::ServerConfig;

/// Handed to every handler through axum's `State` extractor.
///
/// Cheap to clone: the pool and the configuration are shared.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}
