use std::sync::Arc;

use msgboard_config::AppConfig;
use msgboard_db::MessageProvider;

/// Shared application state accessible from all request handlers.
///
/// Read-only after startup. Storage handles its own connections per call.
pub struct AppState {
    pub config: AppConfig,
    pub messages: Arc<dyn MessageProvider>,
}

impl AppState {
    pub fn new(config: AppConfig, messages: Arc<dyn MessageProvider>) -> Self {
        Self { config, messages }
    }
}

pub type SharedState = Arc<AppState>;
