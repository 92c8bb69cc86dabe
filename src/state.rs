use std::sync::Arc;

use crate::auth::JwtKeys;
use crate::config::AppConfig;
use crate::database::Store;

/// Everything a request handler may touch. Built once at startup and cloned
/// into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let jwt = Arc::new(JwtKeys::from_config(&config.security));
        Self {
            config: Arc::new(config),
            store,
            jwt,
        }
    }
}
