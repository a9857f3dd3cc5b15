use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, services::portal_api::PortalApi};

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub portal_api: PortalApi,
}

impl AppState {
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let portal_api = PortalApi::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            portal_api,
        })
    }
}
