use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::state::AppState;
use marginalia_infra::db::{connect_lazy, DbPoolError};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("db pool error: {0}")]
    DbPool(#[from] DbPoolError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let db = connect_lazy(&config.database_url)?;
    Ok(AppState {
        config: Arc::new(config),
        db,
    })
}
