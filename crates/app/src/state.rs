use std::sync::Arc;

use crate::config::AppConfig;
use marginalia_infra::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
}
