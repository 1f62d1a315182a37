use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub modules: HealthModules,
}

#[derive(Debug, Serialize)]
pub struct HealthModules {
    pub database: DatabaseStatus,
    pub auth: AuthStatus,
    pub moderation: ModerationStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub token_ready: bool,
    pub admin_login_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ModerationStatus {
    pub auto_approve: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let token_ready = state
        .config
        .token_secret
        .as_ref()
        .is_some_and(|value| !value.is_empty());
    let admin_login_ready = token_ready
        && state
            .config
            .admin_password_hash
            .as_ref()
            .is_some_and(|value| !value.is_empty());

    Json(HealthResponse {
        status: "ok",
        modules: HealthModules {
            database: DatabaseStatus { configured: true },
            auth: AuthStatus {
                token_ready,
                admin_login_ready,
            },
            moderation: ModerationStatus {
                auto_approve: state.config.auto_approve,
            },
        },
    })
}
