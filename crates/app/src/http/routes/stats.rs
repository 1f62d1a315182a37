use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::http::response::{error_response, ApiResponse};
use crate::state::AppState;
use marginalia_core::types::ContentKind;
use marginalia_infra::db::{fetch_comment_totals, fetch_vote_totals, StatsFilter, StatsRepoError};

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub content_kind: Option<String>,
    pub content_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentStatsData {
    pub total_comments: i64,
    pub total_replies: i64,
    pub total_likes: i64,
    pub total_dislikes: i64,
    pub pending_moderation: i64,
    pub flagged: i64,
}

#[derive(Debug, Error)]
pub enum StatsApiError {
    #[error("{0}")]
    InvalidKind(String),
    #[error("db error: {0}")]
    Db(#[from] StatsRepoError),
}

pub async fn get_comment_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ApiResponse<CommentStatsData>>, StatsApiError> {
    let content_kind = params
        .content_kind
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|raw| {
            ContentKind::try_from(raw).map_err(|err| StatsApiError::InvalidKind(err.to_string()))
        })
        .transpose()?;
    let content_id = params
        .content_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let filter = StatsFilter {
        content_kind,
        content_id,
    };

    let (totals, votes) = tokio::try_join!(
        fetch_comment_totals(&state.db, &filter),
        fetch_vote_totals(&state.db, &filter),
    )?;

    Ok(Json(ApiResponse::ok(CommentStatsData {
        total_comments: totals.total_comments,
        total_replies: totals.total_replies,
        total_likes: votes.likes,
        total_dislikes: votes.dislikes,
        pending_moderation: totals.pending_moderation,
        flagged: totals.flagged,
    })))
}

impl IntoResponse for StatsApiError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "stats api error");
        let status = match &self {
            StatsApiError::InvalidKind(_) => StatusCode::BAD_REQUEST,
            StatsApiError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, &self.to_string())
    }
}
