use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::http::middleware::auth::{AuthError, Identity};
use crate::http::response::{error_response, ApiResponse};
use crate::state::AppState;
use marginalia_core::domain::comment::ReportStatus;
use marginalia_core::domain::vote::VoteKind;
use marginalia_infra::db;

const MAX_REASON_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2_000;

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub reason: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteData {
    pub comment_id: Uuid,
    pub vote: Option<VoteKind>,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Serialize)]
pub struct HelpfulData {
    pub comment_id: Uuid,
    pub helpful_votes: i64,
    pub newly_marked: bool,
}

#[derive(Debug, Error)]
pub enum EngagementApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("comment not found")]
    NotFound,
    #[error("a report reason is required")]
    MissingReason,
    #[error("report reason exceeds {0} characters")]
    ReasonTooLong(usize),
    #[error("report description exceeds {0} characters")]
    DescriptionTooLong(usize),
    #[error("db error: {0}")]
    Comments(#[from] db::CommentsRepoError),
    #[error("db error: {0}")]
    Votes(#[from] db::VotesRepoError),
    #[error("db error: {0}")]
    Reports(#[from] db::ReportsRepoError),
}

pub async fn toggle_like(
    state: State<AppState>,
    identity: Extension<Identity>,
    id: Path<Uuid>,
) -> Result<Json<ApiResponse<VoteData>>, EngagementApiError> {
    apply_vote(state, identity, id, VoteKind::Like).await
}

pub async fn toggle_dislike(
    state: State<AppState>,
    identity: Extension<Identity>,
    id: Path<Uuid>,
) -> Result<Json<ApiResponse<VoteData>>, EngagementApiError> {
    apply_vote(state, identity, id, VoteKind::Dislike).await
}

async fn apply_vote(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    kind: VoteKind,
) -> Result<Json<ApiResponse<VoteData>>, EngagementApiError> {
    let user = identity.require()?;
    ensure_comment_exists(&state, id).await?;
    let outcome = db::toggle_vote(&state.db, id, &user.user_id, kind).await?;
    Ok(Json(ApiResponse::ok(VoteData {
        comment_id: id,
        vote: outcome.vote,
        likes: outcome.likes,
        dislikes: outcome.dislikes,
    })))
}

pub async fn mark_helpful(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HelpfulData>>, EngagementApiError> {
    let user = identity.require()?;
    ensure_comment_exists(&state, id).await?;
    let newly_marked = db::mark_helpful(&state.db, id, &user.user_id).await?;
    let helpful_votes = db::count_helpful(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(HelpfulData {
        comment_id: id,
        helpful_votes,
        newly_marked,
    })))
}

pub async fn report_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ApiResponse<()>>, EngagementApiError> {
    let user = identity.require()?;
    ensure_comment_exists(&state, id).await?;
    let reason = normalize_reason(payload.reason.as_deref())?;
    let description = normalize_description(payload.description.as_deref())?;

    // Reporting never hides the comment; the moderation queue picks it up.
    db::insert_report(
        &state.db,
        &db::NewReport {
            comment_id: id,
            reporter_id: user.user_id,
            reason,
            description,
            status: ReportStatus::Pending,
        },
    )
    .await?;
    Ok(Json(ApiResponse::message_only("report recorded")))
}

async fn ensure_comment_exists(state: &AppState, id: Uuid) -> Result<(), EngagementApiError> {
    db::find_comment(&state.db, id)
        .await?
        .map(|_| ())
        .ok_or(EngagementApiError::NotFound)
}

fn normalize_reason(value: Option<&str>) -> Result<String, EngagementApiError> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Err(EngagementApiError::MissingReason);
    }
    if trimmed.chars().count() > MAX_REASON_LEN {
        return Err(EngagementApiError::ReasonTooLong(MAX_REASON_LEN));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(value: Option<&str>) -> Result<Option<String>, EngagementApiError> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(EngagementApiError::DescriptionTooLong(MAX_DESCRIPTION_LEN));
    }
    Ok(Some(trimmed.to_string()))
}

impl IntoResponse for EngagementApiError {
    fn into_response(self) -> axum::response::Response {
        let this = match self {
            EngagementApiError::Auth(err) => return err.into_response(),
            other => other,
        };
        warn!(error = %this, "engagement api error");
        let status = match &this {
            EngagementApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            EngagementApiError::MissingReason
            | EngagementApiError::ReasonTooLong(_)
            | EngagementApiError::DescriptionTooLong(_) => StatusCode::BAD_REQUEST,
            EngagementApiError::NotFound => StatusCode::NOT_FOUND,
            EngagementApiError::Comments(_)
            | EngagementApiError::Votes(_)
            | EngagementApiError::Reports(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, &this.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_description, normalize_reason, EngagementApiError};

    #[test]
    fn reason_is_required() {
        assert!(matches!(
            normalize_reason(None),
            Err(EngagementApiError::MissingReason)
        ));
        assert!(normalize_reason(Some("  ")).is_err());
        assert_eq!(normalize_reason(Some(" spam ")).unwrap(), "spam");
    }

    #[test]
    fn overlong_reason_is_rejected() {
        let long = "x".repeat(201);
        assert!(normalize_reason(Some(&long)).is_err());
    }

    #[test]
    fn description_is_optional() {
        assert_eq!(normalize_description(None).unwrap(), None);
        assert_eq!(normalize_description(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_description(Some("details")).unwrap().as_deref(),
            Some("details")
        );
    }
}
