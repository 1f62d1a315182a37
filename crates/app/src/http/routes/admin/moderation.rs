use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::http::middleware::auth::{AuthError, Identity};
use crate::http::response::{error_response, ApiResponse, Pagination};
use crate::state::AppState;
use marginalia_core::domain::comment::{Comment, EditRecord, Report, ReportStatus};
use marginalia_core::domain::moderation::{
    apply_action, summarize, BulkItemResult, BulkSummary, ModerationAction,
};
use marginalia_infra::db;

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub action: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkModerateRequest {
    pub comment_ids: Option<Vec<Uuid>>,
    pub action: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueItemData {
    pub comment: Comment,
    pub pending_reports: i64,
}

#[derive(Debug, Serialize)]
pub struct BulkModerationData {
    pub summary: BulkSummary,
    pub results: Vec<BulkItemResult>,
}

#[derive(Debug, Serialize)]
pub struct CommentDetailData {
    pub comment: Comment,
    pub reports: Vec<Report>,
    pub edits: Vec<EditRecord>,
}

#[derive(Debug, Error)]
pub enum ModerationApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("a moderation action is required")]
    MissingAction,
    #[error("invalid moderation action: {0}")]
    InvalidAction(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("comment_ids must contain between 1 and {0} entries")]
    InvalidBatch(usize),
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("comment not found")]
    NotFound,
    #[error("db error: {0}")]
    Comments(#[from] db::CommentsRepoError),
    #[error("db error: {0}")]
    Reports(#[from] db::ReportsRepoError),
}

pub async fn list_moderation_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
) -> Result<Json<ApiResponse<Vec<QueueItemData>>>, ModerationApiError> {
    let page = match params.page {
        None => 1,
        Some(page) if page >= 1 => page,
        Some(_) => return Err(ModerationApiError::InvalidPage),
    };
    let limit = match params.limit {
        Some(limit) if limit > 0 => limit.min(state.config.max_page_size),
        _ => state.config.default_page_size,
    };
    let offset = (page - 1) * limit;

    let (entries, total) = tokio::try_join!(
        db::list_moderation_queue(&state.db, limit, offset),
        db::count_moderation_queue(&state.db),
    )?;
    let items = entries
        .into_iter()
        .map(|entry| QueueItemData {
            comment: entry.comment,
            pending_reports: entry.pending_reports,
        })
        .collect();
    Ok(Json(ApiResponse::paginated(
        items,
        Pagination::new(page, limit, total),
    )))
}

/// Everything a moderator needs on one comment: the record itself, its
/// report history, and its edit history.
pub async fn get_comment_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CommentDetailData>>, ModerationApiError> {
    let comment = db::find_comment(&state.db, id)
        .await?
        .ok_or(ModerationApiError::NotFound)?;
    let reports = db::list_reports(&state.db, id).await?;
    let edits = db::list_edits(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(CommentDetailData {
        comment,
        reports,
        edits,
    })))
}

pub async fn moderate_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerateRequest>,
) -> Result<Json<ApiResponse<Comment>>, ModerationApiError> {
    let moderator = identity.require_moderator()?;
    let action = parse_action(payload.action.as_deref())?;
    moderate_one(
        &state,
        id,
        action,
        payload.reason.as_deref(),
        &moderator.user_id,
    )
    .await?;

    let updated = db::find_comment(&state.db, id)
        .await?
        .ok_or(ModerationApiError::NotFound)?;
    Ok(Json(ApiResponse::with_message(
        updated,
        format!("comment {}", updated_label(action)),
    )))
}

/// Applies one action to many comments independently; a failure on one id
/// never aborts the rest.
pub async fn bulk_moderate(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<BulkModerateRequest>,
) -> Result<Json<ApiResponse<BulkModerationData>>, ModerationApiError> {
    let moderator = identity.require_moderator()?;
    let action = parse_action(payload.action.as_deref())?;
    let ids = payload.comment_ids.unwrap_or_default();
    if ids.is_empty() || ids.len() > state.config.max_bulk_size {
        return Err(ModerationApiError::InvalidBatch(state.config.max_bulk_size));
    }

    let mut results = Vec::with_capacity(ids.len());
    for id in ids {
        let outcome = moderate_one(
            &state,
            id,
            action,
            payload.reason.as_deref(),
            &moderator.user_id,
        )
        .await;
        results.push(match outcome {
            Ok(()) => BulkItemResult {
                id,
                success: true,
                error: None,
            },
            Err(err) => BulkItemResult {
                id,
                success: false,
                error: Some(err.to_string()),
            },
        });
    }
    let summary = summarize(&results);
    info!(
        action = %action,
        total = summary.total,
        failed = summary.failed,
        "bulk moderation finished"
    );
    Ok(Json(ApiResponse::ok(BulkModerationData {
        summary,
        results,
    })))
}

async fn moderate_one(
    state: &AppState,
    id: Uuid,
    action: ModerationAction,
    reason: Option<&str>,
    moderator_id: &str,
) -> Result<(), ModerationApiError> {
    let comment = db::find_comment(&state.db, id)
        .await?
        .ok_or(ModerationApiError::NotFound)?;
    let outcome = apply_action(comment.moderation_status, action, reason)
        .map_err(|err| ModerationApiError::InvalidTransition(err.to_string()))?;

    db::set_moderation(
        &state.db,
        id,
        outcome.status,
        outcome.is_approved,
        moderator_id,
        reason.map(str::trim).filter(|value| !value.is_empty()),
        Utc::now(),
    )
    .await?;

    // Settling a comment settles its open reports; flagging keeps them live.
    if let Some(settled) = settled_report_status(action) {
        db::settle_reports(&state.db, id, settled).await?;
    }
    Ok(())
}

fn parse_action(value: Option<&str>) -> Result<ModerationAction, ModerationApiError> {
    let raw = value.unwrap_or("").trim();
    if raw.is_empty() {
        return Err(ModerationApiError::MissingAction);
    }
    ModerationAction::try_from(raw).map_err(|_| ModerationApiError::InvalidAction(raw.to_string()))
}

fn updated_label(action: ModerationAction) -> &'static str {
    match action {
        ModerationAction::Approve => "approved",
        ModerationAction::Reject => "rejected",
        ModerationAction::Flag => "flagged",
    }
}

fn settled_report_status(action: ModerationAction) -> Option<ReportStatus> {
    match action {
        ModerationAction::Approve => Some(ReportStatus::Dismissed),
        ModerationAction::Reject => Some(ReportStatus::Resolved),
        ModerationAction::Flag => None,
    }
}

impl IntoResponse for ModerationApiError {
    fn into_response(self) -> axum::response::Response {
        let this = match self {
            ModerationApiError::Auth(err) => return err.into_response(),
            other => other,
        };
        warn!(error = %this, "moderation api error");
        let status = match &this {
            ModerationApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ModerationApiError::MissingAction
            | ModerationApiError::InvalidAction(_)
            | ModerationApiError::InvalidTransition(_)
            | ModerationApiError::InvalidBatch(_)
            | ModerationApiError::InvalidPage => StatusCode::BAD_REQUEST,
            ModerationApiError::NotFound => StatusCode::NOT_FOUND,
            ModerationApiError::Comments(_) | ModerationApiError::Reports(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, &this.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_action, settled_report_status, ModerationApiError};
    use marginalia_core::domain::comment::ReportStatus;
    use marginalia_core::domain::moderation::ModerationAction;

    #[test]
    fn parse_action_accepts_known_actions() {
        assert_eq!(
            parse_action(Some("approve")).unwrap(),
            ModerationAction::Approve
        );
        assert_eq!(parse_action(Some(" flag ")).unwrap(), ModerationAction::Flag);
    }

    #[test]
    fn parse_action_rejects_missing_and_unknown() {
        assert!(matches!(
            parse_action(None),
            Err(ModerationApiError::MissingAction)
        ));
        assert!(matches!(
            parse_action(Some("hide")),
            Err(ModerationApiError::InvalidAction(_))
        ));
    }

    #[test]
    fn report_settlement_follows_action() {
        assert_eq!(
            settled_report_status(ModerationAction::Approve),
            Some(ReportStatus::Dismissed)
        );
        assert_eq!(
            settled_report_status(ModerationAction::Reject),
            Some(ReportStatus::Resolved)
        );
        assert_eq!(settled_report_status(ModerationAction::Flag), None);
    }
}
