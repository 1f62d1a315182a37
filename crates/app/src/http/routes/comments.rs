use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::http::middleware::auth::{AuthError, AuthUser, Identity};
use crate::http::response::{error_response, ApiResponse, Pagination};
use crate::state::AppState;
use marginalia_core::domain::comment::{resolve_root_id, AuthorRole, Comment, ModerationStatus};
use marginalia_core::domain::tree::{build_comment_tree, CommentNode};
use marginalia_core::types::{ContentKind, ContentRef};
use marginalia_infra::db;
use marginalia_infra::db::{CommentFilter, CommentSort, SortOrder};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub content_kind: Option<String>,
    pub content_id: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub content_kind: Option<String>,
    pub content_id: Option<String>,
    pub author_id: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TreeData {
    pub content_kind: ContentKind,
    pub content_id: String,
    pub max_depth: usize,
    pub total: usize,
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Error)]
pub enum CommentsApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("content is required")]
    MissingContent,
    #[error("content exceeds {0} characters")]
    ContentTooLong(usize),
    #[error("content_kind and content_id are required together")]
    MissingTarget,
    #[error("{0}")]
    InvalidTarget(String),
    #[error("{0}")]
    InvalidStatus(String),
    #[error("status filter requires a moderator role")]
    StatusFilterForbidden,
    #[error("invalid sort key: {0}")]
    InvalidSort(String),
    #[error("invalid sort order: {0}")]
    InvalidOrder(String),
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("parent comment not found")]
    ParentNotFound,
    #[error("parent comment belongs to a different content target")]
    ParentTargetMismatch,
    #[error("comment not found")]
    NotFound,
    #[error("only the author or an admin may modify this comment")]
    Forbidden,
    #[error("db error: {0}")]
    Db(#[from] db::CommentsRepoError),
    #[error("db error: {0}")]
    Reports(#[from] db::ReportsRepoError),
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), CommentsApiError> {
    let user = identity.require()?;
    let content = normalize_content(payload.content.as_deref(), state.config.max_content_len)?;
    let target = parse_target(
        payload.content_kind.as_deref(),
        payload.content_id.as_deref(),
    )?
    .ok_or(CommentsApiError::MissingTarget)?;

    let (parent_id, root_id) = match payload.parent_id {
        Some(parent_id) => {
            let parent = db::find_comment(&state.db, parent_id)
                .await?
                .ok_or(CommentsApiError::ParentNotFound)?;
            if parent.content_kind != target.kind() || parent.content_id != target.id() {
                return Err(CommentsApiError::ParentTargetMismatch);
            }
            (
                Some(parent.id),
                Some(resolve_root_id(parent.id, parent.root_id)),
            )
        }
        None => (None, None),
    };

    let (moderation_status, is_approved) = if state.config.auto_approve {
        (ModerationStatus::Approved, true)
    } else {
        (ModerationStatus::Pending, false)
    };
    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        content,
        author_id: user.user_id,
        author_role: user.role,
        content_kind: target.kind(),
        content_id: target.id().to_string(),
        parent_id,
        root_id,
        likes: Vec::new(),
        dislikes: Vec::new(),
        helpful_votes: 0,
        moderation_status,
        is_approved,
        moderated_by: None,
        moderated_at: None,
        moderation_reason: None,
        created_at: now,
        updated_at: now,
    };
    db::insert_comment(&state.db, &comment).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(comment))))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Comment>>>, CommentsApiError> {
    let filter = build_filter(identity.user(), &params)?;
    let sort = parse_sort(params.sort.as_deref())?;
    let order = parse_order(params.order.as_deref())?;
    let page = resolve_page(params.page)?;
    let limit = resolve_limit(
        params.limit,
        state.config.default_page_size,
        state.config.max_page_size,
    );
    let offset = (page - 1) * limit;

    let (items, total) = tokio::try_join!(
        db::list_comments(&state.db, &filter, sort, order, limit, offset),
        db::count_comments(&state.db, &filter),
    )?;
    Ok(Json(ApiResponse::paginated(
        items,
        Pagination::new(page, limit, total),
    )))
}

pub async fn get_comment_tree(
    State(state): State<AppState>,
    Path((content_kind, content_id)): Path<(String, String)>,
    Query(params): Query<TreeParams>,
) -> Result<Json<ApiResponse<TreeData>>, CommentsApiError> {
    let target = ContentRef::parse(&content_kind, &content_id)
        .map_err(|err| CommentsApiError::InvalidTarget(err.to_string()))?;
    let max_depth = clamp_depth(
        params.max_depth,
        state.config.default_tree_depth,
        state.config.max_tree_depth,
    );
    let records = db::list_thread(&state.db, &target).await?;
    let tree = build_comment_tree(&records, max_depth);
    Ok(Json(ApiResponse::ok(TreeData {
        content_kind: target.kind(),
        content_id: target.id().to_string(),
        max_depth,
        total: tree.total,
        comments: tree.comments,
    })))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<ApiResponse<Comment>>, CommentsApiError> {
    let user = identity.require()?;
    let comment = db::find_comment(&state.db, id)
        .await?
        .ok_or(CommentsApiError::NotFound)?;
    ensure_author_or_admin(&user, &comment)?;
    let content = normalize_content(payload.content.as_deref(), state.config.max_content_len)?;

    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    db::record_edit(&state.db, id, &comment.content, reason, &user.user_id).await?;
    db::update_content(&state.db, id, &content, Utc::now()).await?;

    let updated = db::find_comment(&state.db, id)
        .await?
        .ok_or(CommentsApiError::NotFound)?;
    Ok(Json(ApiResponse::with_message(updated, "comment updated")))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, CommentsApiError> {
    let user = identity.require()?;
    let comment = db::find_comment(&state.db, id)
        .await?
        .ok_or(CommentsApiError::NotFound)?;
    ensure_author_or_admin(&user, &comment)?;

    if comment.author_id != user.user_id {
        // Admin removal leaves an audit trail; reports have no FK so this
        // record outlives the comment row.
        db::insert_report(
            &state.db,
            &db::NewReport {
                comment_id: id,
                reporter_id: user.user_id.clone(),
                reason: "removed by moderator".to_string(),
                description: None,
                status: marginalia_core::domain::comment::ReportStatus::Resolved,
            },
        )
        .await?;
    }
    db::delete_comment(&state.db, id).await?;
    Ok(Json(ApiResponse::message_only("comment deleted")))
}

fn ensure_author_or_admin(user: &AuthUser, comment: &Comment) -> Result<(), CommentsApiError> {
    if comment.author_id == user.user_id || user.role == AuthorRole::Admin {
        Ok(())
    } else {
        Err(CommentsApiError::Forbidden)
    }
}

fn normalize_content(value: Option<&str>, max_len: usize) -> Result<String, CommentsApiError> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.is_empty() {
        return Err(CommentsApiError::MissingContent);
    }
    if trimmed.chars().count() > max_len {
        return Err(CommentsApiError::ContentTooLong(max_len));
    }
    Ok(trimmed.to_string())
}

fn parse_target(
    kind: Option<&str>,
    id: Option<&str>,
) -> Result<Option<ContentRef>, CommentsApiError> {
    match (kind, id) {
        (None, None) => Ok(None),
        (Some(kind), Some(id)) => ContentRef::parse(kind, id)
            .map(Some)
            .map_err(|err| CommentsApiError::InvalidTarget(err.to_string())),
        _ => Err(CommentsApiError::MissingTarget),
    }
}

fn build_filter(
    user: Option<&AuthUser>,
    params: &ListParams,
) -> Result<CommentFilter, CommentsApiError> {
    let content = parse_target(params.content_kind.as_deref(), params.content_id.as_deref())?;
    let author_id = params
        .author_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            ModerationStatus::try_from(raw)
                .map_err(|err| CommentsApiError::InvalidStatus(err.to_string()))
        })
        .transpose()?;

    let is_moderator = user.is_some_and(|user| user.role.is_moderator());
    if is_moderator {
        Ok(CommentFilter {
            content,
            author_id,
            status,
            approved_only: false,
        })
    } else {
        // Non-moderators only ever see the approved slice.
        if status.is_some_and(|status| status != ModerationStatus::Approved) {
            return Err(CommentsApiError::StatusFilterForbidden);
        }
        Ok(CommentFilter {
            content,
            author_id,
            status: None,
            approved_only: true,
        })
    }
}

fn parse_sort(value: Option<&str>) -> Result<CommentSort, CommentsApiError> {
    match value.map(str::trim) {
        None | Some("") | Some("created_at") => Ok(CommentSort::CreatedAt),
        Some("updated_at") => Ok(CommentSort::UpdatedAt),
        Some("likes") => Ok(CommentSort::Likes),
        Some("helpful_votes") => Ok(CommentSort::HelpfulVotes),
        Some("total_votes") => Ok(CommentSort::TotalVotes),
        Some(other) => Err(CommentsApiError::InvalidSort(other.to_string())),
    }
}

fn parse_order(value: Option<&str>) -> Result<SortOrder, CommentsApiError> {
    match value.map(str::trim) {
        None | Some("") | Some("desc") => Ok(SortOrder::Desc),
        Some("asc") => Ok(SortOrder::Asc),
        Some(other) => Err(CommentsApiError::InvalidOrder(other.to_string())),
    }
}

fn resolve_page(value: Option<i64>) -> Result<i64, CommentsApiError> {
    match value {
        None => Ok(1),
        Some(page) if page >= 1 => Ok(page),
        Some(_) => Err(CommentsApiError::InvalidPage),
    }
}

fn resolve_limit(value: Option<i64>, default: i64, max: i64) -> i64 {
    match value {
        Some(limit) if limit > 0 => limit.min(max),
        _ => default,
    }
}

fn clamp_depth(value: Option<usize>, default: usize, max: usize) -> usize {
    value.unwrap_or(default).min(max)
}

impl IntoResponse for CommentsApiError {
    fn into_response(self) -> axum::response::Response {
        let this = match self {
            CommentsApiError::Auth(err) => return err.into_response(),
            other => other,
        };
        warn!(error = %this, "comments api error");
        let status = match &this {
            CommentsApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            CommentsApiError::MissingContent
            | CommentsApiError::ContentTooLong(_)
            | CommentsApiError::MissingTarget
            | CommentsApiError::InvalidTarget(_)
            | CommentsApiError::InvalidStatus(_)
            | CommentsApiError::InvalidSort(_)
            | CommentsApiError::InvalidOrder(_)
            | CommentsApiError::InvalidPage
            | CommentsApiError::ParentTargetMismatch => StatusCode::BAD_REQUEST,
            CommentsApiError::StatusFilterForbidden | CommentsApiError::Forbidden => {
                StatusCode::FORBIDDEN
            }
            CommentsApiError::ParentNotFound | CommentsApiError::NotFound => StatusCode::NOT_FOUND,
            CommentsApiError::Db(_) | CommentsApiError::Reports(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_response(status, &this.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        clamp_depth, normalize_content, parse_order, parse_sort, parse_target, resolve_limit,
        resolve_page, CommentsApiError,
    };
    use marginalia_infra::db::{CommentSort, SortOrder};

    #[test]
    fn normalize_content_rejects_empty() {
        assert!(normalize_content(None, 100).is_err());
        assert!(normalize_content(Some("   "), 100).is_err());
    }

    #[test]
    fn normalize_content_enforces_length() {
        let err = normalize_content(Some("abcdef"), 5).unwrap_err();
        assert!(matches!(err, CommentsApiError::ContentTooLong(5)));
        assert_eq!(normalize_content(Some(" hi "), 5).unwrap(), "hi");
    }

    #[test]
    fn parse_target_requires_both_halves() {
        assert!(parse_target(None, None).unwrap().is_none());
        assert!(parse_target(Some("course"), None).is_err());
        assert!(parse_target(None, Some("c-1")).is_err());
        let target = parse_target(Some("course"), Some("c-1")).unwrap().unwrap();
        assert_eq!(target.id(), "c-1");
    }

    #[test]
    fn parse_sort_covers_all_keys() {
        assert_eq!(parse_sort(None).unwrap(), CommentSort::CreatedAt);
        assert_eq!(parse_sort(Some("likes")).unwrap(), CommentSort::Likes);
        assert_eq!(
            parse_sort(Some("helpful_votes")).unwrap(),
            CommentSort::HelpfulVotes
        );
        assert_eq!(
            parse_sort(Some("total_votes")).unwrap(),
            CommentSort::TotalVotes
        );
        assert!(parse_sort(Some("reports")).is_err());
    }

    #[test]
    fn parse_order_defaults_to_desc() {
        assert_eq!(parse_order(None).unwrap(), SortOrder::Desc);
        assert_eq!(parse_order(Some("asc")).unwrap(), SortOrder::Asc);
        assert!(parse_order(Some("sideways")).is_err());
    }

    #[test]
    fn resolve_page_rejects_zero() {
        assert_eq!(resolve_page(None).unwrap(), 1);
        assert!(resolve_page(Some(0)).is_err());
    }

    #[test]
    fn resolve_limit_clamps_to_max() {
        assert_eq!(resolve_limit(None, 20, 100), 20);
        assert_eq!(resolve_limit(Some(500), 20, 100), 100);
        assert_eq!(resolve_limit(Some(-3), 20, 100), 20);
    }

    #[test]
    fn clamp_depth_applies_bounds() {
        assert_eq!(clamp_depth(None, 3, 10), 3);
        assert_eq!(clamp_depth(Some(50), 3, 10), 10);
        assert_eq!(clamp_depth(Some(1), 3, 10), 1);
    }
}
