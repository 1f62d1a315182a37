use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use thiserror::Error;
use uuid::Uuid;

use marginalia_core::domain::comment::{AuthorRole, Comment, EditRecord, ModerationStatus};
use marginalia_core::types::{ContentKind, ContentRef};

#[derive(Debug, Error)]
pub enum CommentsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt {column} value: {value}")]
    Corrupt {
        column: &'static str,
        value: String,
    },
}

// Shared select list: the comment row plus its materialized vote sets and
// the count aliases the sort keys order by.
const COMMENT_COLUMNS: &str = r#"
    c.id,
    c.content,
    c.author_id,
    c.author_role,
    c.content_kind,
    c.content_id,
    c.parent_id,
    c.root_id,
    c.moderation_status,
    c.is_approved,
    c.moderated_by,
    c.moderated_at,
    c.moderation_reason,
    c.created_at,
    c.updated_at,
    ARRAY(
        SELECT v.user_id FROM comment_votes v
        WHERE v.comment_id = c.id AND v.vote = 'like'
        ORDER BY v.created_at
    ) AS likes,
    ARRAY(
        SELECT v.user_id FROM comment_votes v
        WHERE v.comment_id = c.id AND v.vote = 'dislike'
        ORDER BY v.created_at
    ) AS dislikes,
    (SELECT COUNT(*) FROM comment_helpful_votes h WHERE h.comment_id = c.id) AS helpful_votes,
    (SELECT COUNT(*) FROM comment_votes v WHERE v.comment_id = c.id AND v.vote = 'like') AS like_count,
    (SELECT COUNT(*) FROM comment_votes v WHERE v.comment_id = c.id) AS total_votes
"#;

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub content: Option<ContentRef>,
    pub author_id: Option<String>,
    pub status: Option<ModerationStatus>,
    pub approved_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    CreatedAt,
    UpdatedAt,
    Likes,
    HelpfulVotes,
    TotalVotes,
}

impl CommentSort {
    fn sql_column(self) -> &'static str {
        match self {
            CommentSort::CreatedAt => "c.created_at",
            CommentSort::UpdatedAt => "c.updated_at",
            CommentSort::Likes => "like_count",
            CommentSort::HelpfulVotes => "helpful_votes",
            CommentSort::TotalVotes => "total_votes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn sql_keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub comment: Comment,
    pub pending_reports: i64,
}

pub async fn insert_comment(pool: &PgPool, comment: &Comment) -> Result<(), CommentsRepoError> {
    sqlx::query(
        r#"
        INSERT INTO comments (
            id,
            content,
            author_id,
            author_role,
            content_kind,
            content_id,
            parent_id,
            root_id,
            moderation_status,
            is_approved,
            created_at,
            updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(comment.id)
    .bind(&comment.content)
    .bind(&comment.author_id)
    .bind(comment.author_role.as_str())
    .bind(comment.content_kind.as_str())
    .bind(&comment.content_id)
    .bind(comment.parent_id)
    .bind(comment.root_id)
    .bind(comment.moderation_status.as_str())
    .bind(comment.is_approved)
    .bind(comment.created_at)
    .bind(comment.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_comment(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<Comment>, CommentsRepoError> {
    let row = sqlx::query(&format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(map_comment).transpose()
}

pub async fn list_comments(
    pool: &PgPool,
    filter: &CommentFilter,
    sort: CommentSort,
    order: SortOrder,
    limit: i64,
    offset: i64,
) -> Result<Vec<Comment>, CommentsRepoError> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COMMENT_COLUMNS} FROM comments c WHERE TRUE"
    ));
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY ");
    builder.push(sort.sql_column());
    builder.push(" ");
    builder.push(order.sql_keyword());
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    rows.into_iter().map(map_comment).collect()
}

pub async fn count_comments(
    pool: &PgPool,
    filter: &CommentFilter,
) -> Result<i64, CommentsRepoError> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM comments c WHERE TRUE");
    push_filters(&mut builder, filter);
    let row = builder.build().fetch_one(pool).await?;
    Ok(row.try_get("count")?)
}

/// All approved comments for one content target, flat; the caller assembles
/// the tree in memory.
pub async fn list_thread(
    pool: &PgPool,
    content: &ContentRef,
) -> Result<Vec<Comment>, CommentsRepoError> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {COMMENT_COLUMNS}
        FROM comments c
        WHERE c.content_kind = $1
          AND c.content_id = $2
          AND c.is_approved = TRUE
          AND c.moderation_status = 'approved'
        ORDER BY c.created_at ASC
        "#
    ))
    .bind(content.kind().as_str())
    .bind(content.id())
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(map_comment).collect()
}

pub async fn update_content(
    pool: &PgPool,
    id: Uuid,
    content: &str,
    now: DateTime<Utc>,
) -> Result<u64, CommentsRepoError> {
    let result = sqlx::query(
        r#"
        UPDATE comments
        SET content = $2, updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(content)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn record_edit(
    pool: &PgPool,
    comment_id: Uuid,
    previous_content: &str,
    reason: Option<&str>,
    edited_by: &str,
) -> Result<(), CommentsRepoError> {
    sqlx::query(
        r#"
        INSERT INTO comment_edits (comment_id, previous_content, reason, edited_by)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(comment_id)
    .bind(previous_content)
    .bind(reason)
    .bind(edited_by)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_edits(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Vec<EditRecord>, CommentsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT id, comment_id, previous_content, reason, edited_by, edited_at
        FROM comment_edits
        WHERE comment_id = $1
        ORDER BY edited_at ASC
        "#,
    )
    .bind(comment_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| {
            Ok(EditRecord {
                id: row.try_get("id")?,
                comment_id: row.try_get("comment_id")?,
                previous_content: row.try_get("previous_content")?,
                reason: row.try_get("reason")?,
                edited_by: row.try_get("edited_by")?,
                edited_at: row.try_get("edited_at")?,
            })
        })
        .collect()
}

pub async fn delete_comment(pool: &PgPool, id: Uuid) -> Result<u64, CommentsRepoError> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Applies a moderation outcome. `is_approved = None` leaves the approval
/// bit as-is (flagging).
pub async fn set_moderation(
    pool: &PgPool,
    id: Uuid,
    status: ModerationStatus,
    is_approved: Option<bool>,
    moderated_by: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<u64, CommentsRepoError> {
    let result = sqlx::query(
        r#"
        UPDATE comments
        SET moderation_status = $2,
            is_approved = COALESCE($3, is_approved),
            moderated_by = $4,
            moderated_at = $5,
            moderation_reason = $6,
            updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(is_approved)
    .bind(moderated_by)
    .bind(now)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_moderation_queue(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<QueueEntry>, CommentsRepoError> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {COMMENT_COLUMNS},
            (SELECT COUNT(*) FROM comment_reports r
             WHERE r.comment_id = c.id AND r.status = 'pending') AS pending_reports
        FROM comments c
        WHERE c.moderation_status IN ('pending', 'flagged') OR c.is_approved = FALSE
        ORDER BY c.created_at ASC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| {
            let pending_reports: i64 = row.try_get("pending_reports")?;
            Ok(QueueEntry {
                comment: map_comment(row)?,
                pending_reports,
            })
        })
        .collect()
}

pub async fn count_moderation_queue(pool: &PgPool) -> Result<i64, CommentsRepoError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM comments c
        WHERE c.moderation_status IN ('pending', 'flagged') OR c.is_approved = FALSE
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("count")?)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &CommentFilter) {
    if let Some(content) = &filter.content {
        builder.push(" AND c.content_kind = ");
        builder.push_bind(content.kind().as_str());
        builder.push(" AND c.content_id = ");
        builder.push_bind(content.id().to_string());
    }
    if let Some(author_id) = &filter.author_id {
        builder.push(" AND c.author_id = ");
        builder.push_bind(author_id.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND c.moderation_status = ");
        builder.push_bind(status.as_str());
    }
    if filter.approved_only {
        builder.push(" AND c.is_approved = TRUE AND c.moderation_status = 'approved'");
    }
}

fn map_comment(row: sqlx::postgres::PgRow) -> Result<Comment, CommentsRepoError> {
    let author_role: String = row.try_get("author_role")?;
    let author_role = AuthorRole::try_from(author_role.as_str()).map_err(|_| {
        CommentsRepoError::Corrupt {
            column: "author_role",
            value: author_role,
        }
    })?;
    let content_kind: String = row.try_get("content_kind")?;
    let content_kind = ContentKind::try_from(content_kind.as_str()).map_err(|_| {
        CommentsRepoError::Corrupt {
            column: "content_kind",
            value: content_kind,
        }
    })?;
    let moderation_status: String = row.try_get("moderation_status")?;
    let moderation_status =
        ModerationStatus::try_from(moderation_status.as_str()).map_err(|_| {
            CommentsRepoError::Corrupt {
                column: "moderation_status",
                value: moderation_status,
            }
        })?;

    Ok(Comment {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        author_role,
        content_kind,
        content_id: row.try_get("content_id")?,
        parent_id: row.try_get("parent_id")?,
        root_id: row.try_get("root_id")?,
        likes: row.try_get("likes")?,
        dislikes: row.try_get("dislikes")?,
        helpful_votes: row.try_get("helpful_votes")?,
        moderation_status,
        is_approved: row.try_get("is_approved")?,
        moderated_by: row.try_get("moderated_by")?,
        moderated_at: row.try_get("moderated_at")?,
        moderation_reason: row.try_get("moderation_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
