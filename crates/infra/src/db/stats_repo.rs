use sqlx::{PgPool, Row};
use thiserror::Error;

use marginalia_core::types::ContentKind;

#[derive(Debug, Error)]
pub enum StatsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub content_kind: Option<ContentKind>,
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CommentTotals {
    pub total_comments: i64,
    pub total_replies: i64,
    pub pending_moderation: i64,
    pub flagged: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct VoteTotals {
    pub likes: i64,
    pub dislikes: i64,
}

pub async fn fetch_comment_totals(
    pool: &PgPool,
    filter: &StatsFilter,
) -> Result<CommentTotals, StatsRepoError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_comments,
               COUNT(*) FILTER (WHERE c.parent_id IS NOT NULL) AS total_replies,
               COUNT(*) FILTER (WHERE c.moderation_status = 'pending') AS pending_moderation,
               COUNT(*) FILTER (WHERE c.moderation_status = 'flagged') AS flagged
        FROM comments c
        WHERE ($1::text IS NULL OR c.content_kind = $1)
          AND ($2::text IS NULL OR c.content_id = $2)
        "#,
    )
    .bind(filter.content_kind.map(ContentKind::as_str))
    .bind(filter.content_id.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(CommentTotals {
        total_comments: row.try_get("total_comments")?,
        total_replies: row.try_get("total_replies")?,
        pending_moderation: row.try_get("pending_moderation")?,
        flagged: row.try_get("flagged")?,
    })
}

pub async fn fetch_vote_totals(
    pool: &PgPool,
    filter: &StatsFilter,
) -> Result<VoteTotals, StatsRepoError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) FILTER (WHERE v.vote = 'like') AS likes,
               COUNT(*) FILTER (WHERE v.vote = 'dislike') AS dislikes
        FROM comment_votes v
        JOIN comments c ON c.id = v.comment_id
        WHERE ($1::text IS NULL OR c.content_kind = $1)
          AND ($2::text IS NULL OR c.content_id = $2)
        "#,
    )
    .bind(filter.content_kind.map(ContentKind::as_str))
    .bind(filter.content_id.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(VoteTotals {
        likes: row.try_get("likes")?,
        dislikes: row.try_get("dislikes")?,
    })
}
