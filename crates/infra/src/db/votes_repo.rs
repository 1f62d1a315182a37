use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use marginalia_core::domain::vote::{decide_toggle, VoteDecision, VoteKind};

#[derive(Debug, Error)]
pub enum VotesRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt vote value: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, Copy)]
pub struct VoteState {
    pub vote: Option<VoteKind>,
    pub likes: i64,
    pub dislikes: i64,
}

/// Toggles a like/dislike inside one transaction: the existing row is read
/// locked, the toggle decision applied, and the fresh counts returned. The
/// (comment_id, user_id) primary key keeps the two sets mutually exclusive.
pub async fn toggle_vote(
    pool: &PgPool,
    comment_id: Uuid,
    user_id: &str,
    requested: VoteKind,
) -> Result<VoteState, VotesRepoError> {
    let mut tx = pool.begin().await?;

    let existing: Option<String> = sqlx::query_scalar(
        r#"
        SELECT vote
        FROM comment_votes
        WHERE comment_id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;
    let existing = existing
        .map(|raw| VoteKind::try_from(raw.as_str()).map_err(|_| VotesRepoError::Corrupt(raw)))
        .transpose()?;

    let vote = match decide_toggle(existing, requested) {
        VoteDecision::Remove => {
            sqlx::query(
                r#"
                DELETE FROM comment_votes
                WHERE comment_id = $1 AND user_id = $2
                "#,
            )
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            None
        }
        VoteDecision::Set(kind) => {
            sqlx::query(
                r#"
                INSERT INTO comment_votes (comment_id, user_id, vote)
                VALUES ($1, $2, $3)
                ON CONFLICT (comment_id, user_id)
                DO UPDATE SET vote = EXCLUDED.vote, created_at = now()
                "#,
            )
            .bind(comment_id)
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await?;
            Some(kind)
        }
    };

    let row = sqlx::query(
        r#"
        SELECT COUNT(*) FILTER (WHERE vote = 'like') AS likes,
               COUNT(*) FILTER (WHERE vote = 'dislike') AS dislikes
        FROM comment_votes
        WHERE comment_id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_one(&mut *tx)
    .await?;
    let likes: i64 = row.try_get("likes")?;
    let dislikes: i64 = row.try_get("dislikes")?;

    tx.commit().await?;
    Ok(VoteState {
        vote,
        likes,
        dislikes,
    })
}

/// Records a helpful vote once per user; repeats are no-ops. Returns whether
/// this call added the vote.
pub async fn mark_helpful(
    pool: &PgPool,
    comment_id: Uuid,
    user_id: &str,
) -> Result<bool, VotesRepoError> {
    let result = sqlx::query(
        r#"
        INSERT INTO comment_helpful_votes (comment_id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (comment_id, user_id) DO NOTHING
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_helpful(pool: &PgPool, comment_id: Uuid) -> Result<i64, VotesRepoError> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS count
        FROM comment_helpful_votes
        WHERE comment_id = $1
        "#,
    )
    .bind(comment_id)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("count")?)
}
