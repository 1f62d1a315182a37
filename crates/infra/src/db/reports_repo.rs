use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use marginalia_core::domain::comment::{Report, ReportStatus};

#[derive(Debug, Error)]
pub enum ReportsRepoError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt report status value: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub comment_id: Uuid,
    pub reporter_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
}

pub async fn insert_report(pool: &PgPool, report: &NewReport) -> Result<(), ReportsRepoError> {
    sqlx::query(
        r#"
        INSERT INTO comment_reports (comment_id, reporter_id, reason, description, status)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(report.comment_id)
    .bind(&report.reporter_id)
    .bind(&report.reason)
    .bind(report.description.as_deref())
    .bind(report.status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_reports(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Vec<Report>, ReportsRepoError> {
    let rows = sqlx::query(
        r#"
        SELECT id, comment_id, reporter_id, reason, description, status, created_at
        FROM comment_reports
        WHERE comment_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(comment_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| {
            let status: String = row.try_get("status")?;
            let status = ReportStatus::try_from(status.as_str())
                .map_err(|_| ReportsRepoError::Corrupt(status))?;
            Ok(Report {
                id: row.try_get("id")?,
                comment_id: row.try_get("comment_id")?,
                reporter_id: row.try_get("reporter_id")?,
                reason: row.try_get("reason")?,
                description: row.try_get("description")?,
                status,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Moves all of a comment's pending reports to a settled status.
pub async fn settle_reports(
    pool: &PgPool,
    comment_id: Uuid,
    to: ReportStatus,
) -> Result<u64, ReportsRepoError> {
    let result = sqlx::query(
        r#"
        UPDATE comment_reports
        SET status = $2
        WHERE comment_id = $1 AND status = 'pending'
        "#,
    )
    .bind(comment_id)
    .bind(to.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
