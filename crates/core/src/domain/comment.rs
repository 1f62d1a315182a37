use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::ContentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorRole {
    Student,
    Teacher,
    Admin,
}

impl AuthorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthorRole::Student => "student",
            AuthorRole::Teacher => "teacher",
            AuthorRole::Admin => "admin",
        }
    }

    /// Teachers and admins may moderate; students may not.
    pub fn is_moderator(self) -> bool {
        matches!(self, AuthorRole::Teacher | AuthorRole::Admin)
    }
}

impl TryFrom<&str> for AuthorRole {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "student" => Ok(AuthorRole::Student),
            "teacher" => Ok(AuthorRole::Teacher),
            "admin" => Ok(AuthorRole::Admin),
            other => Err(CoreError::InvalidAuthorRole(other.to_string())),
        }
    }
}

impl fmt::Display for AuthorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
            ModerationStatus::Flagged => "flagged",
        }
    }
}

impl TryFrom<&str> for ModerationStatus {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "rejected" => Ok(ModerationStatus::Rejected),
            "flagged" => Ok(ModerationStatus::Flagged),
            other => Err(CoreError::InvalidModerationStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }
}

impl TryFrom<&str> for ReportStatus {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            other => Err(CoreError::InvalidReportStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub author_role: AuthorRole,
    pub content_kind: ContentKind,
    pub content_id: String,
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub helpful_votes: i64,
    pub moderation_status: ModerationStatus,
    pub is_approved: bool,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub comment_id: Uuid,
    pub reporter_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditRecord {
    pub id: i64,
    pub comment_id: Uuid,
    pub previous_content: String,
    pub reason: Option<String>,
    pub edited_by: String,
    pub edited_at: DateTime<Utc>,
}

/// Root inheritance rule for replies: a reply chains to its parent's root,
/// or to the parent itself when the parent is top-level. Keeps root_id
/// always pointing at a comment with no parent.
pub fn resolve_root_id(parent_id: Uuid, parent_root_id: Option<Uuid>) -> Uuid {
    parent_root_id.unwrap_or(parent_id)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{resolve_root_id, AuthorRole, ModerationStatus};

    #[test]
    fn resolve_root_id_uses_parent_for_top_level_parent() {
        let parent = Uuid::new_v4();
        assert_eq!(resolve_root_id(parent, None), parent);
    }

    #[test]
    fn resolve_root_id_is_transitive_across_levels() {
        // a (top-level) <- b <- c: both b and c resolve to a.
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let b_root = resolve_root_id(a, None);
        let c_root = resolve_root_id(b, Some(b_root));
        assert_eq!(b_root, a);
        assert_eq!(c_root, a);
    }

    #[test]
    fn author_role_parses_and_prints() {
        assert_eq!(AuthorRole::try_from("teacher").unwrap(), AuthorRole::Teacher);
        assert_eq!(AuthorRole::Admin.as_str(), "admin");
        assert!(AuthorRole::try_from("guest").is_err());
    }

    #[test]
    fn moderator_roles() {
        assert!(!AuthorRole::Student.is_moderator());
        assert!(AuthorRole::Teacher.is_moderator());
        assert!(AuthorRole::Admin.is_moderator());
    }

    #[test]
    fn moderation_status_round_trips() {
        for raw in ["pending", "approved", "rejected", "flagged"] {
            let status = ModerationStatus::try_from(raw).unwrap();
            assert_eq!(status.as_str(), raw);
        }
        assert!(ModerationStatus::try_from("hidden").is_err());
    }
}
