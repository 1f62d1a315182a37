use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::comment::ModerationStatus;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Approve,
    Reject,
    Flag,
}

impl ModerationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::Reject => "reject",
            ModerationAction::Flag => "flag",
        }
    }
}

impl TryFrom<&str> for ModerationAction {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "approve" => Ok(ModerationAction::Approve),
            "reject" => Ok(ModerationAction::Reject),
            "flag" => Ok(ModerationAction::Flag),
            other => Err(CoreError::InvalidModerationStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a valid transition. `is_approved` is `None` when the action
/// leaves the approval bit untouched (flagging).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub status: ModerationStatus,
    pub is_approved: Option<bool>,
}

/// State machine: pending -> {approved, rejected, flagged};
/// flagged -> {approved, rejected}; approved and rejected are terminal.
/// Reject and flag require a non-empty reason.
pub fn apply_action(
    current: ModerationStatus,
    action: ModerationAction,
    reason: Option<&str>,
) -> Result<ModerationOutcome, CoreError> {
    let has_reason = reason.map(str::trim).is_some_and(|value| !value.is_empty());
    if matches!(action, ModerationAction::Reject | ModerationAction::Flag) && !has_reason {
        return Err(CoreError::MissingReason(action.as_str()));
    }

    let allowed = match current {
        ModerationStatus::Pending => true,
        ModerationStatus::Flagged => !matches!(action, ModerationAction::Flag),
        ModerationStatus::Approved | ModerationStatus::Rejected => false,
    };
    if !allowed {
        return Err(CoreError::InvalidTransition {
            from: current.as_str(),
            action: action.as_str(),
        });
    }

    Ok(match action {
        ModerationAction::Approve => ModerationOutcome {
            status: ModerationStatus::Approved,
            is_approved: Some(true),
        },
        ModerationAction::Reject => ModerationOutcome {
            status: ModerationStatus::Rejected,
            is_approved: Some(false),
        },
        ModerationAction::Flag => ModerationOutcome {
            status: ModerationStatus::Flagged,
            is_approved: None,
        },
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItemResult {
    pub id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

pub fn summarize(results: &[BulkItemResult]) -> BulkSummary {
    let successful = results.iter().filter(|item| item.success).count();
    BulkSummary {
        total: results.len(),
        successful,
        failed: results.len() - successful,
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{apply_action, summarize, BulkItemResult, ModerationAction};
    use crate::domain::comment::ModerationStatus;
    use crate::error::CoreError;

    #[test]
    fn approve_from_pending_sets_approved() {
        let outcome =
            apply_action(ModerationStatus::Pending, ModerationAction::Approve, None).unwrap();
        assert_eq!(outcome.status, ModerationStatus::Approved);
        assert_eq!(outcome.is_approved, Some(true));
    }

    #[test]
    fn reject_requires_reason() {
        let err = apply_action(ModerationStatus::Pending, ModerationAction::Reject, None)
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingReason("reject")));
        let err = apply_action(
            ModerationStatus::Pending,
            ModerationAction::Reject,
            Some("   "),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingReason("reject")));
    }

    #[test]
    fn reject_with_reason_clears_approval() {
        let outcome = apply_action(
            ModerationStatus::Flagged,
            ModerationAction::Reject,
            Some("spam"),
        )
        .unwrap();
        assert_eq!(outcome.status, ModerationStatus::Rejected);
        assert_eq!(outcome.is_approved, Some(false));
    }

    #[test]
    fn flag_leaves_approval_untouched() {
        let outcome = apply_action(
            ModerationStatus::Pending,
            ModerationAction::Flag,
            Some("needs review"),
        )
        .unwrap();
        assert_eq!(outcome.status, ModerationStatus::Flagged);
        assert_eq!(outcome.is_approved, None);
    }

    #[test]
    fn terminal_states_reject_all_actions() {
        for current in [ModerationStatus::Approved, ModerationStatus::Rejected] {
            for action in [
                ModerationAction::Approve,
                ModerationAction::Reject,
                ModerationAction::Flag,
            ] {
                assert!(apply_action(current, action, Some("r")).is_err());
            }
        }
    }

    #[test]
    fn flagged_cannot_be_reflagged() {
        let err = apply_action(
            ModerationStatus::Flagged,
            ModerationAction::Flag,
            Some("again"),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn summary_counts_add_up() {
        let results = vec![
            BulkItemResult {
                id: Uuid::new_v4(),
                success: true,
                error: None,
            },
            BulkItemResult {
                id: Uuid::new_v4(),
                success: false,
                error: Some("comment not found".to_string()),
            },
            BulkItemResult {
                id: Uuid::new_v4(),
                success: true,
                error: None,
            },
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful + summary.failed, summary.total);
        assert_eq!(summary.failed, 1);
    }
}
