use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
        }
    }
}

impl TryFrom<&str> for VoteKind {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "like" => Ok(VoteKind::Like),
            "dislike" => Ok(VoteKind::Dislike),
            other => Err(CoreError::InvalidVoteKind(other.to_string())),
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDecision {
    /// Store this vote, replacing any opposite vote by the same user.
    Set(VoteKind),
    /// The user already holds this vote; toggle it off.
    Remove,
}

/// Toggle semantics: repeating a vote removes it, switching sides replaces
/// it. A single (comment, user) slot makes likes and dislikes mutually
/// exclusive.
pub fn decide_toggle(existing: Option<VoteKind>, requested: VoteKind) -> VoteDecision {
    match existing {
        Some(current) if current == requested => VoteDecision::Remove,
        _ => VoteDecision::Set(requested),
    }
}

#[cfg(test)]
mod tests {
    use super::{decide_toggle, VoteDecision, VoteKind};

    #[test]
    fn first_toggle_sets_vote() {
        assert_eq!(
            decide_toggle(None, VoteKind::Like),
            VoteDecision::Set(VoteKind::Like)
        );
    }

    #[test]
    fn repeat_toggle_removes_vote() {
        assert_eq!(
            decide_toggle(Some(VoteKind::Like), VoteKind::Like),
            VoteDecision::Remove
        );
        assert_eq!(
            decide_toggle(Some(VoteKind::Dislike), VoteKind::Dislike),
            VoteDecision::Remove
        );
    }

    #[test]
    fn switching_sides_replaces_vote() {
        assert_eq!(
            decide_toggle(Some(VoteKind::Like), VoteKind::Dislike),
            VoteDecision::Set(VoteKind::Dislike)
        );
    }

    #[test]
    fn double_toggle_restores_original_state() {
        // like twice lands back on "no vote".
        let after_first = match decide_toggle(None, VoteKind::Like) {
            VoteDecision::Set(kind) => Some(kind),
            VoteDecision::Remove => None,
        };
        let after_second = match decide_toggle(after_first, VoteKind::Like) {
            VoteDecision::Set(kind) => Some(kind),
            VoteDecision::Remove => None,
        };
        assert_eq!(after_second, None);
    }
}
