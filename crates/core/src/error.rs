use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid content kind: {0}")]
    InvalidContentKind(String),
    #[error("invalid content id: {0}")]
    InvalidContentId(String),
    #[error("invalid author role: {0}")]
    InvalidAuthorRole(String),
    #[error("invalid moderation status: {0}")]
    InvalidModerationStatus(String),
    #[error("invalid report status: {0}")]
    InvalidReportStatus(String),
    #[error("invalid vote kind: {0}")]
    InvalidVoteKind(String),
    #[error("cannot {action} a comment in state {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error("a reason is required to {0} a comment")]
    MissingReason(&'static str),
}
