pub mod comments_repo;
pub mod migrations;
pub mod pool;
pub mod reports_repo;
pub mod stats_repo;
pub mod votes_repo;

pub use comments_repo::{
    count_comments, count_moderation_queue, delete_comment, find_comment, insert_comment,
    list_comments, list_edits, list_moderation_queue, list_thread, record_edit, set_moderation,
    update_content, CommentFilter, CommentSort, CommentsRepoError, QueueEntry, SortOrder,
};
pub use migrations::run_migrations;
pub use pool::{connect_lazy, DbPool, DbPoolError};
pub use reports_repo::{
    insert_report, list_reports, settle_reports, NewReport, ReportsRepoError,
};
pub use stats_repo::{
    fetch_comment_totals, fetch_vote_totals, CommentTotals, StatsFilter, StatsRepoError,
    VoteTotals,
};
pub use votes_repo::{count_helpful, mark_helpful, toggle_vote, VoteState, VotesRepoError};
