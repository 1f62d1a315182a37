use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::comment::Comment;

#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
    pub total_replies: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentTree {
    pub total: usize,
    pub comments: Vec<CommentNode>,
}

/// Assembles the display tree from one flat query result, grouping on
/// parent_id instead of issuing a query per node. Top-level comments are
/// ordered newest first, replies oldest first.
///
/// `max_depth` bounds nesting: a node at the depth limit gets an empty
/// `replies` list, but `total_replies` always reports the full descendant
/// count of that node's subtree, so clients can render "N more replies".
/// A comment whose parent is absent from the input (e.g. the parent is
/// unapproved) is promoted to top level rather than dropped.
pub fn build_comment_tree(comments: &[Comment], max_depth: usize) -> CommentTree {
    let index: HashMap<Uuid, usize> = comments
        .iter()
        .enumerate()
        .map(|(idx, comment)| (comment.id, idx))
        .collect();

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (idx, comment) in comments.iter().enumerate() {
        match comment.parent_id.and_then(|parent| index.get(&parent)) {
            Some(&parent_idx) => children.entry(parent_idx).or_default().push(idx),
            None => roots.push(idx),
        }
    }

    roots.sort_by(|&a, &b| {
        comments[b]
            .created_at
            .cmp(&comments[a].created_at)
            .then_with(|| comments[b].id.cmp(&comments[a].id))
    });
    for child_idxs in children.values_mut() {
        child_idxs.sort_by(|&a, &b| {
            comments[a]
                .created_at
                .cmp(&comments[b].created_at)
                .then_with(|| comments[a].id.cmp(&comments[b].id))
        });
    }

    let nodes = roots
        .iter()
        .map(|&idx| build_node(idx, 0, max_depth, comments, &children))
        .collect();
    CommentTree {
        total: comments.len(),
        comments: nodes,
    }
}

fn build_node(
    idx: usize,
    depth: usize,
    max_depth: usize,
    comments: &[Comment],
    children: &HashMap<usize, Vec<usize>>,
) -> CommentNode {
    let total_replies = count_descendants(idx, children);
    let replies = if depth < max_depth {
        children
            .get(&idx)
            .map(|child_idxs| {
                child_idxs
                    .iter()
                    .map(|&child| build_node(child, depth + 1, max_depth, comments, children))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    CommentNode {
        comment: comments[idx].clone(),
        replies,
        total_replies,
        depth,
    }
}

fn count_descendants(idx: usize, children: &HashMap<usize, Vec<usize>>) -> usize {
    children.get(&idx).map_or(0, |child_idxs| {
        child_idxs
            .iter()
            .map(|&child| 1 + count_descendants(child, children))
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::build_comment_tree;
    use crate::domain::comment::{AuthorRole, Comment, ModerationStatus};
    use crate::types::ContentKind;

    fn comment(minute: u32, parent: Option<&Comment>) -> Comment {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap();
        let id = Uuid::new_v4();
        Comment {
            id,
            content: format!("comment at minute {minute}"),
            author_id: "user-1".to_string(),
            author_role: AuthorRole::Student,
            content_kind: ContentKind::Lesson,
            content_id: "lesson-1".to_string(),
            parent_id: parent.map(|p| p.id),
            root_id: parent.map(|p| p.root_id.unwrap_or(p.id)),
            likes: Vec::new(),
            dislikes: Vec::new(),
            helpful_votes: 0,
            moderation_status: ModerationStatus::Approved,
            is_approved: true,
            moderated_by: None,
            moderated_at: None,
            moderation_reason: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn nests_a_three_level_chain() {
        // a <- b <- c, max_depth 2: fully nested.
        let a = comment(0, None);
        let b = comment(1, Some(&a));
        let c = comment(2, Some(&b));
        let tree = build_comment_tree(&[a.clone(), b.clone(), c.clone()], 2);

        assert_eq!(tree.total, 3);
        assert_eq!(tree.comments.len(), 1);
        let root = &tree.comments[0];
        assert_eq!(root.comment.id, a.id);
        assert_eq!(root.depth, 0);
        assert_eq!(root.replies.len(), 1);
        assert_eq!(root.replies[0].comment.id, b.id);
        assert_eq!(root.replies[0].replies.len(), 1);
        assert_eq!(root.replies[0].replies[0].comment.id, c.id);
    }

    #[test]
    fn total_replies_is_subtree_scoped() {
        // a's subtree holds b and c; b's subtree holds only c.
        let a = comment(0, None);
        let b = comment(1, Some(&a));
        let c = comment(2, Some(&b));
        let tree = build_comment_tree(&[a, b, c], 2);

        let root = &tree.comments[0];
        assert_eq!(root.total_replies, 2);
        assert_eq!(root.replies[0].total_replies, 1);
        assert_eq!(root.replies[0].replies[0].total_replies, 0);
    }

    #[test]
    fn depth_limit_truncates_replies_but_keeps_counts() {
        let a = comment(0, None);
        let b = comment(1, Some(&a));
        let c = comment(2, Some(&b));
        let tree = build_comment_tree(&[a, b, c], 1);

        let root = &tree.comments[0];
        assert_eq!(root.replies.len(), 1);
        let level_one = &root.replies[0];
        assert!(level_one.replies.is_empty());
        assert_eq!(level_one.total_replies, 1);
    }

    #[test]
    fn roots_newest_first_replies_oldest_first() {
        let old_root = comment(0, None);
        let new_root = comment(10, None);
        let early_reply = comment(1, Some(&old_root));
        let late_reply = comment(5, Some(&old_root));
        let tree = build_comment_tree(
            &[old_root.clone(), new_root.clone(), late_reply.clone(), early_reply.clone()],
            3,
        );

        assert_eq!(tree.comments[0].comment.id, new_root.id);
        assert_eq!(tree.comments[1].comment.id, old_root.id);
        let replies = &tree.comments[1].replies;
        assert_eq!(replies[0].comment.id, early_reply.id);
        assert_eq!(replies[1].comment.id, late_reply.id);
    }

    #[test]
    fn orphaned_reply_is_promoted_to_top_level() {
        let a = comment(0, None);
        let b = comment(1, Some(&a));
        // a is filtered out (e.g. rejected); b still shows up.
        let tree = build_comment_tree(&[b.clone()], 3);
        assert_eq!(tree.comments.len(), 1);
        assert_eq!(tree.comments[0].comment.id, b.id);
    }
}
