use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const MAX_CONTENT_ID_LEN: usize = 128;

/// The kind of LMS content a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Course,
    Lesson,
    Discussion,
    Assignment,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Course => "course",
            ContentKind::Lesson => "lesson",
            ContentKind::Discussion => "discussion",
            ContentKind::Assignment => "assignment",
        }
    }
}

impl TryFrom<&str> for ContentKind {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "course" => Ok(ContentKind::Course),
            "lesson" => Ok(ContentKind::Lesson),
            "discussion" => Ok(ContentKind::Discussion),
            "assignment" => Ok(ContentKind::Assignment),
            other => Err(CoreError::InvalidContentKind(other.to_string())),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated reference to a piece of commentable content: the kind plus
/// the owning module's opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef {
    kind: ContentKind,
    id: String,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: &str) -> Result<Self, CoreError> {
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_CONTENT_ID_LEN {
            return Err(CoreError::InvalidContentId(trimmed.to_string()));
        }
        if trimmed.chars().any(|ch| ch.is_whitespace()) {
            return Err(CoreError::InvalidContentId(trimmed.to_string()));
        }
        Ok(ContentRef {
            kind,
            id: trimmed.to_string(),
        })
    }

    pub fn parse(kind: &str, id: &str) -> Result<Self, CoreError> {
        Self::new(ContentKind::try_from(kind)?, id)
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentKind, ContentRef};

    #[test]
    fn parse_accepts_known_kinds() {
        for kind in ["course", "lesson", "discussion", "assignment"] {
            assert!(ContentRef::parse(kind, "abc-123").is_ok(), "kind {kind}");
        }
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        assert!(ContentRef::parse("quiz", "abc-123").is_err());
    }

    #[test]
    fn new_rejects_empty_and_whitespace_ids() {
        assert!(ContentRef::new(ContentKind::Course, "").is_err());
        assert!(ContentRef::new(ContentKind::Course, "   ").is_err());
        assert!(ContentRef::new(ContentKind::Course, "a b").is_err());
    }

    #[test]
    fn new_trims_id() {
        let content = ContentRef::new(ContentKind::Lesson, " lesson-9 ").unwrap();
        assert_eq!(content.id(), "lesson-9");
        assert_eq!(content.to_string(), "lesson/lesson-9");
    }
}
