pub mod content_ref;

pub use content_ref::{ContentKind, ContentRef};
