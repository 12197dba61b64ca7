mod tags_error;

pub use tags_error::{TagsError, TagsErrorKind};
