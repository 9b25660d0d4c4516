//! Custom extractors for kanban API routes.

mod json;
mod path_id;

pub use json::ApiJson;
pub use path_id::{PathContainerKey, PathId, PathIdError, PathIds};
