//! API request and response types.

mod container;
mod item;
mod project;

pub use container::*;
pub use item::*;
pub use project::*;
