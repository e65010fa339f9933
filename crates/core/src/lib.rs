pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod query;
pub mod time;
pub mod tree;

pub use error::{Result, TraceTreeError};
pub use model::span::{Span, SpanKind};
pub use model::tree::{Node, TraceTree, TreeStatus};
pub use tree::build_tree;
