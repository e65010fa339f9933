pub mod query;
pub mod retention;
pub mod store;
pub mod write;

pub use store::{StoreLimits, TraceStore};
