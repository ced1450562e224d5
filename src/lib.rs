//! File Cache - A memoizing cache persisted to disk
//!
//! Returns a stored result while it is inside its validity window, otherwise
//! runs a fallback computation, persists the result and returns it.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    Cache, CacheStats, CacheValue, FileStore, Freshness, MemoryStore, Store, Structured, Value,
};
pub use config::Config;
pub use error::{CacheError, Result};
