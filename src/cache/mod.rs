//! Cache Module
//!
//! Provides a memoizing cache with TTL validity over a persistent store,
//! plus typed accessors that coerce stored values into the requested kind.

mod coerce;
mod entry;
mod file_store;
mod memo;
mod memory_store;
mod stats;
mod store;
mod value;


// Re-export public types
pub use coerce::{
    parse_date_time, to_bool, to_date_time, to_float, to_instance, to_int, to_list, to_string,
    CacheValue, CoercionError, CoercionResult, FALSE_STRINGS,
};
pub use entry::{decode, encode, is_fresh, FORMAT_VERSION, MAGIC};
pub use file_store::FileStore;
pub use memo::Cache;
pub use memory_store::MemoryStore;
pub use stats::CacheStats;
pub use store::{validate_name, Freshness, Store};
pub use value::{Structured, Value};
