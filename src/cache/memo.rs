//! Memoizing Cache Module
//!
//! Get-or-compute over a [`Store`]: a fresh record is returned (coerced to the
//! requested type), otherwise the fallback runs and its result is persisted.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::coerce::{self, CacheValue};
use crate::cache::file_store::FileStore;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::store::{Freshness, Store};
use crate::cache::value::{Structured, Value};
use crate::config::{Config, DEFAULT_TTL};
use crate::error::{CacheError, Result};

// == Cache ==
/// A memoizing cache over a [`Store`].
///
/// Every fallback is a `FnOnce() -> Result<T, E>` where `E: From<CacheError>`,
/// so the caller's own error type flows through unchanged and cache failures
/// convert into it.
///
/// ```no_run
/// use file_cache::{Cache, CacheError};
///
/// let cache = Cache::new("/tmp/ip-address-geolocation");
/// let ip = cache.get_string("ip", || Ok::<_, CacheError>("203.0.113.7".to_string()))?;
/// # Ok::<(), CacheError>(())
/// ```
#[derive(Debug)]
pub struct Cache<S = FileStore> {
    store: S,
    /// Validity window in seconds
    validity: u64,
    stats: Arc<StatsRecorder>,
}

impl Cache<FileStore> {
    // == Constructors ==
    /// Creates a file-backed cache under `root` with the default one hour validity.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_validity(root, DEFAULT_TTL)
    }

    /// Creates a file-backed cache under `root` with a custom validity window.
    pub fn with_validity(root: impl Into<PathBuf>, validity_secs: u64) -> Self {
        Self::with_store(FileStore::new(root), validity_secs)
    }

    /// Creates a file-backed cache from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_validity(config.cache_dir.clone(), config.default_ttl)
    }
}

impl<S: Store> Cache<S> {
    /// Creates a cache over any store.
    pub fn with_store(store: S, validity_secs: u64) -> Self {
        Self {
            store,
            validity: validity_secs,
            stats: Arc::new(StatsRecorder::default()),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the validity window in seconds.
    pub fn validity(&self) -> u64 {
        self.validity
    }

    /// Returns a view of this cache using a different validity window.
    ///
    /// The view shares the store and statistics with `self`.
    ///
    /// ```ignore
    /// let rate = cache.valid_for(60).get_float("rate", fetch_rate)?;
    /// ```
    pub fn valid_for(&self, validity_secs: u64) -> Cache<&S> {
        Cache {
            store: &self.store,
            validity: validity_secs,
            stats: Arc::clone(&self.stats),
        }
    }

    /// Returns a snapshot of lookup outcomes.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Removes the record for `name`, forcing the next lookup to recompute.
    pub fn invalidate(&self, name: &str) -> Result<()> {
        self.store.invalidate(name)?;
        debug!(key = name, "Cache entry invalidated");
        Ok(())
    }

    // == Get ==
    /// Returns the stored value for `name` as-is, or computes and stores it.
    pub fn get<F, E>(&self, name: &str, compute: F) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> std::result::Result<Value, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// Returns the stored value for `name` coerced into `T`, or computes and
    /// stores it. A freshly computed value is returned without coercion.
    pub fn get_as<T, F, E>(&self, name: &str, compute: F) -> std::result::Result<T, E>
    where
        T: CacheValue,
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<CacheError>,
    {
        if let Some(value) = self.lookup(name)? {
            return T::from_value(value).map_err(|e| E::from(e.at_key(name)));
        }

        let computed = compute()?;
        self.store.write(name, &computed.to_value()?)?;
        Ok(computed)
    }

    // == Typed Accessors ==
    /// Any stored scalar is converted to its string form.
    pub fn get_string<F, E>(&self, name: &str, compute: F) -> std::result::Result<String, E>
    where
        F: FnOnce() -> std::result::Result<String, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// Stored integers, integral floats and integer-looking strings are accepted.
    pub fn get_int<F, E>(&self, name: &str, compute: F) -> std::result::Result<i64, E>
    where
        F: FnOnce() -> std::result::Result<i64, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// Stored floats, integers and numeric strings are accepted.
    pub fn get_float<F, E>(&self, name: &str, compute: F) -> std::result::Result<f64, E>
    where
        F: FnOnce() -> std::result::Result<f64, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// Stored values are converted with the truth table in [`coerce::to_bool`].
    pub fn get_bool<F, E>(&self, name: &str, compute: F) -> std::result::Result<bool, E>
    where
        F: FnOnce() -> std::result::Result<bool, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// Stored date/times, Unix timestamps and date strings are accepted.
    pub fn get_date_time<F, E>(
        &self,
        name: &str,
        compute: F,
    ) -> std::result::Result<DateTime<Utc>, E>
    where
        F: FnOnce() -> std::result::Result<DateTime<Utc>, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// The stored value must be an instance of exactly `T`.
    pub fn get_instance<T, F, E>(&self, name: &str, compute: F) -> std::result::Result<T, E>
    where
        T: Structured,
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<CacheError>,
    {
        self.get_as(name, compute)
    }

    /// The stored value must be a list; elements are returned unconverted.
    pub fn get_array<F, E>(&self, name: &str, compute: F) -> std::result::Result<Vec<Value>, E>
    where
        F: FnOnce() -> std::result::Result<Vec<Value>, E>,
        E: From<CacheError>,
    {
        self.get_typed_array(name, compute)
    }

    /// The stored value must be a list, and every element must coerce to `T`.
    /// The first element that does not fails the call, naming its index.
    pub fn get_typed_array<T, F, E>(&self, name: &str, compute: F) -> std::result::Result<Vec<T>, E>
    where
        T: CacheValue,
        F: FnOnce() -> std::result::Result<Vec<T>, E>,
        E: From<CacheError>,
    {
        if let Some(value) = self.lookup(name)? {
            let items = coerce::to_list(value).map_err(|e| e.at_key(name))?;
            return items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_value(item).map_err(|e| E::from(e.at_index(name, index)))
                })
                .collect();
        }

        let computed = compute()?;
        let items = computed
            .iter()
            .map(CacheValue::to_value)
            .collect::<Result<Vec<_>>>()?;
        self.store.write(name, &Value::List(items))?;
        Ok(computed)
    }

    // == Lookup ==
    /// Returns the stored value if its record is fresh. Stale, missing and
    /// unreadable records all count as a miss.
    fn lookup(&self, name: &str) -> Result<Option<Value>> {
        match self.store.check_fresh(name, self.validity)? {
            Freshness::Fresh => match self.store.read(name) {
                Ok(value) => {
                    self.stats.record_hit();
                    debug!(key = name, kind = value.kind(), "Cache hit");
                    Ok(Some(value))
                }
                Err(err) => {
                    self.stats.record_unreadable();
                    self.stats.record_miss();
                    warn!(key = name, error = %err, "Fresh record unreadable, recomputing");
                    Ok(None)
                }
            },
            Freshness::Stale => {
                self.stats.record_miss();
                debug!(key = name, validity = self.validity, "Cache entry stale");
                Ok(None)
            }
            Freshness::NotFound => {
                self.stats.record_miss();
                debug!(key = name, "Cache miss");
                Ok(None)
            }
        }
    }
}
