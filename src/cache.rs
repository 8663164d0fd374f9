//! Generic dual-tier cache: an optional hot in-memory tier in front of an
//! authoritative durable tier. Instantiated once for registry metadata
//! payloads and once for vulnerability lists (see [`crate::registry`] and
//! [`crate::vulnadapter`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SLIDING_TTL: Duration = Duration::from_secs(60 * 60);
const ABSOLUTE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// The collaborator a `DualTierCache` serializes access to. Implementations
/// own whatever storage medium they like; the cache is responsible for the
/// mutex discipline described in the concurrency model, not the store.
pub trait DurableStore: Send + Sync {
    fn get(&self, name: &str, version_key: &str) -> crate::error::Result<Option<Vec<u8>>>;
    fn upsert(&self, name: &str, version_key: &str, bytes: &[u8]) -> crate::error::Result<()>;
    fn iter_all(&self) -> crate::error::Result<Vec<((String, String), Vec<u8>)>>;
}

#[derive(Serialize, Deserialize)]
struct Envelope<V> {
    value: V,
    updated_at: String,
}

struct MemEntry<V> {
    value: V,
    inserted_at: Instant,
    last_accessed: Instant,
}

impl<V> MemEntry<V> {
    fn fresh(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            inserted_at: now,
            last_accessed: now,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) > ABSOLUTE_TTL
            || now.duration_since(self.last_accessed) > SLIDING_TTL
    }
}

/// Key = `(package_name, version_key)`. `version_key` is deliberately a
/// caller-chosen string: the registry adapter tags entries by requested
/// range string, the vulnerability adapter by concrete version.
pub struct DualTierCache<V, D: DurableStore> {
    memory: Option<RwLock<HashMap<(String, String), MemEntry<V>>>>,
    durable: Mutex<D>,
}

impl<V, D> DualTierCache<V, D>
where
    V: Clone + Serialize + DeserializeOwned,
    D: DurableStore,
{
    pub fn new(durable: D, memory_enabled: bool) -> Self {
        Self {
            memory: memory_enabled.then(|| RwLock::new(HashMap::new())),
            durable: Mutex::new(durable),
        }
    }

    /// Lookup, checking memory first and falling back to durable. A
    /// durable hit back-fills memory. Durable errors and deserialization
    /// failures are logged and surfaced as a miss; they never propagate.
    pub fn get(&self, name: &str, version_key: &str) -> Option<V> {
        let key = (name.to_string(), version_key.to_string());

        if let Some(mem) = &self.memory {
            let now = Instant::now();
            if let Ok(guard) = mem.read() {
                if let Some(entry) = guard.get(&key) {
                    if !entry.is_expired(now) {
                        let value = entry.value.clone();
                        drop(guard);
                        if let Ok(mut w) = mem.write() {
                            if let Some(e) = w.get_mut(&key) {
                                e.last_accessed = now;
                            }
                        }
                        return Some(value);
                    }
                }
            }
        }

        let bytes = {
            let guard = match self.durable.lock() {
                Ok(g) => g,
                Err(_) => {
                    warn!("durable cache mutex poisoned, treating as miss");
                    return None;
                }
            };
            match guard.get(name, version_key) {
                Ok(v) => v,
                Err(e) => {
                    warn!(package = name, version_key, error = %e, "durable cache read failed");
                    return None;
                }
            }
        };

        let bytes = bytes?;
        match serde_json::from_slice::<Envelope<V>>(&bytes) {
            Ok(envelope) => {
                if let Some(mem) = &self.memory {
                    if let Ok(mut w) = mem.write() {
                        w.insert(key, MemEntry::fresh(envelope.value.clone()));
                    }
                }
                Some(envelope.value)
            }
            Err(e) => {
                warn!(package = name, version_key, error = %e, "cache entry failed to deserialize");
                None
            }
        }
    }

    /// Write to memory (if enabled) and durable; durable is upserted by
    /// `(name, version_key)`, stamping `updated_at`.
    pub fn put(&self, name: &str, version_key: &str, value: V) {
        let key = (name.to_string(), version_key.to_string());

        if let Some(mem) = &self.memory {
            if let Ok(mut w) = mem.write() {
                w.insert(key, MemEntry::fresh(value.clone()));
            }
        }

        let envelope = Envelope {
            value,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(b) => b,
            Err(e) => {
                warn!(package = name, version_key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        let guard = match self.durable.lock() {
            Ok(g) => g,
            Err(_) => {
                warn!("durable cache mutex poisoned, dropping write");
                return;
            }
        };
        if let Err(e) = guard.upsert(name, version_key, &bytes) {
            warn!(package = name, version_key, error = %e, "durable cache write failed");
        }
    }

    /// Rehydrate memory from durable on startup. A no-op when the memory
    /// tier is disabled.
    pub fn load_all(&self) {
        let Some(mem) = &self.memory else {
            return;
        };
        let entries = {
            let guard = match self.durable.lock() {
                Ok(g) => g,
                Err(_) => return,
            };
            match guard.iter_all() {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "durable cache enumeration failed during load_all");
                    return;
                }
            }
        };

        let mut loaded = 0usize;
        let mut w = match mem.write() {
            Ok(w) => w,
            Err(_) => return,
        };
        for (key, bytes) in entries {
            match serde_json::from_slice::<Envelope<V>>(&bytes) {
                Ok(envelope) => {
                    w.insert(key, MemEntry::fresh(envelope.value));
                    loaded += 1;
                }
                Err(e) => {
                    warn!(error = %e, "skipping malformed cache entry during load_all");
                }
            }
        }
        debug!(loaded, "rehydrated memory cache from durable store");
    }
}
