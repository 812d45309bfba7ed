//! In-process TTL cache with per-key single-flight.
//!
//! Values are stored as `serde_json::Value` so one cache can hold every
//! record type the scraper produces. While a key is being computed, later
//! callers for the same key subscribe to the running computation instead of
//! starting their own.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};

type Outcome = std::result::Result<Value, Error>;

enum Slot {
    Ready { value: Value, expires_at: Instant },
    Pending(watch::Receiver<Option<Outcome>>),
}

enum Claim {
    Hit(Value),
    Wait(watch::Receiver<Option<Outcome>>),
    Lead(watch::Sender<Option<Outcome>>),
}

#[derive(Default)]
pub struct Cache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live value for `key`, or run `compute` once and store its
    /// result for `ttl`. Concurrent callers for the same key share a single
    /// run of `compute`, including its failure. Failures are never stored.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let tx = loop {
            match self.claim(key) {
                Claim::Hit(value) => {
                    debug!(key = %key, "Cache hit");
                    return decode(value);
                }
                Claim::Wait(mut rx) => {
                    debug!(key = %key, "Joining in-flight computation");
                    let outcome = match rx.wait_for(Option::is_some).await {
                        Ok(outcome) => outcome.clone(),
                        // Leader was dropped before finishing; its slot is gone
                        Err(_) => continue,
                    };
                    match outcome {
                        Some(Ok(value)) => return decode(value),
                        Some(Err(e)) => return Err(e),
                        None => continue,
                    }
                }
                Claim::Lead(tx) => break tx,
            }
        };

        debug!(key = %key, "Cache miss");
        let mut guard = PendingGuard {
            cache: self,
            key,
            armed: true,
        };

        let outcome = compute().await.and_then(|computed| {
            let value = serde_json::to_value(&computed)
                .map_err(|e| Error::CacheValue(e.to_string()))?;
            Ok((computed, value))
        });

        {
            let mut slots = self.lock();
            match &outcome {
                Ok((_, value)) => {
                    slots.insert(
                        key.to_string(),
                        Slot::Ready {
                            value: value.clone(),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "Computation failed, key left unset");
                    slots.remove(key);
                }
            }
        }
        guard.armed = false;

        let shared = match &outcome {
            Ok((_, value)) => Ok(value.clone()),
            Err(e) => Err(e.clone()),
        };
        tx.send_replace(Some(shared));

        outcome.map(|(computed, _)| computed)
    }

    /// Number of live (stored and unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready { expires_at, .. } if now < *expires_at))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a stored value. In-flight computations are left alone.
    pub fn invalidate(&self, key: &str) {
        let mut slots = self.lock();
        if matches!(slots.get(key), Some(Slot::Ready { .. })) {
            slots.remove(key);
        }
    }

    pub fn clear(&self) {
        self.lock().retain(|_, slot| matches!(slot, Slot::Pending(_)));
    }

    fn claim(&self, key: &str) -> Claim {
        let mut slots = self.lock();
        match slots.get(key) {
            Some(Slot::Ready { value, expires_at }) if Instant::now() < *expires_at => {
                return Claim::Hit(value.clone());
            }
            Some(Slot::Pending(rx)) => return Claim::Wait(rx.clone()),
            _ => {}
        }

        let (tx, rx) = watch::channel(None);
        slots.insert(key.to_string(), Slot::Pending(rx));
        Claim::Lead(tx)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a pending slot if the computing future is dropped mid-flight,
/// so waiters can retry instead of hanging.
struct PendingGuard<'a> {
    cache: &'a Cache,
    key: &'a str,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.cache.lock();
            if matches!(slots.get(self.key), Some(Slot::Pending(_))) {
                slots.remove(self.key);
            }
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::CacheValue(e.to_string()))
}
