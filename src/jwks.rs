// src/jwks.rs

use crate::config::Config;
use crate::error::AuthError;
use crate::model::JsonWebKeySet;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A process-wide cache of the provider's signing keys, keyed by `kid`.
///
/// The whole cache shares one refresh timestamp and one TTL; staleness is
/// evaluated against that shared timestamp, not per key. Every successful
/// refresh replaces the key map wholesale under a write lock held only for the
/// swap, so readers never observe a map mixing old and new entries and are
/// never blocked by network I/O.
///
/// Instances are created by their owning `Validator`; there is no global
/// state, so tests can run independent caches side by side.
#[derive(Clone)]
pub struct JwksCache {
    // Internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    http_client: reqwest::Client,
    jwks_url: Url,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    state: RwLock<CacheState>,
    // Collapses concurrent refreshes into one in-flight fetch.
    refresh_gate: Mutex<()>,
}

#[derive(Default)]
struct CacheState {
    keys: HashMap<String, Arc<DecodingKey>>,
    refreshed_at: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.is_some_and(|at| at.elapsed() <= ttl)
    }
}

impl JwksCache {
    /// Creates a new cache for the configured JWKS endpoint.
    ///
    /// If the config carries a preloaded key set, it is decoded and installed
    /// immediately and the refresh timestamp is set as if a live refresh had
    /// occurred.
    pub fn new(config: &Config) -> Self {
        let mut state = CacheState::default();
        if let Some(set) = &config.preloaded_jwks {
            state.keys = decode_key_set(set);
            state.refreshed_at = Some(Instant::now());
            info!(count = state.keys.len(), "preloaded JWKS into cache");
        }

        Self {
            inner: Arc::new(Inner {
                http_client: reqwest::Client::new(),
                jwks_url: config.jwks_url.clone(),
                cache_ttl: config.cache_ttl,
                fetch_timeout: config.fetch_timeout,
                state: RwLock::new(state),
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    /// Retrieves the decoding key for the given `kid`.
    ///
    /// A fresh cache entry is returned directly. If the cache is stale or the
    /// `kid` is unknown, exactly one refresh is attempted before re-checking;
    /// a key still absent afterwards, or a failed fetch, surfaces as
    /// `KeyNotFound` (the fetch error is attached as source for diagnostics).
    #[instrument(skip(self), err)]
    pub async fn lookup(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        let observed = {
            let state = self.inner.state.read().await;
            if state.is_fresh(self.inner.cache_ttl) {
                if let Some(key) = state.keys.get(kid) {
                    debug!("JWKS cache hit");
                    return Ok(Arc::clone(key));
                }
            }
            state.refreshed_at
        };

        // Callers that queued behind an in-flight refresh observe the bumped
        // timestamp here and skip their own fetch.
        let _gate = self.inner.refresh_gate.lock().await;
        let refreshed_since = self.inner.state.read().await.refreshed_at != observed;
        if !refreshed_since {
            debug!("JWKS cache miss, refreshing from provider");
            if let Err(err) = self.fetch_and_install().await {
                return Err(AuthError::KeyNotFound {
                    kid: kid.to_string(),
                    source: Some(Box::new(err)),
                });
            }
        }

        let state = self.inner.state.read().await;
        state
            .keys
            .get(kid)
            .map(Arc::clone)
            .ok_or_else(|| AuthError::KeyNotFound {
                kid: kid.to_string(),
                source: None,
            })
    }

    /// Forces an immediate refresh of the key set.
    ///
    /// On fetch failure the previous cache contents are retained unchanged and
    /// the error is returned to the caller. Cancelling the call (dropping the
    /// future) aborts the fetch without publishing a partial swap.
    #[instrument(skip(self), err)]
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _gate = self.inner.refresh_gate.lock().await;
        self.fetch_and_install().await
    }

    async fn fetch_and_install(&self) -> Result<(), AuthError> {
        let set = self.fetch_key_set().await?;
        let keys = decode_key_set(&set);
        info!(count = keys.len(), "refreshed JWKS cache");

        let mut state = self.inner.state.write().await;
        state.keys = keys;
        state.refreshed_at = Some(Instant::now());
        Ok(())
    }

    /// Fetches the current key set from the provider. A non-2xx response or a
    /// malformed body is an error, never a partial result; the cache is not
    /// touched here.
    async fn fetch_key_set(&self) -> Result<JsonWebKeySet, AuthError> {
        let response = self
            .inner
            .http_client
            .get(self.inner.jwks_url.clone())
            .timeout(self.inner.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Decodes every usable RSA entry of a key set. Non-RSA and undecodable
/// entries are skipped with a log line; a single bad entry never invalidates
/// the whole set. A set that yields zero usable keys produces an empty map.
fn decode_key_set(set: &JsonWebKeySet) -> HashMap<String, Arc<DecodingKey>> {
    let mut keys = HashMap::with_capacity(set.keys.len());
    for jwk in &set.keys {
        match jwk.to_decoding_key() {
            Ok(Some(key)) => {
                keys.insert(jwk.kid.clone(), Arc::new(key));
            }
            Ok(None) => debug!(kid = %jwk.kid, kty = %jwk.kty, "skipping non-RSA key"),
            Err(err) => warn!(kid = %jwk.kid, error = %err, "skipping undecodable key"),
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_entries_are_skipped_without_failing_the_set() {
        let set: JsonWebKeySet = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kty": "EC", "kid": "ec-key", "crv": "P-256"},
                {"kty": "RSA", "kid": "broken", "n": "%%%", "e": "AQAB"}
            ]
        }))
        .unwrap();
        assert!(decode_key_set(&set).is_empty());
    }
}
