//! Anonymous identity for the feed client.
//!
//! The identity is persisted as `"<timestamp_ms>-<random>"` under a fixed key and the
//! timestamp component is the numeric user id. It only needs to be stable per storage
//! location and roughly unique.

use rand::Rng;
use sf_storage::KeyValueStore;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const IDENTITY_STORAGE_KEY: &str = "demo_user_id";

const DISCRIMINATOR_RANGE: u64 = 1_000_000_000;

pub struct IdentityResolver {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, IDENTITY_STORAGE_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_owned(),
        }
    }

    /// Returns the persisted identity, creating it on first use.
    ///
    /// Never fails: storage errors and corrupted values fall back to the current
    /// timestamp.
    pub fn get_or_create(&self) -> u64 {
        let stored = match self.store.get(&self.key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!("failed to read identity from storage: {err:#}");
                return now_ms();
            }
        };

        let raw = match stored {
            Some(raw) => raw,
            None => {
                let fresh = generate_raw_identity();
                if let Err(err) = self.store.set(&self.key, &fresh) {
                    warn!("failed to persist identity {}: {err:#}", fresh);
                } else {
                    info!("created anonymous identity {}", fresh);
                }
                fresh
            }
        };

        parse_identity(&raw).unwrap_or_else(|| {
            warn!("stored identity '{}' is corrupted, using timestamp fallback", raw);
            now_ms()
        })
    }
}

fn generate_raw_identity() -> String {
    let discriminator = rand::thread_rng().gen_range(0..DISCRIMINATOR_RANGE);
    format!("{}-{}", now_ms(), discriminator)
}

fn parse_identity(raw: &str) -> Option<u64> {
    raw.split('-').next()?.trim().parse().ok()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
