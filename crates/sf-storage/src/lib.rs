use anyhow::{Context, Result};
use parking_lot::RwLock;
use rocksdb::{DB, Direction, IteratorMode, Options};
use sf_api_types::CollectedEvent;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const EVENT_PREFIX: &str = "event:";

/// String key-value storage, the local-storage stand-in for the feed client.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Append-only log of collected analytics events.
pub trait EventLog: Send + Sync {
    fn append_event(&self, record: &CollectedEvent) -> Result<()>;
    fn list_events(&self, filter: &EventFilter) -> Result<Vec<CollectedEvent>>;
}

#[derive(Debug, Clone)]
pub struct EventFilter {
    pub limit: usize,
    pub event_type: Option<String>,
    pub user_id: Option<u64>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            event_type: None,
            user_id: None,
        }
    }
}

impl EventFilter {
    fn matches(&self, record: &CollectedEvent) -> bool {
        if let Some(expected) = self.event_type.as_deref() {
            if record.event_type != expected {
                return false;
            }
        }
        if let Some(expected) = self.user_id {
            if record.user_id != expected {
                return false;
            }
        }
        true
    }
}

fn newest_first(mut events: Vec<CollectedEvent>, limit: usize) -> Vec<CollectedEvent> {
    events.sort_by(|a, b| b.event_ts.cmp(&a.event_ts));
    events.truncate(limit);
    events
}

#[derive(Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, String>>,
    events: RwLock<Vec<CollectedEvent>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl EventLog for InMemoryStore {
    fn append_event(&self, record: &CollectedEvent) -> Result<()> {
        self.events.write().push(record.clone());
        Ok(())
    }

    fn list_events(&self, filter: &EventFilter) -> Result<Vec<CollectedEvent>> {
        let events = self
            .events
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        Ok(newest_first(events, filter.limit))
    }
}

pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    pub fn open_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path)
            .with_context(|| format!("failed to open rocksdb at {}", path.display()))?;
        Ok(Self { db: Arc::new(db) })
    }

    fn key_for_value(key: &str) -> String {
        format!("kv:{key}")
    }

    // Zero-padded so lexical key order is arrival order.
    fn key_for_event(event_ts: u64, event_id: &str) -> String {
        format!("{EVENT_PREFIX}{event_ts:020}:{event_id}")
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.db.get(Self::key_for_value(key).as_bytes())?;
        match value {
            Some(raw) => Ok(Some(
                String::from_utf8(raw).context("stored value is not valid utf-8")?,
            )),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .put(Self::key_for_value(key).as_bytes(), value.as_bytes())?;
        Ok(())
    }
}

impl EventLog for RocksDbStore {
    fn append_event(&self, record: &CollectedEvent) -> Result<()> {
        let key = Self::key_for_event(record.event_ts, &record.event_id);
        let value = serde_json::to_vec(record)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    fn list_events(&self, filter: &EventFilter) -> Result<Vec<CollectedEvent>> {
        let mut events = Vec::new();
        let mode = IteratorMode::From(EVENT_PREFIX.as_bytes(), Direction::Forward);

        for entry in self.db.iterator(mode) {
            let (key, value) = entry?;
            if !key.as_ref().starts_with(EVENT_PREFIX.as_bytes()) {
                break;
            }

            let record = serde_json::from_slice::<CollectedEvent>(&value)
                .context("failed to decode stored event")?;
            if filter.matches(&record) {
                events.push(record);
            }
        }

        Ok(newest_first(events, filter.limit))
    }
}
