use crate::domain::outbox::{Delivery, OutboxEntry};
use crate::domain::ports::SyncSink;
use crate::error::{CrediarioError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct SinkState {
    seen: HashSet<String>,
    received: Vec<OutboxEntry>,
    unavailable: HashSet<String>,
}

/// A remote endpoint held in memory.
///
/// Entries are applied once per natural key; a redelivery is acknowledged as
/// a duplicate. Keys marked unavailable fail, which simulates a dropped
/// connection mid-replay.
#[derive(Default, Clone)]
pub struct InMemorySink {
    state: Arc<RwLock<SinkState>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_on(&self, natural_key: impl Into<String>) {
        self.state.write().await.unavailable.insert(natural_key.into());
    }

    pub async fn recover(&self) {
        self.state.write().await.unavailable.clear();
    }

    /// Entries applied so far, in arrival order.
    pub async fn received(&self) -> Vec<OutboxEntry> {
        self.state.read().await.received.clone()
    }
}

#[async_trait]
impl SyncSink for InMemorySink {
    async fn deliver(&self, entry: &OutboxEntry) -> Result<Delivery> {
        let mut state = self.state.write().await;
        if state.unavailable.contains(&entry.natural_key) {
            return Err(CrediarioError::internal(format!(
                "sync endpoint rejected {}",
                entry.natural_key
            )));
        }
        if !state.seen.insert(entry.natural_key.clone()) {
            debug!(key = %entry.natural_key, "duplicate delivery acknowledged");
            return Ok(Delivery::Duplicate);
        }
        state.received.push(entry.clone());
        Ok(Delivery::Accepted)
    }
}
