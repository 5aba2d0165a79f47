//! Offline write queue.
//!
//! Entries are written in the same commit as the business change they
//! describe and replayed to a remote sink later. Delivery is at-least-once:
//! an entry stays queued until the sink acknowledges it, and the sink is
//! expected to recognise re-deliveries by `natural_key`.

use super::client::Client;
use super::ids::EntryId;
use super::reconcile::Reconciliation;
use super::visit::Visit;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Client,
    Payment,
    Visit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    /// Stable key the receiving side deduplicates on.
    pub natural_key: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub synced: bool,
}

impl OutboxEntry {
    pub fn new<T: Serialize>(
        kind: EntryKind,
        natural_key: impl Into<String>,
        payload: &T,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: EntryId::new(),
            kind,
            natural_key: natural_key.into(),
            payload: serde_json::to_value(payload)?,
            created_at: now,
            synced: false,
        })
    }

    pub fn for_client(client: &Client, now: DateTime<Utc>) -> Result<Self> {
        Self::new(
            EntryKind::Client,
            format!("client:{}", client.id),
            client,
            now,
        )
    }

    /// An installment is settled at most once, so its id keys the payment.
    pub fn for_payment(reconciliation: &Reconciliation, now: DateTime<Utc>) -> Result<Self> {
        Self::new(
            EntryKind::Payment,
            format!("payment:{}", reconciliation.paid.id),
            reconciliation,
            now,
        )
    }

    pub fn for_visit(visit: &Visit, now: DateTime<Utc>) -> Result<Self> {
        Self::new(EntryKind::Visit, format!("visit:{}", visit.id), visit, now)
    }
}

/// How the remote side treated a delivered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Accepted,
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub delivered: usize,
    pub duplicates: usize,
    /// Entries still queued after this replay.
    pub remaining: usize,
    /// Why the replay stopped early, if it did.
    pub failure: Option<String>,
}

impl ReplayReport {
    pub fn acknowledged(&self) -> usize {
        self.delivered + self.duplicates
    }
}
