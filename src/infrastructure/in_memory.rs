use super::ordering;
use crate::domain::boleto::Boleto;
use crate::domain::client::Client;
use crate::domain::expense::Expense;
use crate::domain::ids::{BoletoId, ClientId, EntryId, ExpenseId, InstallmentId};
use crate::domain::installment::{Installment, InstallmentStatus};
use crate::domain::outbox::OutboxEntry;
use crate::domain::ports::{
    BoletoStore, Change, ChangeSet, ClientStore, Collection, ExpenseStore, InstallmentStore,
    Ledger, OutboxStore, Record, VisitStore,
};
use crate::domain::visit::Visit;
use crate::error::{CrediarioError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

type Tables = HashMap<Collection, HashMap<Uuid, Record>>;

/// A thread-safe in-memory data store.
///
/// Every collection lives behind one `RwLock`, so a `ChangeSet` is validated
/// and applied under a single write guard and readers never observe half of
/// a commit. Cloning shares the underlying tables.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn get<T>(&self, collection: Collection, id: Uuid) -> Result<Option<T>>
    where
        T: TryFrom<Record, Error = CrediarioError>,
    {
        let tables = self.tables.read().await;
        tables
            .get(&collection)
            .and_then(|table| table.get(&id))
            .cloned()
            .map(T::try_from)
            .transpose()
    }

    async fn all<T>(&self, collection: Collection) -> Result<Vec<T>>
    where
        T: TryFrom<Record, Error = CrediarioError>,
    {
        let tables = self.tables.read().await;
        tables
            .get(&collection)
            .into_iter()
            .flat_map(|table| table.values().cloned())
            .map(T::try_from)
            .collect()
    }
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn client(&self, id: ClientId) -> Result<Option<Client>> {
        self.get(Collection::Clients, id.as_uuid()).await
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        let mut rows = self.all(Collection::Clients).await?;
        ordering::clients(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl InstallmentStore for InMemoryStore {
    async fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.get(Collection::Installments, id.as_uuid()).await
    }

    async fn installments(&self) -> Result<Vec<Installment>> {
        let mut rows = self.all(Collection::Installments).await?;
        ordering::installments(&mut rows);
        Ok(rows)
    }

    async fn installments_for(&self, client_id: ClientId) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments).await?;
        rows.retain(|i| i.client_id == client_id);
        ordering::schedule(&mut rows);
        Ok(rows)
    }

    async fn installments_with_status(
        &self,
        status: InstallmentStatus,
    ) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments).await?;
        rows.retain(|i| i.status == status);
        ordering::schedule(&mut rows);
        Ok(rows)
    }

    async fn installments_due_on(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments).await?;
        rows.retain(|i| i.due_date == date);
        ordering::schedule(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl BoletoStore for InMemoryStore {
    async fn boleto(&self, id: BoletoId) -> Result<Option<Boleto>> {
        self.get(Collection::Boletos, id.as_uuid()).await
    }

    async fn boletos(&self) -> Result<Vec<Boleto>> {
        let mut rows = self.all(Collection::Boletos).await?;
        ordering::boletos(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStore {
    async fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.get(Collection::Expenses, id.as_uuid()).await
    }

    async fn expenses(&self) -> Result<Vec<Expense>> {
        let mut rows = self.all(Collection::Expenses).await?;
        ordering::expenses(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl VisitStore for InMemoryStore {
    async fn visits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Visit>> {
        let mut rows: Vec<Visit> = self.all(Collection::Visits).await?;
        rows.retain(|v| (from..=to).contains(&v.recorded_at.date_naive()));
        ordering::visits(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl OutboxStore for InMemoryStore {
    async fn unsynced(&self) -> Result<Vec<OutboxEntry>> {
        let mut rows: Vec<OutboxEntry> = self.all(Collection::Outbox).await?;
        rows.retain(|e| !e.synced);
        ordering::outbox(&mut rows);
        Ok(rows)
    }

    async fn mark_synced(&self, id: EntryId) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables
            .get_mut(&Collection::Outbox)
            .and_then(|table| table.get_mut(&id.as_uuid()))
        {
            Some(Record::Outbox(entry)) => {
                entry.synced = true;
                Ok(())
            }
            _ => Err(CrediarioError::not_found(Collection::Outbox.name(), id)),
        }
    }

    async fn clear_synced(&self) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Some(table) = tables.get_mut(&Collection::Outbox) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|_, record| !matches!(record, Record::Outbox(entry) if entry.synced));
        Ok(before - table.len())
    }
}

#[async_trait]
impl Ledger for InMemoryStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;
        changes.validate(|collection, id| {
            Ok(tables
                .get(&collection)
                .and_then(|table| table.get(&id))
                .map(Record::revision))
        })?;

        let count = changes.len();
        for change in changes {
            match change {
                Change::Insert(record) | Change::Update(record) => {
                    let (collection, id) = record.key();
                    tables.entry(collection).or_default().insert(id, record);
                }
                Change::Delete(collection, id) => {
                    if let Some(table) = tables.get_mut(&collection) {
                        table.remove(&id);
                    }
                }
            }
        }
        debug!(changes = count, "change set committed");
        Ok(())
    }
}
