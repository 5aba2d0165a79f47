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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

/// A persistent store implementation using RocksDB.
///
/// Each collection gets its own column family, named after the collection.
/// Keys are the record's UUID bytes and values its JSON encoding. A
/// `ChangeSet` becomes one `WriteBatch`; commits are serialised so validation
/// and write see the same state.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = Collection::ALL
            .iter()
            .map(|c| ColumnFamilyDescriptor::new(c.name(), Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, collection: Collection) -> Result<&ColumnFamily> {
        self.db.cf_handle(collection.name()).ok_or_else(|| {
            CrediarioError::internal(format!("{} column family not found", collection.name()))
        })
    }

    fn revision(&self, collection: Collection, id: Uuid) -> Result<Option<u64>> {
        let cf = self.cf(collection)?;
        match self.db.get_pinned_cf(cf, id.as_bytes())? {
            Some(bytes) => {
                let record: Record = serde_json::from_slice(&bytes)?;
                Ok(Some(record.revision()))
            }
            None => Ok(None),
        }
    }

    fn get<T>(&self, collection: Collection, id: Uuid) -> Result<Option<T>>
    where
        T: TryFrom<Record, Error = CrediarioError>,
    {
        let cf = self.cf(collection)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => {
                let record: Record = serde_json::from_slice(&bytes)?;
                T::try_from(record).map(Some)
            }
            None => Ok(None),
        }
    }

    fn all<T>(&self, collection: Collection) -> Result<Vec<T>>
    where
        T: TryFrom<Record, Error = CrediarioError>,
    {
        let cf = self.cf(collection)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let record: Record = serde_json::from_slice(&value)?;
            rows.push(T::try_from(record)?);
        }
        Ok(rows)
    }

    fn put(&self, batch: &mut WriteBatch, record: &Record) -> Result<()> {
        let (collection, id) = record.key();
        batch.put_cf(self.cf(collection)?, id.as_bytes(), serde_json::to_vec(record)?);
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(|e| {
            error!(error = %e, "RocksDB write failed");
            CrediarioError::from(e)
        })
    }
}

#[async_trait]
impl ClientStore for RocksDBStore {
    async fn client(&self, id: ClientId) -> Result<Option<Client>> {
        self.get(Collection::Clients, id.as_uuid())
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        let mut rows = self.all(Collection::Clients)?;
        ordering::clients(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl InstallmentStore for RocksDBStore {
    async fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.get(Collection::Installments, id.as_uuid())
    }

    async fn installments(&self) -> Result<Vec<Installment>> {
        let mut rows = self.all(Collection::Installments)?;
        ordering::installments(&mut rows);
        Ok(rows)
    }

    async fn installments_for(&self, client_id: ClientId) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments)?;
        rows.retain(|i| i.client_id == client_id);
        ordering::schedule(&mut rows);
        Ok(rows)
    }

    async fn installments_with_status(
        &self,
        status: InstallmentStatus,
    ) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments)?;
        rows.retain(|i| i.status == status);
        ordering::schedule(&mut rows);
        Ok(rows)
    }

    async fn installments_due_on(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        let mut rows: Vec<Installment> = self.all(Collection::Installments)?;
        rows.retain(|i| i.due_date == date);
        ordering::schedule(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl BoletoStore for RocksDBStore {
    async fn boleto(&self, id: BoletoId) -> Result<Option<Boleto>> {
        self.get(Collection::Boletos, id.as_uuid())
    }

    async fn boletos(&self) -> Result<Vec<Boleto>> {
        let mut rows = self.all(Collection::Boletos)?;
        ordering::boletos(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl ExpenseStore for RocksDBStore {
    async fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.get(Collection::Expenses, id.as_uuid())
    }

    async fn expenses(&self) -> Result<Vec<Expense>> {
        let mut rows = self.all(Collection::Expenses)?;
        ordering::expenses(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl VisitStore for RocksDBStore {
    async fn visits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Visit>> {
        let mut rows: Vec<Visit> = self.all(Collection::Visits)?;
        rows.retain(|v| (from..=to).contains(&v.recorded_at.date_naive()));
        ordering::visits(&mut rows);
        Ok(rows)
    }
}

#[async_trait]
impl OutboxStore for RocksDBStore {
    async fn unsynced(&self) -> Result<Vec<OutboxEntry>> {
        let mut rows: Vec<OutboxEntry> = self.all(Collection::Outbox)?;
        rows.retain(|e| !e.synced);
        ordering::outbox(&mut rows);
        Ok(rows)
    }

    async fn mark_synced(&self, id: EntryId) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let mut entry: OutboxEntry = self
            .get(Collection::Outbox, id.as_uuid())?
            .ok_or_else(|| CrediarioError::not_found(Collection::Outbox.name(), id))?;
        entry.synced = true;
        let mut batch = WriteBatch::default();
        self.put(&mut batch, &Record::Outbox(entry))?;
        self.write(batch)
    }

    async fn clear_synced(&self) -> Result<usize> {
        let _guard = self.commit_lock.lock().await;
        let cf = self.cf(Collection::Outbox)?;
        let entries: Vec<OutboxEntry> = self.all(Collection::Outbox)?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for entry in entries.iter().filter(|e| e.synced) {
            batch.delete_cf(cf, entry.id.as_uuid().as_bytes());
            removed += 1;
        }
        self.write(batch)?;
        Ok(removed)
    }
}

#[async_trait]
impl Ledger for RocksDBStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        changes.validate(|collection, id| self.revision(collection, id))?;

        let count = changes.len();
        let mut batch = WriteBatch::default();
        for change in changes {
            match change {
                Change::Insert(record) | Change::Update(record) => {
                    self.put(&mut batch, &record)?;
                }
                Change::Delete(collection, id) => {
                    batch.delete_cf(self.cf(collection)?, id.as_bytes());
                }
            }
        }
        self.write(batch)?;
        debug!(changes = count, "change set committed");
        Ok(())
    }
}
