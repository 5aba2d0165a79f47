use super::boleto::Boleto;
use super::client::Client;
use super::expense::Expense;
use super::ids::{BoletoId, ClientId, EntryId, ExpenseId, InstallmentId};
use super::installment::{Installment, InstallmentStatus};
use super::outbox::{Delivery, OutboxEntry};
use super::visit::Visit;
use crate::error::{CrediarioError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The named collections of the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Clients,
    Installments,
    Boletos,
    Expenses,
    Visits,
    Outbox,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Clients,
        Collection::Installments,
        Collection::Boletos,
        Collection::Expenses,
        Collection::Visits,
        Collection::Outbox,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Installments => "installments",
            Collection::Boletos => "boletos",
            Collection::Expenses => "expenses",
            Collection::Visits => "visits",
            Collection::Outbox => "outbox",
        }
    }
}

/// Any persisted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "record", rename_all = "lowercase")]
pub enum Record {
    Client(Client),
    Installment(Installment),
    Boleto(Boleto),
    Expense(Expense),
    Visit(Visit),
    Outbox(OutboxEntry),
}

impl Record {
    pub fn collection(&self) -> Collection {
        match self {
            Record::Client(_) => Collection::Clients,
            Record::Installment(_) => Collection::Installments,
            Record::Boleto(_) => Collection::Boletos,
            Record::Expense(_) => Collection::Expenses,
            Record::Visit(_) => Collection::Visits,
            Record::Outbox(_) => Collection::Outbox,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Record::Client(r) => r.id.as_uuid(),
            Record::Installment(r) => r.id.as_uuid(),
            Record::Boleto(r) => r.id.as_uuid(),
            Record::Expense(r) => r.id.as_uuid(),
            Record::Visit(r) => r.id.as_uuid(),
            Record::Outbox(r) => r.id.as_uuid(),
        }
    }

    pub fn key(&self) -> (Collection, Uuid) {
        (self.collection(), self.id())
    }

    /// Visits and outbox entries are never updated through a `ChangeSet` and
    /// always report revision 0.
    pub fn revision(&self) -> u64 {
        match self {
            Record::Client(r) => r.revision,
            Record::Installment(r) => r.revision,
            Record::Boleto(r) => r.revision,
            Record::Expense(r) => r.revision,
            Record::Visit(_) | Record::Outbox(_) => 0,
        }
    }
}

macro_rules! into_record {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Record {
            fn from(value: $ty) -> Self {
                Record::$variant(value)
            }
        }

        impl TryFrom<Record> for $ty {
            type Error = CrediarioError;

            fn try_from(record: Record) -> Result<Self> {
                match record {
                    Record::$variant(value) => Ok(value),
                    other => Err(CrediarioError::internal(format!(
                        "expected {} record, found {}",
                        stringify!($variant).to_lowercase(),
                        other.collection().name()
                    ))),
                }
            }
        })*
    };
}

into_record!(
    Client => Client,
    Installment => Installment,
    Boleto => Boleto,
    Expense => Expense,
    Visit => Visit,
    OutboxEntry => Outbox,
);

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Fails with `Conflict` if the id already exists.
    Insert(Record),
    /// Fails with `NotFound` if the id does not exist, and with `Conflict`
    /// unless the record is exactly one revision ahead of the stored row.
    Update(Record),
    /// Fails with `NotFound` if the id does not exist.
    Delete(Collection, Uuid),
}

impl Change {
    pub fn key(&self) -> (Collection, Uuid) {
        match self {
            Change::Insert(record) | Change::Update(record) => record.key(),
            Change::Delete(collection, id) => (*collection, *id),
        }
    }
}

/// Writes that must land together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, record: impl Into<Record>) -> Self {
        self.changes.push(Change::Insert(record.into()));
        self
    }

    pub fn insert_all<R: Into<Record>>(mut self, records: impl IntoIterator<Item = R>) -> Self {
        self.changes
            .extend(records.into_iter().map(|r| Change::Insert(r.into())));
        self
    }

    pub fn update(mut self, record: impl Into<Record>) -> Self {
        self.changes.push(Change::Update(record.into()));
        self
    }

    pub fn delete(mut self, collection: Collection, id: Uuid) -> Self {
        self.changes.push(Change::Delete(collection, id));
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Checks every change against the current contents plus the effect of
    /// the changes before it, so the whole set can then be applied blindly.
    ///
    /// `stored` returns the revision of the row currently held under a key,
    /// or `None` when there is no such row.
    pub fn validate<F>(&self, mut stored: F) -> Result<()>
    where
        F: FnMut(Collection, Uuid) -> Result<Option<u64>>,
    {
        let mut staged: HashMap<(Collection, Uuid), Option<u64>> = HashMap::new();
        for change in &self.changes {
            let key = change.key();
            let current = match staged.get(&key) {
                Some(current) => *current,
                None => stored(key.0, key.1)?,
            };
            let next = match (change, current) {
                (Change::Insert(_), Some(_)) => {
                    return Err(CrediarioError::Conflict(format!(
                        "{} record {} already exists",
                        key.0.name(),
                        key.1
                    )));
                }
                (Change::Update(_) | Change::Delete(..), None) => {
                    return Err(CrediarioError::not_found(key.0.name(), key.1));
                }
                (Change::Update(record), Some(revision))
                    if record.revision() != revision + 1 =>
                {
                    return Err(CrediarioError::Conflict(format!(
                        "{} record {} was modified concurrently",
                        key.0.name(),
                        key.1
                    )));
                }
                (Change::Insert(record) | Change::Update(record), _) => Some(record.revision()),
                (Change::Delete(..), _) => None,
            };
            staged.insert(key, next);
        }
        Ok(())
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn client(&self, id: ClientId) -> Result<Option<Client>>;
    /// Newest registration first.
    async fn clients(&self) -> Result<Vec<Client>>;
}

#[async_trait]
pub trait InstallmentStore: Send + Sync {
    async fn installment(&self, id: InstallmentId) -> Result<Option<Installment>>;
    /// Every installment, in schedule order per client.
    async fn installments(&self) -> Result<Vec<Installment>>;
    /// One client's installments in schedule order.
    async fn installments_for(&self, client_id: ClientId) -> Result<Vec<Installment>>;
    async fn installments_with_status(
        &self,
        status: InstallmentStatus,
    ) -> Result<Vec<Installment>>;
    async fn installments_due_on(&self, date: NaiveDate) -> Result<Vec<Installment>>;
}

#[async_trait]
pub trait BoletoStore: Send + Sync {
    async fn boleto(&self, id: BoletoId) -> Result<Option<Boleto>>;
    /// Earliest due date first.
    async fn boletos(&self) -> Result<Vec<Boleto>>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn expense(&self, id: ExpenseId) -> Result<Option<Expense>>;
    /// Most recent expense date first.
    async fn expenses(&self) -> Result<Vec<Expense>>;
}

#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Visits recorded on dates within `from..=to`, oldest first.
    async fn visits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Visit>>;
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Unsynced entries, oldest first.
    async fn unsynced(&self) -> Result<Vec<OutboxEntry>>;
    async fn mark_synced(&self, id: EntryId) -> Result<()>;
    /// Drops synced entries, returning how many were removed.
    async fn clear_synced(&self) -> Result<usize>;
}

/// The atomic write boundary.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Applies every change or none of them.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Everything the application needs from persistence.
pub trait DataStore:
    ClientStore + InstallmentStore + BoletoStore + ExpenseStore + VisitStore + OutboxStore + Ledger
{
}

impl<T> DataStore for T where
    T: ClientStore
        + InstallmentStore
        + BoletoStore
        + ExpenseStore
        + VisitStore
        + OutboxStore
        + Ledger
{
}

pub type DataStoreBox = Box<dyn DataStore>;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The remote endpoint offline entries are replayed to.
#[async_trait]
pub trait SyncSink: Send + Sync {
    async fn deliver(&self, entry: &OutboxEntry) -> Result<Delivery>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn existing(
        keys: &[(Collection, Uuid)],
    ) -> impl FnMut(Collection, Uuid) -> Result<Option<u64>> {
        let keys: HashSet<_> = keys.iter().copied().collect();
        move |c, id| Ok(keys.contains(&(c, id)).then_some(0))
    }

    #[test]
    fn test_insert_of_existing_id_conflicts() {
        let boleto = crate::domain::boleto::NewBoleto {
            description: "Aluguel".to_string(),
            amount: rust_decimal_macros::dec!(900),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
        }
        .into_boleto(Utc::now())
        .unwrap();
        let key = (Collection::Boletos, boleto.id.as_uuid());
        let changes = ChangeSet::new().insert(boleto);
        assert!(changes.validate(existing(&[])).is_ok());
        assert!(matches!(
            changes.validate(existing(&[key])),
            Err(CrediarioError::Conflict(_))
        ));
    }

    #[test]
    fn test_update_must_follow_the_stored_revision() {
        let mut boleto = crate::domain::boleto::NewBoleto {
            description: "Luz".to_string(),
            amount: rust_decimal_macros::dec!(120),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        }
        .into_boleto(Utc::now())
        .unwrap();
        let stale = ChangeSet::new().update(boleto.clone());
        boleto.mark_paid(Utc::now()).unwrap();
        let fresh = ChangeSet::new().update(boleto.clone());

        assert!(fresh.validate(|_, _| Ok(Some(0))).is_ok());
        assert!(matches!(
            fresh.validate(|_, _| Ok(Some(1))),
            Err(CrediarioError::Conflict(_))
        ));
        assert!(matches!(
            stale.validate(|_, _| Ok(Some(0))),
            Err(CrediarioError::Conflict(_))
        ));
    }

    #[test]
    fn test_delete_requires_existing_id() {
        let id = Uuid::new_v4();
        let changes = ChangeSet::new().delete(Collection::Expenses, id);
        assert!(changes.validate(existing(&[])).is_err());
        assert!(
            changes
                .validate(existing(&[(Collection::Expenses, id)]))
                .is_ok()
        );
    }

    #[test]
    fn test_validation_sees_earlier_changes_in_the_set() {
        let id = Uuid::new_v4();
        let delete_then_delete = ChangeSet::new()
            .delete(Collection::Visits, id)
            .delete(Collection::Visits, id);
        let err = delete_then_delete
            .validate(existing(&[(Collection::Visits, id)]))
            .unwrap_err();
        assert!(matches!(err, CrediarioError::NotFound { .. }));
    }

    #[test]
    fn test_same_id_in_different_collections_is_distinct() {
        let id = Uuid::new_v4();
        let changes = ChangeSet::new().delete(Collection::Boletos, id);
        assert!(
            changes
                .validate(existing(&[(Collection::Expenses, id)]))
                .is_err()
        );
    }
}
