mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{at, date, new_client};
use crediario::application::service::CrediarioService;
use crediario::config::Settings;
use crediario::domain::boleto::Boleto;
use crediario::domain::client::{Cadence, Client};
use crediario::domain::expense::Expense;
use crediario::domain::ids::{BoletoId, ClientId, EntryId, ExpenseId, InstallmentId};
use crediario::domain::installment::{Installment, InstallmentStatus};
use crediario::domain::outbox::OutboxEntry;
use crediario::domain::ports::{
    BoletoStore, ChangeSet, ClientStore, ExpenseStore, InstallmentStore, Ledger, OutboxStore,
    VisitStore,
};
use crediario::domain::visit::Visit;
use crediario::error::{CrediarioError, Result};
use crediario::infrastructure::clock::FixedClock;
use crediario::infrastructure::in_memory::InMemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// Hands control back to the runtime after every single-row read, so two
/// operations joined on one task interleave between their reads and commits.
#[derive(Clone)]
struct InterleavingStore {
    inner: InMemoryStore,
}

#[async_trait]
impl ClientStore for InterleavingStore {
    async fn client(&self, id: ClientId) -> Result<Option<Client>> {
        let client = self.inner.client(id).await;
        tokio::task::yield_now().await;
        client
    }

    async fn clients(&self) -> Result<Vec<Client>> {
        self.inner.clients().await
    }
}

#[async_trait]
impl InstallmentStore for InterleavingStore {
    async fn installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        let installment = self.inner.installment(id).await;
        tokio::task::yield_now().await;
        installment
    }

    async fn installments(&self) -> Result<Vec<Installment>> {
        self.inner.installments().await
    }

    async fn installments_for(&self, client_id: ClientId) -> Result<Vec<Installment>> {
        self.inner.installments_for(client_id).await
    }

    async fn installments_with_status(
        &self,
        status: InstallmentStatus,
    ) -> Result<Vec<Installment>> {
        self.inner.installments_with_status(status).await
    }

    async fn installments_due_on(&self, date: NaiveDate) -> Result<Vec<Installment>> {
        self.inner.installments_due_on(date).await
    }
}

#[async_trait]
impl BoletoStore for InterleavingStore {
    async fn boleto(&self, id: BoletoId) -> Result<Option<Boleto>> {
        self.inner.boleto(id).await
    }

    async fn boletos(&self) -> Result<Vec<Boleto>> {
        self.inner.boletos().await
    }
}

#[async_trait]
impl ExpenseStore for InterleavingStore {
    async fn expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        self.inner.expense(id).await
    }

    async fn expenses(&self) -> Result<Vec<Expense>> {
        self.inner.expenses().await
    }
}

#[async_trait]
impl VisitStore for InterleavingStore {
    async fn visits_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Visit>> {
        self.inner.visits_between(from, to).await
    }
}

#[async_trait]
impl OutboxStore for InterleavingStore {
    async fn unsynced(&self) -> Result<Vec<OutboxEntry>> {
        self.inner.unsynced().await
    }

    async fn mark_synced(&self, id: EntryId) -> Result<()> {
        self.inner.mark_synced(id).await
    }

    async fn clear_synced(&self) -> Result<usize> {
        self.inner.clear_synced().await
    }
}

#[async_trait]
impl Ledger for InterleavingStore {
    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        self.inner.commit(changes).await
    }
}

#[tokio::test]
async fn test_simultaneous_payments_on_one_installment_settle_it_once() {
    let store = InterleavingStore {
        inner: InMemoryStore::new(),
    };
    let service = CrediarioService::new(
        Box::new(store.clone()),
        Arc::new(FixedClock::new(at(2024, 3, 1))),
        Settings::default(),
    );
    let session = service.login(common::EMAIL, common::PASSWORD).unwrap();
    let registration = service
        .register_client(
            &session,
            new_client("Maria", dec!(300), Cadence::Monthly, date(2024, 3, 1)),
        )
        .await
        .unwrap();
    let first = registration.installments[0].id;

    let (a, b) = tokio::join!(
        service.record_payment(&session, first, dec!(100), None),
        service.record_payment(&session, first, dec!(100), None),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(CrediarioError::Conflict(_))))
    );

    let detail = service
        .client_detail(&session, registration.client.id)
        .await
        .unwrap();
    assert_eq!(detail.client.paid_amount.value(), dec!(100));
    let rows: Vec<String> = detail
        .installments
        .iter()
        .map(|i| format!("{}:{}:{:?}", i.position, i.amount, i.status))
        .collect();
    assert_eq!(
        rows,
        vec!["1:100.00:Paid", "1.1:50.00:Pending", "2:150.00:Pending"]
    );
    assert_eq!(store.inner.unsynced().await.unwrap().len(), 2);
}
