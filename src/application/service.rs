use crate::config::Settings;
use crate::domain::boleto::{Boleto, BoletoDisplay, NewBoleto};
use crate::domain::client::{Cadence, Client, NewClient};
use crate::domain::expense::{self, Expense, ExpenseCategory, ExpensePatch, NewExpense};
use crate::domain::ids::{BoletoId, ClientId, ExpenseId, InstallmentId};
use crate::domain::installment::{Installment, InstallmentStatus};
use crate::domain::listing::{self, ClientSummary};
use crate::domain::money::{Amount, Money};
use crate::domain::notice::Notice;
use crate::domain::outbox::{Delivery, OutboxEntry, ReplayReport};
use crate::domain::ports::{ChangeSet, Clock, Collection, DataStoreBox, SyncSink};
use crate::domain::reconcile::{self, Reconciliation};
use crate::domain::report::{self, DashboardMetrics, DueCollection, Period, ProductivityReport};
use crate::domain::route::{self, ClientDistance, GeoPoint, RoutePlan, SortBy};
use crate::domain::schedule::{self, SchedulePlan};
use crate::domain::session::Session;
use crate::domain::visit::{CheckIn, Visit};
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A newly registered client and the schedule generated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub client: Client,
    pub installments: Vec<Installment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientDetail {
    pub client: Client,
    /// Schedule order.
    pub installments: Vec<Installment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub reconciliation: Reconciliation,
    pub notice: Notice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub metrics: DashboardMetrics,
    pub collections: Vec<DueCollection>,
    /// One payment-due notice per collection.
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitReceipt {
    pub visit: Visit,
    /// Daily goal progress, once today's collections reach it.
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub report: ReplayReport,
    pub notice: Option<Notice>,
}

/// Entry point for every user-facing operation.
///
/// `CrediarioService` owns the data store and the clock. Mutating operations
/// take the caller's `Session`, validate it against the clock, and write
/// through a single `ChangeSet` commit so a failure leaves nothing half
/// applied.
pub struct CrediarioService {
    store: DataStoreBox,
    clock: Arc<dyn Clock>,
    settings: Settings,
}

impl CrediarioService {
    pub fn new(store: DataStoreBox, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = Session::login(
            email,
            password,
            self.clock.now(),
            self.settings.session_ttl(),
        )?;
        info!(user = %session.email, expires_at = %session.expires_at(), "signed in");
        Ok(session)
    }

    fn authorize(&self, session: &Session) -> Result<DateTime<Utc>> {
        let now = self.clock.now();
        session.validate(now).inspect_err(|_| {
            warn!(user = %session.email, "rejected expired session");
        })?;
        Ok(now)
    }

    async fn commit(&self, operation: &'static str, changes: ChangeSet) -> Result<()> {
        self.store.commit(changes).await.inspect_err(|e| {
            error!(operation, error = %e, "commit failed");
        })
    }

    async fn require_client(&self, id: ClientId) -> Result<Client> {
        self.store
            .client(id)
            .await?
            .ok_or_else(|| CrediarioError::not_found("client", id))
    }

    async fn require_installment(&self, id: InstallmentId) -> Result<Installment> {
        self.store
            .installment(id)
            .await?
            .ok_or_else(|| CrediarioError::not_found("installment", id))
    }

    /// Registers a client together with its installment schedule.
    pub async fn register_client(
        &self,
        session: &Session,
        new_client: NewClient,
    ) -> Result<Registration> {
        let now = self.authorize(session)?;
        let validated = new_client.into_client(now)?;
        let client = validated.client;
        let installments = schedule::generate(
            client.id,
            validated.total,
            client.cadence,
            client.first_payment_date,
            &self.settings.schedule_terms(),
            now,
        )?;
        let entry = OutboxEntry::for_client(&client, now)?;

        self.commit(
            "register_client",
            ChangeSet::new()
                .insert(client.clone())
                .insert_all(installments.clone())
                .insert(entry),
        )
        .await?;
        info!(
            client_id = %client.id,
            total = %client.total_amount,
            cadence = %client.cadence,
            installments = installments.len(),
            "client registered"
        );
        Ok(Registration {
            client,
            installments,
        })
    }

    /// The schedule a registration would generate, without saving anything.
    pub fn preview_schedule(
        &self,
        total: Decimal,
        cadence: Cadence,
        start: NaiveDate,
    ) -> Result<SchedulePlan> {
        let total = Amount::new(total)?;
        schedule::plan(total, cadence, start, &self.settings.schedule_terms())
    }

    pub async fn client_detail(&self, session: &Session, id: ClientId) -> Result<ClientDetail> {
        self.authorize(session)?;
        let client = self.require_client(id).await?;
        let installments = self.store.installments_for(id).await?;
        Ok(ClientDetail {
            client,
            installments,
        })
    }

    /// Applies a full or partial payment to an installment.
    ///
    /// `reschedule_to` moves the remainder of a partial payment; without it the
    /// remainder keeps the original due date.
    pub async fn record_payment(
        &self,
        session: &Session,
        installment_id: InstallmentId,
        tendered: Decimal,
        reschedule_to: Option<NaiveDate>,
    ) -> Result<PaymentReceipt> {
        let now = self.authorize(session)?;
        let installment = self.require_installment(installment_id).await?;
        let client = self.require_client(installment.client_id).await?;
        let reconciliation =
            reconcile::reconcile(&client, &installment, tendered, reschedule_to, now)?;
        let entry = OutboxEntry::for_payment(&reconciliation, now)?;

        self.commit("record_payment", reconciliation.changes().insert(entry))
            .await?;
        info!(
            client_id = %client.id,
            installment_id = %installment_id,
            amount = %reconciliation.tendered,
            kind = ?reconciliation.kind,
            remainder = ?reconciliation.remainder.as_ref().map(|r| r.amount),
            "payment recorded"
        );
        let notice = Notice::payment_received(&client.name, reconciliation.tendered);
        Ok(PaymentReceipt {
            reconciliation,
            notice,
        })
    }

    /// Settles an installment for its full amount.
    pub async fn mark_paid(
        &self,
        session: &Session,
        installment_id: InstallmentId,
    ) -> Result<PaymentReceipt> {
        self.authorize(session)?;
        let installment = self.require_installment(installment_id).await?;
        self.record_payment(session, installment_id, installment.amount.value(), None)
            .await
    }

    /// Flags every pending installment past its due date as overdue.
    pub async fn refresh_overdue(&self, session: &Session) -> Result<usize> {
        let now = self.authorize(session)?;
        let today = self.clock.today();
        let flagged: Vec<Installment> = self
            .store
            .installments_with_status(InstallmentStatus::Pending)
            .await?
            .into_iter()
            .filter_map(|mut installment| {
                installment.mark_overdue(today, now).then_some(installment)
            })
            .collect();

        let count = flagged.len();
        if count == 0 {
            debug!(%today, "no installments became overdue");
            return Ok(0);
        }
        let changes = flagged
            .into_iter()
            .fold(ChangeSet::new(), |changes, installment| changes.update(installment));
        self.commit("refresh_overdue", changes).await?;
        info!(%today, count, "installments marked overdue");
        Ok(count)
    }

    /// Clients in collection order, optionally filtered by a search term.
    pub async fn list_clients(
        &self,
        session: &Session,
        search: Option<&str>,
    ) -> Result<Vec<ClientSummary>> {
        self.authorize(session)?;
        let mut clients = self.store.clients().await?;
        if let Some(term) = search {
            clients.retain(|c| listing::matches_search(c, term));
        }
        let installments = self.store.installments().await?;
        let mut summaries = listing::summarize(clients, &installments, self.clock.today());
        listing::sort_for_collection(&mut summaries);
        Ok(summaries)
    }

    pub async fn clients_by_distance(
        &self,
        session: &Session,
        origin: Option<GeoPoint>,
        sort: SortBy,
    ) -> Result<Vec<ClientDistance>> {
        self.authorize(session)?;
        let mut list = route::with_distances(self.store.clients().await?, origin);
        route::sort_clients(&mut list, sort);
        Ok(list)
    }

    /// Nearest clients within the configured radius, as a round trip from
    /// `origin`.
    pub async fn plan_route(
        &self,
        session: &Session,
        origin: Option<GeoPoint>,
    ) -> Result<(RoutePlan, Notice)> {
        self.authorize(session)?;
        let plan = route::plan_route(
            self.store.clients().await?,
            origin,
            self.settings.route_radius_km,
            self.settings.route_max_waypoints,
        )?;
        info!(stops = plan.stops.len(), total_km = plan.total_km, "route planned");
        let notice = Notice::route_ready(plan.stops.len(), plan.total_km);
        Ok((plan, notice))
    }

    pub async fn dashboard(&self, session: &Session) -> Result<Dashboard> {
        self.authorize(session)?;
        let today = self.clock.today();
        let clients = self.store.clients().await?;
        let installments = self.store.installments().await?;
        let metrics = report::dashboard(&clients, &installments, today);
        let due_today = self.store.installments_due_on(today).await?;
        let collections = report::collections_for(&clients, &due_today, today);
        let notices = collections
            .iter()
            .map(|c| Notice::payment_due(&c.client_name, c.amount))
            .collect();
        Ok(Dashboard {
            metrics,
            collections,
            notices,
        })
    }

    pub async fn create_boleto(&self, session: &Session, new_boleto: NewBoleto) -> Result<Boleto> {
        let now = self.authorize(session)?;
        let boleto = new_boleto.into_boleto(now)?;
        self.commit("create_boleto", ChangeSet::new().insert(boleto.clone()))
            .await?;
        info!(boleto_id = %boleto.id, amount = %boleto.amount, due = %boleto.due_date, "boleto created");
        Ok(boleto)
    }

    pub async fn pay_boleto(&self, session: &Session, id: BoletoId) -> Result<Boleto> {
        let now = self.authorize(session)?;
        let mut boleto = self
            .store
            .boleto(id)
            .await?
            .ok_or_else(|| CrediarioError::not_found("boleto", id))?;
        boleto.mark_paid(now)?;
        self.commit("pay_boleto", ChangeSet::new().update(boleto.clone()))
            .await?;
        info!(boleto_id = %id, amount = %boleto.amount, "boleto paid");
        Ok(boleto)
    }

    /// Boletos by due date with the status to show for today.
    pub async fn boletos(&self, session: &Session) -> Result<Vec<(Boleto, BoletoDisplay)>> {
        self.authorize(session)?;
        let today = self.clock.today();
        Ok(self
            .store
            .boletos()
            .await?
            .into_iter()
            .map(|b| {
                let display = b.display_status(today);
                (b, display)
            })
            .collect())
    }

    pub async fn create_expense(
        &self,
        session: &Session,
        new_expense: NewExpense,
    ) -> Result<Expense> {
        let now = self.authorize(session)?;
        let expense = new_expense.into_expense(now)?;
        self.commit("create_expense", ChangeSet::new().insert(expense.clone()))
            .await?;
        info!(expense_id = %expense.id, amount = %expense.amount, category = %expense.category, "expense recorded");
        Ok(expense)
    }

    pub async fn update_expense(
        &self,
        session: &Session,
        id: ExpenseId,
        patch: ExpensePatch,
    ) -> Result<Expense> {
        let now = self.authorize(session)?;
        let mut expense = self
            .store
            .expense(id)
            .await?
            .ok_or_else(|| CrediarioError::not_found("expense", id))?;
        expense.apply(patch, now)?;
        self.commit("update_expense", ChangeSet::new().update(expense.clone()))
            .await?;
        info!(expense_id = %id, "expense updated");
        Ok(expense)
    }

    pub async fn delete_expense(&self, session: &Session, id: ExpenseId) -> Result<()> {
        self.authorize(session)?;
        self.commit(
            "delete_expense",
            ChangeSet::new().delete(Collection::Expenses, id.as_uuid()),
        )
        .await?;
        info!(expense_id = %id, "expense deleted");
        Ok(())
    }

    pub async fn expenses(&self, session: &Session) -> Result<Vec<Expense>> {
        self.authorize(session)?;
        self.store.expenses().await
    }

    pub async fn expense_totals(&self, session: &Session) -> Result<Vec<(ExpenseCategory, Money)>> {
        self.authorize(session)?;
        Ok(expense::totals_by_category(&self.store.expenses().await?))
    }

    /// Records a door-to-door visit and queues it for sync.
    pub async fn check_in(&self, session: &Session, check_in: CheckIn) -> Result<VisitReceipt> {
        let now = self.authorize(session)?;
        self.require_client(check_in.client_id).await?;
        let visit = check_in.into_visit(now)?;
        let entry = OutboxEntry::for_visit(&visit, now)?;
        self.commit("check_in", ChangeSet::new().insert(visit.clone()).insert(entry))
            .await?;
        info!(
            visit_id = %visit.id,
            client_id = %visit.client_id,
            status = ?visit.status,
            amount = %visit.collected(),
            "visit recorded"
        );

        let notice = if visit.is_successful() {
            let today = self.clock.today();
            let collected: Money = self
                .store
                .visits_between(today, today)
                .await?
                .iter()
                .map(Visit::collected)
                .sum();
            Notice::daily_goal(collected, self.settings.goals().daily)
        } else {
            None
        };
        Ok(VisitReceipt { visit, notice })
    }

    pub async fn productivity(
        &self,
        session: &Session,
        period: Period,
    ) -> Result<ProductivityReport> {
        self.authorize(session)?;
        let today = self.clock.today();
        let (from, to) = period.range(today);
        let visits = self.store.visits_between(from, to).await?;
        Ok(report::productivity(
            &visits,
            period,
            today,
            &self.settings.goals(),
            self.settings.minutes_per_visit,
        ))
    }

    /// Number of queued entries not yet acknowledged by the sync endpoint.
    pub async fn pending_sync(&self) -> Result<usize> {
        Ok(self.store.unsynced().await?.len())
    }

    /// Replays queued entries, oldest first, until the sink fails.
    ///
    /// An entry is marked synced only after the sink acknowledges it, so a
    /// failure leaves it and everything after it queued for the next replay.
    pub async fn sync(&self, session: &Session, sink: &dyn SyncSink) -> Result<SyncOutcome> {
        self.authorize(session)?;
        let queued = self.store.unsynced().await?;
        let mut report = ReplayReport::default();

        for entry in &queued {
            match sink.deliver(entry).await {
                Ok(delivery) => {
                    self.store.mark_synced(entry.id).await?;
                    match delivery {
                        Delivery::Accepted => report.delivered += 1,
                        Delivery::Duplicate => report.duplicates += 1,
                    }
                }
                Err(e) => {
                    warn!(entry_id = %entry.id, key = %entry.natural_key, error = %e, "sync stopped");
                    report.failure = Some(e.to_string());
                    break;
                }
            }
        }
        report.remaining = queued.len() - report.acknowledged();

        let cleared = self.store.clear_synced().await?;
        info!(
            delivered = report.delivered,
            duplicates = report.duplicates,
            remaining = report.remaining,
            cleared,
            "sync finished"
        );
        let notice = Notice::synced(report.acknowledged());
        Ok(SyncOutcome { report, notice })
    }
}
