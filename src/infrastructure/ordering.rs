//! Listing orders every store adapter returns.

use crate::domain::boleto::Boleto;
use crate::domain::client::Client;
use crate::domain::expense::Expense;
use crate::domain::installment::Installment;
use crate::domain::outbox::OutboxEntry;
use crate::domain::visit::Visit;
use std::cmp::Reverse;

pub(crate) fn clients(rows: &mut [Client]) {
    rows.sort_by_key(|c| (Reverse(c.created_at), c.id.as_uuid()));
}

pub(crate) fn installments(rows: &mut [Installment]) {
    rows.sort_by_key(|i| (i.client_id.as_uuid(), i.ordering_key()));
}

pub(crate) fn schedule(rows: &mut [Installment]) {
    rows.sort_by_key(Installment::ordering_key);
}

pub(crate) fn boletos(rows: &mut [Boleto]) {
    rows.sort_by_key(|b| (b.due_date, b.created_at));
}

pub(crate) fn expenses(rows: &mut [Expense]) {
    rows.sort_by_key(|e| Reverse((e.expense_date, e.created_at)));
}

pub(crate) fn visits(rows: &mut [Visit]) {
    rows.sort_by_key(|v| (v.recorded_at, v.id.as_uuid()));
}

pub(crate) fn outbox(rows: &mut [OutboxEntry]) {
    rows.sort_by_key(|e| (e.created_at, e.id.as_uuid()));
}
