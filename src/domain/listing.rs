//! Collection-order client listing.
//!
//! Clients with something due today come first, then clients ordered by
//! their next open due date, then clients with nothing left to collect,
//! newest registration first.

use super::client::Client;
use super::ids::ClientId;
use super::installment::Installment;
use super::money::Money;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSummary {
    pub client: Client,
    /// Earliest due date among open installments, overdue ones included.
    pub next_due: Option<NaiveDate>,
    pub due_today: bool,
    pub open_installments: usize,
    pub open_amount: Money,
}

/// Joins clients with their open installments as of `today`.
pub fn summarize(
    clients: Vec<Client>,
    installments: &[Installment],
    today: NaiveDate,
) -> Vec<ClientSummary> {
    let mut open: HashMap<ClientId, Vec<&Installment>> = HashMap::new();
    for installment in installments.iter().filter(|i| i.is_open()) {
        open.entry(installment.client_id).or_default().push(installment);
    }

    clients
        .into_iter()
        .map(|client| {
            let mine = open.get(&client.id).map(Vec::as_slice).unwrap_or_default();
            ClientSummary {
                next_due: mine.iter().map(|i| i.due_date).min(),
                due_today: mine.iter().any(|i| i.due_date == today),
                open_installments: mine.len(),
                open_amount: mine.iter().map(|i| i.amount).sum(),
                client,
            }
        })
        .collect()
}

pub fn collection_order(a: &ClientSummary, b: &ClientSummary) -> Ordering {
    b.due_today.cmp(&a.due_today).then_with(|| {
        match (a.next_due, b.next_due) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| b.client.created_at.cmp(&a.client.created_at))
    })
}

pub fn sort_for_collection(summaries: &mut [ClientSummary]) {
    summaries.sort_by(collection_order);
}

/// Case-insensitive match on name or address, plain substring on phone.
pub fn matches_search(client: &Client, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let lowered = term.to_lowercase();
    client.name.to_lowercase().contains(&lowered)
        || client.phone.contains(term)
        || client.address.to_lowercase().contains(&lowered)
}
