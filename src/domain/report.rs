//! Dashboard metrics and productivity reporting.

use super::client::Client;
use super::ids::{ClientId, InstallmentId};
use super::installment::{Installment, InstallmentStatus};
use super::money::Money;
use super::notice::goal_progress;
use super::visit::Visit;
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardMetrics {
    pub total_clients: usize,
    /// Open installments due today.
    pub due_today: Money,
    pub overdue: Money,
    pub received: Money,
}

/// One stop on today's collection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueCollection {
    pub installment_id: InstallmentId,
    pub client_id: ClientId,
    pub client_name: String,
    pub phone: String,
    pub address: String,
    pub amount: Money,
}

pub fn dashboard(
    clients: &[Client],
    installments: &[Installment],
    today: NaiveDate,
) -> DashboardMetrics {
    let mut metrics = DashboardMetrics {
        total_clients: clients.len(),
        ..DashboardMetrics::default()
    };
    for installment in installments {
        match installment.effective_status(today) {
            InstallmentStatus::Paid => metrics.received += installment.amount,
            InstallmentStatus::Overdue => metrics.overdue += installment.amount,
            InstallmentStatus::Pending if installment.due_date == today => {
                metrics.due_today += installment.amount
            }
            InstallmentStatus::Pending => {}
        }
    }
    metrics
}

/// Open installments due today joined with their client's contact details.
pub fn collections_for(
    clients: &[Client],
    installments: &[Installment],
    today: NaiveDate,
) -> Vec<DueCollection> {
    let by_id: HashMap<ClientId, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    installments
        .iter()
        .filter(|i| i.is_open() && i.due_date == today)
        .filter_map(|i| {
            by_id.get(&i.client_id).map(|client| DueCollection {
                installment_id: i.id,
                client_id: client.id,
                client_name: client.name.clone(),
                phone: client.phone.clone(),
                address: client.address.clone(),
                amount: i.amount,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Today,
    Week,
    Month,
}

impl Period {
    /// Inclusive date range ending today: the day, the week since Monday, or
    /// the month since the 1st.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            Period::Today => today,
            Period::Week => today
                .checked_sub_days(Days::new(u64::from(
                    today.weekday().num_days_from_monday(),
                )))
                .unwrap_or(today),
            Period::Month => today.with_day(1).unwrap_or(today),
        };
        (start, today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goals {
    pub daily: Money,
    pub weekly: Money,
    pub monthly: Money,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            daily: Money::new(dec!(500)),
            weekly: Money::new(dec!(3000)),
            monthly: Money::new(dec!(12000)),
        }
    }
}

impl Goals {
    pub fn for_period(&self, period: Period) -> Money {
        match period {
            Period::Today => self.daily,
            Period::Week => self.weekly,
            Period::Month => self.monthly,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyProductivity {
    pub date: NaiveDate,
    pub visits: usize,
    pub collected: Money,
    pub distance_km: f64,
    /// Successful visits as a percentage of visits.
    pub efficiency: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductivityReport {
    pub period: Period,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_visits: usize,
    pub successful_visits: usize,
    pub total_collected: Money,
    pub average_per_visit: Money,
    pub conversion_rate: Decimal,
    pub distance_km: f64,
    pub minutes_spent: u64,
    pub goal: Money,
    pub goal_progress: Decimal,
    pub days: Vec<DailyProductivity>,
}

fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(part) * dec!(100) / Decimal::from(whole)).round_dp(2)
}

/// Sum of legs between consecutive located visits.
fn travelled_km(visits: &[&Visit]) -> f64 {
    visits
        .iter()
        .filter_map(|v| v.location)
        .collect::<Vec<_>>()
        .windows(2)
        .map(|pair| pair[0].distance_km(&pair[1]))
        .sum()
}

/// Builds the report from the visits recorded in the period.
///
/// Visits outside the period's range are ignored, so the caller may pass a
/// wider slice.
pub fn productivity(
    visits: &[Visit],
    period: Period,
    today: NaiveDate,
    goals: &Goals,
    minutes_per_visit: u32,
) -> ProductivityReport {
    let (from, to) = period.range(today);
    let mut in_range: Vec<&Visit> = visits
        .iter()
        .filter(|v| (from..=to).contains(&v.recorded_at.date_naive()))
        .collect();
    in_range.sort_by_key(|v| v.recorded_at);

    let mut by_day: BTreeMap<NaiveDate, Vec<&Visit>> = BTreeMap::new();
    for visit in &in_range {
        by_day.entry(visit.recorded_at.date_naive()).or_default().push(visit);
    }
    let days: Vec<DailyProductivity> = by_day
        .into_iter()
        .map(|(date, day)| DailyProductivity {
            date,
            visits: day.len(),
            collected: day.iter().map(|v| v.collected()).sum(),
            distance_km: travelled_km(&day),
            efficiency: percentage(day.iter().filter(|v| v.is_successful()).count(), day.len()),
        })
        .collect();

    let total_visits = in_range.len();
    let successful_visits = in_range.iter().filter(|v| v.is_successful()).count();
    let total_collected: Money = in_range.iter().map(|v| v.collected()).sum();
    let average_per_visit = if total_visits == 0 {
        Money::ZERO
    } else {
        Money::rounded(total_collected.value() / Decimal::from(total_visits))
    };
    let goal = goals.for_period(period);

    ProductivityReport {
        period,
        from,
        to,
        total_visits,
        successful_visits,
        total_collected,
        average_per_visit,
        conversion_rate: percentage(successful_visits, total_visits),
        distance_km: days.iter().map(|d| d.distance_km).sum(),
        minutes_spent: total_visits as u64 * u64::from(minutes_per_visit),
        goal,
        goal_progress: goal_progress(total_collected, goal),
        days,
    }
}
