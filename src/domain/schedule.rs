//! Installment schedule generation.
//!
//! Each cadence has a nominal installment size. The count is
//! `ceil(total / nominal)` and the remainder is spread evenly, so every
//! installment carries `total / count` rounded to cents. The rounded sum may
//! miss the total by a few cents; that drift is accepted.

use super::client::Cadence;
use super::ids::ClientId;
use super::installment::{Installment, Position};
use super::money::{Amount, Money};
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// Upper bound on schedule length, ten years of weekly installments.
pub const MAX_INSTALLMENTS: u32 = 520;

/// Nominal installment size per cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTerms {
    pub weekly: Money,
    pub biweekly: Money,
    pub monthly: Money,
}

impl Default for ScheduleTerms {
    fn default() -> Self {
        Self {
            weekly: Money::new(dec!(50)),
            biweekly: Money::new(dec!(100)),
            monthly: Money::new(dec!(150)),
        }
    }
}

impl ScheduleTerms {
    pub fn nominal(&self, cadence: Cadence) -> Money {
        match cadence {
            Cadence::Weekly => self.weekly,
            Cadence::Biweekly => self.biweekly,
            Cadence::Monthly => self.monthly,
        }
    }
}

/// Due date of the installment at zero-based `index`.
///
/// Weekly and biweekly add 7 and 15 days per step. Monthly adds calendar
/// months to the start date, clamping to the last day of shorter months
/// (Jan 31 → Feb 29 → Mar 31).
pub fn due_date(start: NaiveDate, cadence: Cadence, index: u32) -> Result<NaiveDate> {
    let due = match cadence {
        Cadence::Weekly => start.checked_add_days(Days::new(7 * u64::from(index))),
        Cadence::Biweekly => start.checked_add_days(Days::new(15 * u64::from(index))),
        Cadence::Monthly => start.checked_add_months(Months::new(index)),
    };
    due.ok_or_else(|| CrediarioError::validation("Due date out of range"))
}

/// The shape of a schedule before it is attached to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    pub cadence: Cadence,
    pub count: u32,
    pub installment_amount: Money,
    pub due_dates: Vec<NaiveDate>,
}

impl SchedulePlan {
    pub fn total(&self) -> Money {
        self.due_dates.iter().map(|_| self.installment_amount).sum()
    }
}

pub fn plan(
    total: Amount,
    cadence: Cadence,
    start: NaiveDate,
    terms: &ScheduleTerms,
) -> Result<SchedulePlan> {
    let nominal = terms.nominal(cadence);
    if !nominal.is_positive() {
        return Err(CrediarioError::validation(format!(
            "Nominal {cadence} installment must be positive"
        )));
    }
    let count = (total.value() / nominal.value())
        .ceil()
        .to_u32()
        .filter(|count| (1..=MAX_INSTALLMENTS).contains(count))
        .ok_or_else(|| CrediarioError::validation("Too many installments for this total"))?;
    let installment_amount = Money::rounded(total.value() / rust_decimal::Decimal::from(count));
    let due_dates = (0..count)
        .map(|i| due_date(start, cadence, i))
        .collect::<Result<Vec<_>>>()?;

    Ok(SchedulePlan {
        cadence,
        count,
        installment_amount,
        due_dates,
    })
}

/// Builds the pending installments for a freshly registered client.
pub fn generate(
    client_id: ClientId,
    total: Amount,
    cadence: Cadence,
    start: NaiveDate,
    terms: &ScheduleTerms,
    now: DateTime<Utc>,
) -> Result<Vec<Installment>> {
    let plan = plan(total, cadence, start, terms)?;
    Ok(plan
        .due_dates
        .iter()
        .zip(1..)
        .map(|(due, number)| {
            Installment::pending(
                client_id,
                Position::new(number),
                plan.installment_amount,
                *due,
                now,
            )
        })
        .collect())
}
