use super::ids::{ClientId, InstallmentId};
use super::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallmentStatus::Pending => f.write_str("pending"),
            InstallmentStatus::Paid => f.write_str("paid"),
            InstallmentStatus::Overdue => f.write_str("overdue"),
        }
    }
}

/// Where an installment sits in its client's schedule.
///
/// `number` is the 1-based sequence shown to people. `split` is 0 for
/// installments produced by the scheduler and grows by one each time a
/// partial payment carves a remainder off, so `(number, split)` stays unique
/// per client even after repeated splits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub number: u32,
    pub split: u32,
}

impl Position {
    pub fn new(number: u32) -> Self {
        Self { number, split: 0 }
    }

    /// Position of the remainder created when this installment is split.
    pub fn remainder(&self) -> Self {
        Self {
            number: self.number,
            split: self.split + 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.split == 0 {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{}.{}", self.number, self.split)
        }
    }
}

/// One scheduled due amount within a client's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub client_id: ClientId,
    pub position: Position,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    /// Set exactly when `status` is `Paid`.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every modification.
    #[serde(default)]
    pub revision: u64,
}

impl Installment {
    pub fn pending(
        client_id: ClientId,
        position: Position,
        amount: Money,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InstallmentId::new(),
            client_id,
            position,
            amount,
            due_date,
            status: InstallmentStatus::Pending,
            payment_date: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Pending or overdue.
    pub fn is_open(&self) -> bool {
        self.status != InstallmentStatus::Paid
    }

    /// Status as of `today`, treating pending installments past their due
    /// date as overdue even before the sweep has run.
    pub fn effective_status(&self, today: NaiveDate) -> InstallmentStatus {
        match self.status {
            InstallmentStatus::Pending if self.due_date < today => InstallmentStatus::Overdue,
            status => status,
        }
    }

    /// Flags a pending installment as overdue. Returns whether it changed.
    pub fn mark_overdue(&mut self, today: NaiveDate, now: DateTime<Utc>) -> bool {
        if self.status == InstallmentStatus::Pending && self.due_date < today {
            self.status = InstallmentStatus::Overdue;
            self.updated_at = now;
            self.revision += 1;
            true
        } else {
            false
        }
    }

    pub fn settle(&mut self, amount: Money, paid_on: NaiveDate, now: DateTime<Utc>) {
        self.amount = amount;
        self.status = InstallmentStatus::Paid;
        self.payment_date = Some(paid_on);
        self.updated_at = now;
        self.revision += 1;
    }

    /// Schedule order: due date, then position.
    pub fn ordering_key(&self) -> (NaiveDate, Position) {
        (self.due_date, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_position_display_and_remainder() {
        let p = Position::new(3);
        assert_eq!(p.to_string(), "3");
        assert_eq!(p.remainder().to_string(), "3.1");
        assert_eq!(p.remainder().remainder(), Position { number: 3, split: 2 });
        assert!(p < p.remainder());
        assert!(p.remainder() < Position::new(4));
    }

    #[test]
    fn test_effective_status_and_sweep() {
        let mut installment = Installment::pending(
            ClientId::new(),
            Position::new(1),
            Money::new(dec!(50)),
            date(2024, 5, 10),
            Utc::now(),
        );
        assert_eq!(
            installment.effective_status(date(2024, 5, 10)),
            InstallmentStatus::Pending
        );
        assert_eq!(
            installment.effective_status(date(2024, 5, 11)),
            InstallmentStatus::Overdue
        );

        assert!(!installment.mark_overdue(date(2024, 5, 10), Utc::now()));
        assert!(installment.mark_overdue(date(2024, 5, 11), Utc::now()));
        assert_eq!(installment.status, InstallmentStatus::Overdue);
        assert!(installment.is_open());
    }

    #[test]
    fn test_paid_installments_are_not_swept() {
        let mut installment = Installment::pending(
            ClientId::new(),
            Position::new(1),
            Money::new(dec!(50)),
            date(2024, 5, 10),
            Utc::now(),
        );
        installment.settle(Money::new(dec!(50)), date(2024, 5, 9), Utc::now());
        assert!(!installment.mark_overdue(date(2024, 6, 1), Utc::now()));
        assert_eq!(installment.payment_date, Some(date(2024, 5, 9)));
        assert!(!installment.is_open());
    }

    #[test]
    fn test_missing_payment_date_deserializes_as_none() {
        let json = serde_json::json!({
            "id": InstallmentId::new(),
            "client_id": ClientId::new(),
            "position": { "number": 1, "split": 0 },
            "amount": "50.00",
            "due_date": "2024-05-10",
            "status": "pending",
            "created_at": "2024-05-01T00:00:00Z",
            "updated_at": "2024-05-01T00:00:00Z"
        });
        let installment: Installment = serde_json::from_value(json).unwrap();
        assert_eq!(installment.payment_date, None);
        assert_eq!(installment.amount, Money::new(dec!(50)));
    }
}
