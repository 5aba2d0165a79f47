//! Applying a tendered payment to one installment.
//!
//! A payment equal to the installment amount settles it in place. A smaller
//! payment settles the installment for the tendered amount and carves the
//! rest into a new pending installment. Either way the client's running paid
//! total grows by the tendered amount. The result is a set of record changes
//! that must be committed together.

use super::client::Client;
use super::installment::Installment;
use super::money::{Amount, Money};
use super::ports::ChangeSet;
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Full,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub kind: PaymentKind,
    pub tendered: Money,
    /// The original installment, now paid for the tendered amount.
    pub paid: Installment,
    /// What is left to collect after a partial payment.
    pub remainder: Option<Installment>,
    /// The client with its paid total updated.
    pub client: Client,
}

impl Reconciliation {
    pub fn changes(&self) -> ChangeSet {
        let changes = ChangeSet::new()
            .update(self.paid.clone())
            .update(self.client.clone());
        match &self.remainder {
            Some(remainder) => changes.insert(remainder.clone()),
            None => changes,
        }
    }
}

/// Checks a tendered amount against what the installment still owes.
pub fn validate_tender(installment: &Installment, tendered: Decimal) -> Result<Money> {
    let outstanding = installment.amount;
    if tendered <= Decimal::ZERO || tendered > outstanding.value() {
        return Err(CrediarioError::validation(format!(
            "Payment must be between 0.01 and {outstanding}"
        )));
    }
    Ok(Amount::new(tendered)?.into())
}

/// Works out the records a payment produces. Nothing is mutated in place;
/// the caller commits [`Reconciliation::changes`].
///
/// `reschedule_to` sets the remainder's due date after a partial payment and
/// defaults to the original due date.
pub fn reconcile(
    client: &Client,
    installment: &Installment,
    tendered: Decimal,
    reschedule_to: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<Reconciliation> {
    if installment.client_id != client.id {
        return Err(CrediarioError::validation(
            "Installment does not belong to this client",
        ));
    }
    if !installment.is_open() {
        return Err(CrediarioError::Conflict(format!(
            "Installment {} is already paid",
            installment.position
        )));
    }
    let tendered = validate_tender(installment, tendered)?;
    let outstanding = installment.amount;
    let today = now.date_naive();

    let mut paid = installment.clone();
    let (kind, remainder) = if tendered == outstanding {
        (PaymentKind::Full, None)
    } else {
        let remainder = Installment::pending(
            installment.client_id,
            installment.position.remainder(),
            outstanding - tendered,
            reschedule_to.unwrap_or(installment.due_date),
            now,
        );
        (PaymentKind::Partial, Some(remainder))
    };
    paid.settle(tendered, today, now);

    let mut client = client.clone();
    client.credit(tendered, now);

    Ok(Reconciliation {
        kind,
        tendered,
        paid,
        remainder,
        client,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::{Cadence, NewClient};
    use crate::domain::installment::{InstallmentStatus, Position};
    use crate::domain::ports::{Change, Record};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap()
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn fixture() -> (Client, Installment) {
        let client = NewClient {
            name: "João".to_string(),
            phone: "11".to_string(),
            address: "Rua B, 2".to_string(),
            total_amount: dec!(300),
            cadence: Some(Cadence::Biweekly),
            first_payment_date: Some(due()),
            location: None,
        }
        .into_client(now())
        .unwrap()
        .client;
        let installment = Installment::pending(
            client.id,
            Position::new(1),
            Money::new(dec!(100)),
            due(),
            now(),
        );
        (client, installment)
    }

    #[test]
    fn test_full_payment() {
        let (client, installment) = fixture();
        let result = reconcile(&client, &installment, dec!(100), None, now()).unwrap();

        assert_eq!(result.kind, PaymentKind::Full);
        assert!(result.remainder.is_none());
        assert_eq!(result.paid.id, installment.id);
        assert_eq!(result.paid.status, InstallmentStatus::Paid);
        assert_eq!(result.paid.amount, Money::new(dec!(100)));
        assert_eq!(result.paid.payment_date, Some(now().date_naive()));
        assert_eq!(result.client.paid_amount, Money::new(dec!(100)));
        assert_eq!(result.changes().len(), 2);
    }

    #[test]
    fn test_partial_payment_splits_installment() {
        let (client, installment) = fixture();
        let result = reconcile(&client, &installment, dec!(40), None, now()).unwrap();

        assert_eq!(result.kind, PaymentKind::Partial);
        assert_eq!(result.paid.id, installment.id);
        assert_eq!(result.paid.amount, Money::new(dec!(40)));
        assert_eq!(result.paid.status, InstallmentStatus::Paid);

        let remainder = result.remainder.as_ref().unwrap();
        assert_ne!(remainder.id, installment.id);
        assert_eq!(remainder.client_id, client.id);
        assert_eq!(remainder.amount, Money::new(dec!(60)));
        assert_eq!(remainder.status, InstallmentStatus::Pending);
        assert_eq!(remainder.due_date, due());
        assert_eq!(remainder.position, Position { number: 1, split: 1 });
        assert_eq!(remainder.payment_date, None);

        assert_eq!(result.client.paid_amount, Money::new(dec!(40)));

        let changes = result.changes();
        assert_eq!(changes.len(), 3);
        assert!(
            changes
                .changes()
                .iter()
                .any(|c| matches!(c, Change::Insert(Record::Installment(i)) if i.id == remainder.id))
        );
    }

    #[test]
    fn test_partial_payment_with_new_due_date() {
        let (client, installment) = fixture();
        let new_date = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let result = reconcile(&client, &installment, dec!(30), Some(new_date), now()).unwrap();
        assert_eq!(result.remainder.unwrap().due_date, new_date);
    }

    #[test]
    fn test_splitting_a_remainder_again() {
        let (client, installment) = fixture();
        let first = reconcile(&client, &installment, dec!(40), None, now()).unwrap();
        let remainder = first.remainder.unwrap();
        let second = reconcile(&first.client, &remainder, dec!(10), None, now()).unwrap();

        let second_remainder = second.remainder.unwrap();
        assert_eq!(second_remainder.position, Position { number: 1, split: 2 });
        assert_eq!(second_remainder.amount, Money::new(dec!(50)));
        assert_eq!(second.client.paid_amount, Money::new(dec!(50)));
    }

    #[test]
    fn test_invalid_tender_is_rejected() {
        let (client, installment) = fixture();
        for tendered in [dec!(0), dec!(-5), dec!(100.01), dec!(250)] {
            let err = reconcile(&client, &installment, tendered, None, now()).unwrap_err();
            assert!(err.is_validation(), "{tendered} should be rejected");
        }
    }

    #[test]
    fn test_paid_installment_cannot_be_paid_again() {
        let (client, installment) = fixture();
        let result = reconcile(&client, &installment, dec!(100), None, now()).unwrap();
        let err = reconcile(&result.client, &result.paid, dec!(100), None, now()).unwrap_err();
        assert!(matches!(err, CrediarioError::Conflict(_)));
    }

    #[test]
    fn test_overdue_installment_can_be_paid() {
        let (client, mut installment) = fixture();
        installment.mark_overdue(now().date_naive(), now());
        assert_eq!(installment.status, InstallmentStatus::Overdue);
        let result = reconcile(&client, &installment, dec!(100), None, now()).unwrap();
        assert_eq!(result.paid.status, InstallmentStatus::Paid);
    }

    #[test]
    fn test_installment_of_another_client_is_rejected() {
        let (client, _) = fixture();
        let (_, other) = fixture();
        assert!(reconcile(&client, &other, dec!(10), None, now()).is_err());
    }
}
