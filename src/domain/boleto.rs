use super::ids::BoletoId;
use super::money::{Amount, Money};
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoletoStatus {
    Pending,
    Paid,
}

/// Status as shown in the boleto list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoletoDisplay {
    Pending,
    Overdue,
    Paid,
}

/// A bank slip the business itself has to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boleto {
    pub id: BoletoId,
    pub description: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: BoletoStatus,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every modification.
    #[serde(default)]
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBoleto {
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

impl NewBoleto {
    pub fn into_boleto(self, now: DateTime<Utc>) -> Result<Boleto> {
        if self.description.trim().is_empty() {
            return Err(CrediarioError::validation("Description is required"));
        }
        let amount = Amount::new(self.amount)?;
        Ok(Boleto {
            id: BoletoId::new(),
            description: self.description.trim().to_string(),
            amount: amount.into(),
            due_date: self.due_date,
            status: BoletoStatus::Pending,
            payment_date: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }
}

impl Boleto {
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status == BoletoStatus::Paid {
            return Err(CrediarioError::Conflict("Boleto is already paid".to_string()));
        }
        self.status = BoletoStatus::Paid;
        self.payment_date = Some(now.date_naive());
        self.updated_at = now;
        self.revision += 1;
        Ok(())
    }

    pub fn display_status(&self, today: NaiveDate) -> BoletoDisplay {
        match self.status {
            BoletoStatus::Paid => BoletoDisplay::Paid,
            BoletoStatus::Pending if today > self.due_date => BoletoDisplay::Overdue,
            BoletoStatus::Pending => BoletoDisplay::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn boleto() -> Boleto {
        NewBoleto {
            description: "Fornecedor".to_string(),
            amount: dec!(320.50),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        }
        .into_boleto(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_display_status() {
        let b = boleto();
        let on_due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        assert_eq!(b.display_status(on_due), BoletoDisplay::Pending);
        assert_eq!(
            b.display_status(on_due.succ_opt().unwrap()),
            BoletoDisplay::Overdue
        );
    }

    #[test]
    fn test_mark_paid_once() {
        let mut b = boleto();
        let now = Utc.with_ymd_and_hms(2024, 4, 12, 9, 0, 0).unwrap();
        b.mark_paid(now).unwrap();
        assert_eq!(b.status, BoletoStatus::Paid);
        assert_eq!(b.payment_date, NaiveDate::from_ymd_opt(2024, 4, 12));
        assert_eq!(b.display_status(now.date_naive()), BoletoDisplay::Paid);
        assert!(matches!(b.mark_paid(now), Err(CrediarioError::Conflict(_))));
    }

    #[test]
    fn test_new_boleto_validation() {
        let blank = NewBoleto {
            description: " ".to_string(),
            amount: dec!(10),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        };
        assert!(blank.into_boleto(Utc::now()).is_err());

        let negative = NewBoleto {
            description: "Luz".to_string(),
            amount: dec!(-10),
            due_date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
        };
        assert!(negative.into_boleto(Utc::now()).is_err());
    }
}
