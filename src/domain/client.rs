use super::ids::ClientId;
use super::money::{Amount, Money};
use super::route::GeoPoint;
use crate::error::{CrediarioError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How often a client pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    #[serde(alias = "semanal")]
    Weekly,
    #[serde(alias = "quinzenal")]
    Biweekly,
    #[serde(alias = "mensal")]
    Monthly,
}

impl Cadence {
    pub const ALL: [Cadence; 3] = [Cadence::Weekly, Cadence::Biweekly, Cadence::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Biweekly => "biweekly",
            Cadence::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cadence {
    type Err = CrediarioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "semanal" => Ok(Cadence::Weekly),
            "biweekly" | "quinzenal" => Ok(Cadence::Biweekly),
            "monthly" | "mensal" => Ok(Cadence::Monthly),
            other => Err(CrediarioError::validation(format!(
                "Unknown payment cadence '{other}'"
            ))),
        }
    }
}

/// A customer buying on installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub phone: String,
    pub address: String,
    /// Contracted amount at registration.
    pub total_amount: Money,
    /// Sum of every payment reconciled so far.
    pub paid_amount: Money,
    #[serde(rename = "payment_type")]
    pub cadence: Cadence,
    pub first_payment_date: NaiveDate,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by every modification.
    #[serde(default)]
    pub revision: u64,
}

impl Client {
    /// What is still owed on the contract, never below zero.
    pub fn outstanding(&self) -> Money {
        let owed = self.total_amount - self.paid_amount;
        if owed.is_positive() { owed } else { Money::ZERO }
    }

    /// Adds a reconciled payment to the running total.
    pub fn credit(&mut self, amount: Money, now: DateTime<Utc>) {
        self.paid_amount += amount;
        self.updated_at = now;
        self.revision += 1;
        if self.paid_amount > self.total_amount {
            warn!(
                client_id = %self.id,
                paid = %self.paid_amount,
                total = %self.total_amount,
                "client paid more than the contracted amount"
            );
        }
    }
}

/// Registration form for a new client, as typed in.
///
/// Cadence and first payment date are optional here so a half-filled form can
/// be represented and rejected by [`NewClient::into_client`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewClient {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub total_amount: Decimal,
    pub cadence: Option<Cadence>,
    pub first_payment_date: Option<NaiveDate>,
    pub location: Option<GeoPoint>,
}

/// A registration that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedClient {
    pub client: Client,
    pub total: Amount,
}

impl NewClient {
    pub fn into_client(self, now: DateTime<Utc>) -> Result<ValidatedClient> {
        let required = [
            ("Name", &self.name),
            ("Phone", &self.phone),
            ("Address", &self.address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CrediarioError::validation(format!("{field} is required")));
            }
        }
        let total = Amount::new(self.total_amount)?;
        let cadence = self
            .cadence
            .ok_or_else(|| CrediarioError::validation("Payment cadence is required"))?;
        let first_payment_date = self
            .first_payment_date
            .ok_or_else(|| CrediarioError::validation("First payment date is required"))?;

        Ok(ValidatedClient {
            client: Client {
                id: ClientId::new(),
                name: self.name.trim().to_string(),
                phone: self.phone.trim().to_string(),
                address: self.address.trim().to_string(),
                total_amount: total.into(),
                paid_amount: Money::ZERO,
                cadence,
                first_payment_date,
                location: self.location,
                created_at: now,
                updated_at: now,
                revision: 0,
            },
            total,
        })
    }
}
