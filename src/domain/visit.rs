use super::ids::{ClientId, VisitId};
use super::money::{Amount, Money};
use super::route::GeoPoint;
use crate::error::{Capability, CrediarioError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Camera captures arrive as image data URLs.
const PHOTO_PREFIX: &str = "data:image/";

/// Outcome of a door-to-door visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[serde(alias = "pago")]
    Paid,
    #[serde(alias = "parcial")]
    Partial,
    #[serde(alias = "visitado")]
    Visited,
    #[serde(alias = "nao_estava")]
    NotHome,
    #[serde(alias = "reagendado")]
    Rescheduled,
}

impl VisitStatus {
    pub fn collects_money(&self) -> bool {
        matches!(self, VisitStatus::Paid | VisitStatus::Partial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub client_id: ClientId,
    pub status: VisitStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub amount_received: Option<Money>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    /// Captured photo as an image data URL.
    #[serde(default)]
    pub photo: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Visit {
    pub fn is_successful(&self) -> bool {
        self.status.collects_money()
    }

    pub fn collected(&self) -> Money {
        self.amount_received.unwrap_or_default()
    }
}

/// Check-in form filled at the client's door.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckIn {
    pub client_id: ClientId,
    pub status: Option<VisitStatus>,
    pub notes: String,
    pub amount_received: Option<Decimal>,
    pub location: Option<GeoPoint>,
    pub photo: Option<String>,
}

impl CheckIn {
    pub fn new(client_id: ClientId, status: VisitStatus) -> Self {
        Self {
            client_id,
            status: Some(status),
            notes: String::new(),
            amount_received: None,
            location: None,
            photo: None,
        }
    }

    pub fn into_visit(self, now: DateTime<Utc>) -> Result<Visit> {
        let status = self
            .status
            .ok_or_else(|| CrediarioError::validation("Select the visit status"))?;
        let amount_received = match (status.collects_money(), self.amount_received) {
            (true, None) => {
                return Err(CrediarioError::validation("Enter the amount received"));
            }
            (true, Some(value)) => Some(Money::from(Amount::new(value)?)),
            (false, Some(_)) => {
                return Err(CrediarioError::validation(
                    "Amount received only applies to paid or partial visits",
                ));
            }
            (false, None) => None,
        };
        let photo = self.photo.filter(|p| !p.is_empty());
        if let Some(photo) = &photo
            && !photo.starts_with(PHOTO_PREFIX)
        {
            return Err(CrediarioError::CapabilityError {
                capability: Capability::Camera,
                reason: "Camera capture did not produce an image".to_string(),
            });
        }
        Ok(Visit {
            id: VisitId::new(),
            client_id: self.client_id,
            status,
            notes: self.notes.trim().to_string(),
            amount_received,
            location: self.location,
            photo,
            recorded_at: now,
        })
    }
}
