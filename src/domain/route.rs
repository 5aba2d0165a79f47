//! Distance-sorted client listing and route planning for door-to-door
//! collection.

use super::client::Client;
use crate::error::{Capability, CrediarioError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CrediarioError::validation("Latitude must be between -90 and 90"));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CrediarioError::validation(
                "Longitude must be between -180 and 180",
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Distance,
    Name,
    Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientDistance {
    pub client: Client,
    /// `None` when either end has no known position.
    pub distance_km: Option<f64>,
}

pub fn with_distances(clients: Vec<Client>, origin: Option<GeoPoint>) -> Vec<ClientDistance> {
    clients
        .into_iter()
        .map(|client| {
            let distance_km = match (origin, client.location) {
                (Some(origin), Some(location)) => Some(origin.distance_km(&location)),
                _ => None,
            };
            ClientDistance {
                client,
                distance_km,
            }
        })
        .collect()
}

fn by_distance(a: &ClientDistance, b: &ClientDistance) -> Ordering {
    match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort; unknown distances go last.
pub fn sort_clients(list: &mut [ClientDistance], by: SortBy) {
    match by {
        SortBy::Distance => list.sort_by(by_distance),
        SortBy::Name => list.sort_by_cached_key(|c| c.client.name.to_lowercase()),
        SortBy::Amount => {
            list.sort_by(|a, b| b.client.total_amount.cmp(&a.client.total_amount))
        }
    }
}

/// Nearby clients to visit, nearest first, as a round trip from `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub origin: GeoPoint,
    pub stops: Vec<ClientDistance>,
    pub total_km: f64,
}

pub fn plan_route(
    clients: Vec<Client>,
    origin: Option<GeoPoint>,
    radius_km: f64,
    max_stops: usize,
) -> Result<RoutePlan> {
    let origin = origin.ok_or_else(|| CrediarioError::CapabilityError {
        capability: Capability::Geolocation,
        reason: "Current location is not available".to_string(),
    })?;

    let mut nearby: Vec<ClientDistance> = with_distances(clients, Some(origin))
        .into_iter()
        .filter(|c| c.distance_km.is_some_and(|d| d <= radius_km))
        .collect();
    sort_clients(&mut nearby, SortBy::Distance);
    nearby.truncate(max_stops);

    if nearby.is_empty() {
        return Err(CrediarioError::validation("No clients nearby"));
    }

    let mut total_km = 0.0;
    let mut here = origin;
    for stop in &nearby {
        if let Some(location) = stop.client.location {
            total_km += here.distance_km(&location);
            here = location;
        }
    }
    total_km += here.distance_km(&origin);

    Ok(RoutePlan {
        origin,
        stops: nearby,
        total_km,
    })
}
