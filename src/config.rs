//! Runtime settings: built-in defaults, then an optional file, then
//! `CREDIARIO_*` environment variables.

use crate::domain::money::Money;
use crate::domain::report::Goals;
use crate::domain::schedule::ScheduleTerms;
use crate::error::Result;
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_PREFIX: &str = "CREDIARIO";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub weekly_installment: Decimal,
    pub biweekly_installment: Decimal,
    pub monthly_installment: Decimal,
    pub session_ttl_hours: u32,
    pub route_radius_km: f64,
    pub route_max_waypoints: usize,
    pub daily_goal: Decimal,
    pub weekly_goal: Decimal,
    pub monthly_goal: Decimal,
    pub minutes_per_visit: u32,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weekly_installment: dec!(50),
            biweekly_installment: dec!(100),
            monthly_installment: dec!(150),
            session_ttl_hours: 24,
            route_radius_km: 10.0,
            route_max_waypoints: 8,
            daily_goal: dec!(500),
            weekly_goal: dec!(3000),
            monthly_goal: dec!(12000),
            minutes_per_visit: 15,
            log_filter: "info,crediario=debug".to_string(),
        }
    }
}

impl Settings {
    /// Layers the optional settings file and the environment over the defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with(file, Self::environment())
    }

    /// Settings are flat, so `CREDIARIO_DAILY_GOAL` maps to `daily_goal`.
    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX).prefix_separator("_")
    }

    fn load_with(file: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn schedule_terms(&self) -> ScheduleTerms {
        ScheduleTerms {
            weekly: Money::new(self.weekly_installment),
            biweekly: Money::new(self.biweekly_installment),
            monthly: Money::new(self.monthly_installment),
        }
    }

    pub fn goals(&self) -> Goals {
        Goals {
            daily: Money::new(self.daily_goal),
            weekly: Money::new(self.weekly_goal),
            monthly: Money::new(self.monthly_goal),
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_ttl_hours))
    }
}
