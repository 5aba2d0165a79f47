//! Notification payloads. Delivery is up to the caller.

use super::money::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub require_interaction: bool,
}

impl Notice {
    fn new(title: &str, body: String, tag: &str) -> Self {
        Self {
            title: title.to_string(),
            body,
            tag: tag.to_string(),
            require_interaction: false,
        }
    }

    pub fn payment_due(client_name: &str, amount: Money) -> Self {
        Self {
            require_interaction: true,
            ..Self::new(
                "Payment due",
                format!("{client_name} - R$ {amount}"),
                "payment-due",
            )
        }
    }

    pub fn payment_received(client_name: &str, amount: Money) -> Self {
        Self::new(
            "Payment received",
            format!("{client_name} paid R$ {amount}"),
            "payment-received",
        )
    }

    /// `None` below 75% of the goal.
    pub fn daily_goal(collected: Money, goal: Money) -> Option<Self> {
        if !goal.is_positive() {
            return None;
        }
        let percentage = collected.value() * dec!(100) / goal.value();
        if percentage >= dec!(100) {
            Some(Self::new(
                "Daily goal reached",
                format!("You collected R$ {collected}"),
                "daily-goal-achieved",
            ))
        } else if percentage >= dec!(75) {
            Some(Self::new(
                "Almost there",
                format!(
                    "You have collected {}% of your daily goal",
                    percentage.round_dp(0)
                ),
                "daily-goal-progress",
            ))
        } else {
            None
        }
    }

    pub fn route_ready(stops: usize, distance_km: f64) -> Self {
        Self::new(
            "Optimized route available",
            format!("{stops} clients in {distance_km:.1}km"),
            "route-optimization",
        )
    }

    /// `None` when nothing was synced.
    pub fn synced(items: usize) -> Option<Self> {
        match items {
            0 => None,
            1 => Some(Self::new(
                "Data synced",
                "1 item synced".to_string(),
                "offline-sync",
            )),
            n => Some(Self::new(
                "Data synced",
                format!("{n} items synced"),
                "offline-sync",
            )),
        }
    }
}

/// Percentage of `goal` reached, two decimal places.
pub fn goal_progress(collected: Money, goal: Money) -> Decimal {
    if goal.is_positive() {
        (collected.value() * dec!(100) / goal.value()).round_dp(2)
    } else {
        Decimal::ZERO
    }
}
