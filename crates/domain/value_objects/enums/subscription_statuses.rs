use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    #[default]
    Inactive,
    Canceled,
    PastDue,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
        }
    }

    /// Parses a stored status. Unknown values are treated as inactive.
    pub fn from_str(value: &str) -> Self {
        match value {
            "active" => SubscriptionStatus::Active,
            "inactive" => SubscriptionStatus::Inactive,
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::Inactive,
        }
    }

    /// Maps a Stripe subscription status onto the local status set.
    /// `trialing`, `incomplete`, `incomplete_expired`, `unpaid` and anything new collapse to inactive;
    /// trial access is carried by the plan instead.
    pub fn from_provider_status(provider_status: &str) -> Self {
        match provider_status {
            "active" => SubscriptionStatus::Active,
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            _ => SubscriptionStatus::Inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_statuses_map_onto_local_set() {
        assert_eq!(
            SubscriptionStatus::from_provider_status("active"),
            SubscriptionStatus::Active
        );
        assert_eq!(
            SubscriptionStatus::from_provider_status("canceled"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_provider_status("past_due"),
            SubscriptionStatus::PastDue
        );
        for other in ["trialing", "incomplete", "incomplete_expired", "unpaid", "paused", ""] {
            assert_eq!(
                SubscriptionStatus::from_provider_status(other),
                SubscriptionStatus::Inactive,
                "{other} should map to inactive"
            );
        }
    }

    #[test]
    fn stored_status_round_trips_through_text() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::PastDue,
        ] {
            assert_eq!(SubscriptionStatus::from_str(status.as_str()), status);
        }
        assert_eq!(
            SubscriptionStatus::from_str("garbage"),
            SubscriptionStatus::Inactive
        );
    }
}
