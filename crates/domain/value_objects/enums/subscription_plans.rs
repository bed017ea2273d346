use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Monthly,
    Yearly,
    Trial,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Yearly => "yearly",
            SubscriptionPlan::Trial => "trial",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(SubscriptionPlan::Monthly),
            "yearly" => Some(SubscriptionPlan::Yearly),
            "trial" => Some(SubscriptionPlan::Trial),
            _ => None,
        }
    }

    /// Derives the plan from a provider subscription: trialing wins, otherwise the
    /// recurring interval of the first price decides (`year` → yearly, anything else → monthly).
    pub fn from_provider(provider_status: &str, interval: Option<&str>) -> Self {
        if provider_status == "trialing" {
            return SubscriptionPlan::Trial;
        }

        match interval {
            Some("year") => SubscriptionPlan::Yearly,
            _ => SubscriptionPlan::Monthly,
        }
    }
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trialing_always_derives_trial() {
        assert_eq!(
            SubscriptionPlan::from_provider("trialing", Some("year")),
            SubscriptionPlan::Trial
        );
        assert_eq!(
            SubscriptionPlan::from_provider("trialing", None),
            SubscriptionPlan::Trial
        );
    }

    #[test]
    fn interval_decides_paid_plans() {
        assert_eq!(
            SubscriptionPlan::from_provider("active", Some("year")),
            SubscriptionPlan::Yearly
        );
        assert_eq!(
            SubscriptionPlan::from_provider("active", Some("month")),
            SubscriptionPlan::Monthly
        );
        assert_eq!(
            SubscriptionPlan::from_provider("past_due", None),
            SubscriptionPlan::Monthly
        );
    }
}
