pub mod interaction_types;
pub mod post_statuses;
pub mod subscription_plans;
pub mod subscription_statuses;
