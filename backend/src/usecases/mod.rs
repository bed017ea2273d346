pub mod comments;
pub mod identity;
pub mod images;
pub mod interactions;
pub mod posts;
pub mod premium_access;
pub mod subscriptions;
