pub mod comments;
pub mod interactions;
pub mod posts;
pub mod subscriptions;
pub mod users;
