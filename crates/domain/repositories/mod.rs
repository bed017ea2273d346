pub mod comments;
pub mod images;
pub mod interactions;
pub mod posts;
pub mod subscriptions;
pub mod users;
