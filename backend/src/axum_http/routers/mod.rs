pub mod comments;
pub mod extractors;
pub mod images;
pub mod interactions;
pub mod posts;
pub mod subscriptions;
