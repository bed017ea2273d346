pub mod comments;
pub mod enums;
pub mod images;
pub mod interactions;
pub mod pagination;
pub mod posts;
pub mod subscriptions;
