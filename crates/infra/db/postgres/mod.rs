pub mod post_filters;
pub mod postgres_connection;
pub mod schema;
