pub mod api;
pub mod handlers;
pub mod models;
pub mod outbox;
pub mod store;
