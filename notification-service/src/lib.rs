pub mod api;
pub mod channel;
pub mod handlers;
pub mod models;
pub mod store;
