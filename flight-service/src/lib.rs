pub mod api;
pub mod handlers;
pub mod models;
pub mod store;
