pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod protocol;
pub mod routes;
pub mod services;
