pub mod analysis;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod routes;
