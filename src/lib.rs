pub mod api;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geocode;
pub mod models;
pub mod notify;
pub mod observability;
pub mod state;
