//! Price ingestion and export feature slice

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use routes::prices_routes;
