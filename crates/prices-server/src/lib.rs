//! Prices Server Library
//!
//! HTTP server for ingesting and exporting price records.
//!
//! # Overview
//!
//! The server accepts price data as compressed archives (zip, tar, tar.gz)
//! containing a single CSV payload, validates and canonicalizes each record,
//! persists them with two-layer deduplication, and re-exports filtered
//! subsets as a CSV packaged inside a zip archive.
//!
//! # Architecture
//!
//! Feature slices with separated commands (writes) and queries (reads):
//!
//! - `ingest` - archive dispatch and CSV record parsing
//! - `features::prices::commands::import` - dedup and transactional persistence
//! - `features::prices::queries::export` - filtered query and zip packaging
//! - `db` - connection pool and schema bootstrap
//!
//! # Framework Stack
//!
//! - **Axum**: HTTP routing and extraction
//! - **SQLx**: PostgreSQL access with runtime-bound queries
//! - **Tracing**: structured logging

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
