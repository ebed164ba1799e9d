//! Vegetable catalog and daily stock service.
//!
//! The library holds everything shared by the `vegstock-server` binary and
//! the `vegstock` CLI: models, the SQLite store, the HTTP router and the API
//! client.

pub mod client;
pub mod config;
pub mod dates;
pub mod db;
pub mod models;
pub mod server;
pub mod validation;
