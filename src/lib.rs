//! Faceted filtering of excavation sites: the client-side filter state model,
//! the SQL predicate builders, and the HTTP filter server.

pub mod config;
pub mod db;
pub mod filters;
pub mod output;
pub mod server;
pub mod sql;
