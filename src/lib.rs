//! Credence - principal store with external SSO identity mapping
//!
//! Persistence layer linking local principals to credentials issued by
//! external single-sign-on providers. Lookups go both ways: an external
//! user token resolves to a local principal (optionally scoped to a set of
//! authentication domains), and a principal resolves back to its stored
//! token by trying candidate domains in order.
//!
//! Backends are selected per deployment: SQLite for embedded and test use,
//! PostgreSQL (with optional read replica) for production.

pub mod config;
pub mod db;
pub mod models;
