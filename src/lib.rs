//! Gravata: legal practice management over a REST API.
//!
//! Clients, cases with their timeline of updates, procedural deadlines and
//! documents live in an in-memory store ([`db`]) behind an axum gateway
//! ([`channels::web`]).

pub mod channels;
pub mod config;
pub mod db;
pub mod error;
pub mod legal;
