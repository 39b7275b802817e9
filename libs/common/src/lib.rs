//! Common library for the Muster attendance platform
//!
//! This crate provides shared infrastructure used across the Muster
//! services: PostgreSQL connection pooling, health checks, and the
//! error types that go with them.

pub mod database;
pub mod error;
