//! Attendance session engine
//!
//! Tracks sign-ins against time-boxed attendance sessions. A session
//! carries a shared code and an expiry instant; members submit the code
//! to be counted, a public summary message mirrors the roster, and a
//! scheduler closes each session when its time runs out.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod routes;
pub mod scheduler;
pub mod state;
pub mod state_token;
pub mod summary;
pub mod validation;
pub mod verification;
