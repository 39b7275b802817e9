//! Attendance service models

pub mod record;
pub mod session;

// Re-export for convenience
pub use record::{CategoryCount, NewSignIn, SignInRecord};
pub use session::{DisplayLocator, EventCategory, NewSession, Session};
