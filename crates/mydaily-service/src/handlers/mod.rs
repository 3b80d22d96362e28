//! API handlers.

pub mod habits;
pub mod health;
pub mod triggers;
pub mod users;
