//! API route definitions

pub mod health;
pub mod users;
