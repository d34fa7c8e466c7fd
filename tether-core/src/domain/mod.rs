//! Core domain types
//!
//! These types are shared between the client library (which produces them)
//! and the driver (which decides what to do with them).

pub mod job;
pub mod outcome;
