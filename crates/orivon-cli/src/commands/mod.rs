//! Command implementations.

pub mod attempt;
pub mod availability;
pub mod purchase;
pub mod session;
