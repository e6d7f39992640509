//! HTTP handlers for both services

pub mod account;
pub mod health;
pub mod transaction;

pub use account::*;
pub use health::*;
pub use transaction::*;
