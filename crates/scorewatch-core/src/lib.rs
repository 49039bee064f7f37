//! # scorewatch-core
//! Score history, alert rules, and collaborator traits for scorewatch.

pub mod constants;
pub mod error;
pub mod rules;
pub mod stats;
pub mod store;
pub mod traits;
pub mod types;
