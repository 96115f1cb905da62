//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod projects;
pub mod tasks;
pub mod types;
