//! Application services: task and project operations, dashboard aggregation and seeding.

pub mod dashboard;
pub mod error;
pub mod projects;
pub mod repos;
pub mod seed;
pub mod tasks;
