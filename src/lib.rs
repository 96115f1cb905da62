//! Task and project tracking service with a look-aside cache for filtered task lists and a
//! short-lived dashboard snapshot.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
