//! Jenga pipeline worker library.
//!
//! Exposes configuration, the store seams, the pipeline runner and the poll
//! loop so the binary entrypoint and tests can both reach them.

pub mod config;
pub mod poll_loop;
pub mod runner;
pub mod store;
