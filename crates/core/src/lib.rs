//! Domain types for the Jenga pipeline worker.
//!
//! Pure data and functions only: no I/O, no runtime. The storage crates and
//! the worker build on these.

pub mod error;
pub mod job;
pub mod job_state;
pub mod progress;
pub mod stage;
pub mod types;
