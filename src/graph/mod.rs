//! Task dependency graph and scheduler.
//!
//! `builder` validates the graph's structure before any execution starts;
//! `scheduler` owns task states and hands the engine one ready task at a
//! time, deterministically.

pub mod builder;
pub mod scheduler;

pub use builder::{GraphBuilder, TaskGraph};
pub use scheduler::{Scheduler, TaskState};
