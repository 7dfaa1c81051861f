//! conductor: a multi-worker orchestration engine that turns a natural
//! language requirement into generated project files.
//!
//! A planning worker decomposes the requirement into a dependency graph
//! of file-producing tasks; a scheduler dispatches them one at a time to
//! an implementing worker driving a bounded tool-call loop; an evaluating
//! worker scores the result. Progress is committed atomically to a JSON
//! record after every task, so an interrupted run resumes where it left
//! off.

pub mod config;
pub mod context;
pub mod errors;
pub mod graph;
pub mod llm;
pub mod orchestrator;
pub mod parse;
pub mod prompts;
pub mod state;
pub mod task;
pub mod tools;
pub mod worker;

pub use config::RunConfig;
pub use orchestrator::{Engine, RunPhase, RunReport};
