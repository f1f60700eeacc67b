//! Skill execution: validation, prompt assembly, per-run logging, the
//! execution engine, and the run-recording port.

pub mod engine;
pub mod logger;
pub mod prompt;
pub mod recorder;
pub mod runner;
pub mod validation;
