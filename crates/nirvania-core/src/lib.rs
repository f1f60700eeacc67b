//! Business logic and port definitions for Nirvania.
//!
//! This crate defines the skill execution engine and the "ports" (provider,
//! gateway and recorder traits) that the infrastructure layer implements.
//! It depends only on `nirvania-types` -- never on `nirvania-infra` or any
//! database/IO crate.

pub mod llm;
pub mod skill;
pub mod tool;
