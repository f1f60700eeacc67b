//! Shared domain types for Nirvania.
//!
//! This crate contains the core domain types used by the skill engine:
//! Skill, execution options and results, the tool catalog, LLM message
//! shapes, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod reasoning;
pub mod skill;
pub mod tool;
