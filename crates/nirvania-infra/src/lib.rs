//! Infrastructure layer for Nirvania.
//!
//! Contains implementations of the ports defined in `nirvania-core`:
//! the Anthropic LLM provider, the SQLite run recorder, the in-memory CRM
//! gateway, and configuration loading.

pub mod config;
pub mod gateway;
pub mod llm;
pub mod sqlite;
