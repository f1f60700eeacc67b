//! SQLite storage layer.
//!
//! Run recording backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod pool;
pub mod skill_run;
