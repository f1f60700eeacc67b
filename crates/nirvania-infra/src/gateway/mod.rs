//! CRM gateway implementations.

pub mod memory;

pub use memory::InMemoryCrmGateway;
