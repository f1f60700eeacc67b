//! Tool catalog, dispatch, and the CRM gateway port.

pub mod catalog;
pub mod gateway;
pub mod registry;
