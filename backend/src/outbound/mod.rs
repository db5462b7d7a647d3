//! Outbound adapters: implementations of the domain's storage and
//! integration ports.

pub mod http;
pub mod memory;
pub mod persistence;
