//! Inbound adapters: surfaces that drive the domain.

pub mod http;
