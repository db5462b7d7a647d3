//! Impact scoring and ranking engine.
//!
//! Hexagonal layout: `domain` holds the entities, ports, and services;
//! `inbound` and `outbound` hold the adapters; `server` wires a
//! configuration into a running HTTP service plus the aggregation
//! scheduler.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;

pub use doc::ApiDoc;
pub use middleware::RequestLog;
