//! HTTP inbound adapter exposing REST endpoints.

pub mod actions;
pub mod error;
pub mod events;
pub mod health;
pub mod leaderboard;
pub mod schemas;
pub mod state;
pub mod users;

pub use error::ApiResult;
