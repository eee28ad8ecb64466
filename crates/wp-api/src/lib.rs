//! # wp-api
//!
//! REST API server for Watchpost.
//!
//! This crate provides the HTTP API for authentication, incident, threat, and
//! alert management, dashboard aggregation, and the live log stream over
//! WebSocket.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
