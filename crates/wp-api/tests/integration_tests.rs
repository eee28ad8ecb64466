//! Integration tests for the Watchpost API.
//!
//! These tests drive the full router, middleware included, against an
//! in-memory SQLite database.

mod integration;

pub use integration::common;
