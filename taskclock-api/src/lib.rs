//! # TaskClock API Server Library
//!
//! Router, configuration and HTTP error mapping for the TaskClock API. The
//! binary in `main.rs` wires them to PostgreSQL; tests wire them to the
//! in-memory store.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
