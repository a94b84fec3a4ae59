//! # Agnes API Server Library
//!
//! REST surface over the Agnes entity services.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration loading
//! - `error`: error handling and HTTP response mapping
//! - `response`: list and single-record envelopes
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
