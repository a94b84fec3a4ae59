//! # Agnes Worker Library
//!
//! Turns queued user payloads into stored users.
//!
//! ## Modules
//!
//! - `handler`: SQS batch handler with partial batch failure reporting
//! - `consumer`: polling loop that feeds the handler and acknowledges messages
//! - `config`: worker configuration

pub mod config;
pub mod consumer;
pub mod handler;
