//! # Agnes Shared Library
//!
//! Domain model, paged querying, storage and cloud clients shared by the
//! Agnes API server and the queue worker.
//!
//! ## Module Organization
//!
//! - `entity`: the descriptor every stored record implements
//! - `models`: users, categories, locations, devices and readings
//! - `query`: page / sort / filter parameters and the paged query engine
//! - `store`: PostgreSQL and in-memory repositories
//! - `services`: CRUD services and nested relations
//! - `db`: connection pool and migrations
//! - `queue`: SQS message queue client
//! - `state`: DynamoDB / Redis global key-value state
//! - `aws`: SDK configuration shared by `queue` and `state`

pub mod aws;
pub mod db;
pub mod entity;
pub mod models;
pub mod password;
pub mod query;
pub mod queue;
pub mod services;
pub mod state;
pub mod store;
pub mod validation;

/// Current version of the Agnes shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
