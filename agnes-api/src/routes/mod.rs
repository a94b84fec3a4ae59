/// API route handlers
///
/// - `health`: health check
/// - `entity`: generic CRUD handlers shared by every resource
/// - `users`: user-only bulk delete

pub mod entity;
pub mod health;
pub mod users;
