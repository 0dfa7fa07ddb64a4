//! HTTP API.
//!
//! Public: health, sign-in, password recovery, email relay.
//! Protected (bearer token): tasks, profiles, reports, password change.

mod auth;
mod email;
mod error;
mod report;
mod routes;
mod tasks;


pub use auth::{validate_new_password, AuthUser, MIN_PASSWORD_LENGTH};
pub use error::ApiError;
pub use routes::{router, serve, AppState};
