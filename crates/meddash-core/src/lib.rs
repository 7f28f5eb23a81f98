//! Core library for the MedDash admin client.
//!
//! This crate provides the session and data layer shared by front ends:
//! - `api`: HTTP client for the MedDash backend
//! - `auth`: credential persistence, the session controller and route guards
//! - `config`: user configuration
//! - `models`: wire types
//! - `views`: list and statistics view models
//! - `utils`: formatting helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, SessionController, SessionEvent, SessionState};
pub use config::Config;
