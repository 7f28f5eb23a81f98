//! REST API client module for the MedDash backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! MedDash API, plus the `AuthApi` and `ResourceApi` traits the session
//! controller and list views are written against.
//!
//! Session endpoints live under `/auth`; resource collections use JWT
//! bearer token authentication.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthApi, ResourceApi, DEFAULT_BACKEND_URL};
pub use error::ApiError;
