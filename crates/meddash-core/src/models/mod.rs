//! Data models for MedDash entities.
//!
//! This module contains the wire structures exchanged with the MedDash API:
//!
//! - `UserProfile`, `LoginRequest`, `LoginResponse`: session identity
//! - `AdminUser`: rows of the Users view
//! - `Pharmacy`, `PharmacyStatus`: rows of the Pharmacies view
//! - `DashboardStats`: figures shown on the Statistics view

pub mod pharmacy;
pub mod stats;
pub mod user;

pub use pharmacy::{Pharmacy, PharmacyStatus};
pub use stats::DashboardStats;
pub use user::{AdminUser, LoginRequest, LoginResponse, UserProfile};
