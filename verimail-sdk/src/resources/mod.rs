//! SDK resource modules
//!
//! This module contains resource-specific clients for interacting with
//! different API endpoints.

pub mod credits;
pub mod validations;

pub use credits::CreditsClient;
pub use validations::{EmailValidationsClient, SubmitRequest};
