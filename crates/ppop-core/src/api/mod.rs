//! REST API client module for the clinical backend.
//!
//! This module provides the `ApiClient` gateway for communicating with the
//! prediction and optimization service: patients, infusions, predictions,
//! regimen optimization, and the anonymous simulation.
//!
//! The API uses bearer token authentication obtained from `POST /auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
