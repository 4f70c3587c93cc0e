//! Thin façade over the portfolio-management REST API.
//!
//! Every call carries the `LoginCert` cookie and a fixed timeout. Callers that need to tell
//! failures apart use [`BackendClient::request`]; callers that only care whether data came
//! back use [`BackendClient::request_or_none`].
pub mod client;
pub mod endpoints;
pub mod error;

pub use client::{BackendClient, BackendConfig, RequestOptions};
pub use error::{BackendError, BackendResult};
