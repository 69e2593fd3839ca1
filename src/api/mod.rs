//! Upstream telephony backend: HTTP plumbing, errors and admin discovery

pub mod cache;
pub mod directory;
pub mod error;
pub mod http;
pub mod session;

pub use error::{format_api_error, ApiError};
pub use http::ApiHttpClient;
