//! Client library for the AppService control plane.
//!
//! Wraps the HTTP surface of the control plane in typed calls, one per
//! service operation.

pub mod error;
pub mod http;

pub use error::ClientError;
pub use http::HttpClient;
