//! REST client for the business registry.
//!
//! Provides [`HttpRegistryClient`], which implements
//! [`RegistryApi`](crate::RegistryApi) over HTTP with reqwest.

mod http;

pub use http::{DEFAULT_BASE_URL, HttpRegistryClient};
pub(crate) use http::parse_base_url;
