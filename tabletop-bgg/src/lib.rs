//! Rate-limited access to the upstream board game catalog service.

pub mod client;
pub mod error;
pub mod limiter;
pub mod source;
pub mod xml;

pub use client::{BggClient, ClientOptions, DEFAULT_BASE_URL, DEFAULT_REQUEST_INTERVAL};
pub use error::FetchError;
pub use limiter::RateLimiter;
pub use source::CatalogSource;
