//! Network fetch collaborator

pub mod errors;
pub mod http;

pub use errors::FetchError;
pub use http::{Fetcher, HttpFetcher, DEFAULT_REQUEST_TIMEOUT};
