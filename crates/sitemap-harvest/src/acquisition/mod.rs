//! Acquisition layer: HTTP client, retry policy, and the `Fetcher` seam.

pub mod fetcher;
pub mod http_client;
pub mod retry;

pub use fetcher::{FetchResult, Fetcher, HttpFetcher};
pub use http_client::{HttpClient, HttpResponse};
pub use retry::RetryPolicy;
