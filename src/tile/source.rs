//! Where tile bytes come from.

use crate::tile::error::FetchError;

/// Fetches the raw body behind a URL. Implementations must be shareable across
/// the worker threads that fetch tiles concurrently.
pub trait TileSource: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[cfg(feature = "http")]
pub use http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use log::debug;
    use reqwest::blocking::Client;

    use crate::tile::error::FetchError;
    use crate::tile::source::TileSource;

    const USER_AGENT: &str = concat!("flatfinder/", env!("CARGO_PKG_VERSION"));
    const TIMEOUT: Duration = Duration::from_secs(30);

    /// A blocking HTTP client. Failures are returned as-is, with no retries.
    pub struct HttpSource {
        client: Client,
    }

    impl HttpSource {
        pub fn new() -> Result<Self, FetchError> {
            let client = Client::builder()
                .user_agent(USER_AGENT)
                .timeout(TIMEOUT)
                .build()
                .map_err(|err| FetchError::Request {
                    url: String::new(),
                    reason: format!("client init failed: {err}"),
                })?;

            Ok(HttpSource { client })
        }
    }

    impl TileSource for HttpSource {
        fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            debug!("GET {url}");

            let request_error = |err: reqwest::Error| FetchError::Request {
                url: url.to_string(),
                reason: err.to_string(),
            };

            let response = self.client.get(url).send().map_err(request_error)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().map_err(request_error)?;
            Ok(body.to_vec())
        }
    }
}
