//! REST client for the site API.
//!
//! # Architecture
//!
//! - One shared `reqwest::Client` behind an `Arc`, cheap to clone
//! - The Order Store, the payment endpoints and the download endpoint all
//!   live under the same base URL
//! - The server is the source of truth; nothing is cached locally
//!
//! # Endpoints
//!
//! | method | path | module |
//! |---|---|---|
//! | `POST` | `/orders` | [`orders`] |
//! | `PUT` | `/orders` | [`orders`] |
//! | `GET` | `/orders?email=` / `/orders?orderId=` | [`orders`] |
//! | `POST` | `/payment/create-order` | [`payments`] |
//! | `POST` | `/payment/verify` | [`payments`] |
//! | `GET` | `/templates/{id}/download?email=` | [`downloads`] |

pub mod downloads;
pub mod orders;
pub mod payments;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Response;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub use downloads::{DownloadResponse, DownloadedFile, NotDownloadable};
pub use orders::CreatedOrder;
pub use payments::{GatewaySession, VerifyResponse};

/// Errors that can occur when talking to the site API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the request; `message` is the server's own text.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the request never produced a server response.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Client for the site API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("counsel-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: with_trailing_slash(base_url),
            }),
        })
    }

    /// The underlying HTTP client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Resolve a path relative to the base URL.
    ///
    /// Path segments are percent-encoded individually so opaque ids cannot
    /// escape their segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Parse("base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

/// Make sure relative joins keep any path prefix of the base URL.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Error body shapes the site API uses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn a non-success response into [`ApiError::Api`], keeping the server's
/// message verbatim when it sent one.
pub(crate) async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let snippet: String = text.chars().take(200).collect();
            if snippet.trim().is_empty() {
                format!("HTTP {status}")
            } else {
                snippet
            }
        });

    tracing::warn!(status = %status, message = %message, "Site API returned non-success status");

    ApiError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Read a JSON body, keeping a snippet of the raw text on parse failure.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, ApiError> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse site API response"
        );
        ApiError::Parse(e.to_string())
    })
}
