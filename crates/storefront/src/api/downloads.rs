//! Template download endpoint.

use counsel_core::{Email, ItemId};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ApiClient, ApiError};

/// The server's signal that an item is fulfilled by contact, not by file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotDownloadable {
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub schedule_link: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A file body with the headers needed to name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadResponse {
    File(DownloadedFile),
    NotDownloadable(NotDownloadable),
}

/// Parse a JSON body as a "not downloadable" signal. Only `isCustom: true`
/// counts; any other JSON is an ordinary file.
fn not_downloadable(body: &[u8]) -> Option<NotDownloadable> {
    serde_json::from_slice::<NotDownloadable>(body)
        .ok()
        .filter(|signal| signal.is_custom)
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

impl ApiClient {
    /// Fetch a purchased template for `email`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the server refuses the download
    /// without explaining that the item is custom.
    #[instrument(skip(self, item_id, email), fields(item_id = %item_id))]
    pub async fn download_template(
        &self,
        item_id: &ItemId,
        email: &Email,
    ) -> Result<DownloadResponse, ApiError> {
        let mut url = self.endpoint(&["templates", item_id.as_str(), "download"])?;
        url.query_pairs_mut().append_pair("email", email.as_str());

        let response = self.http().get(url).send().await?;
        let status = response.status();
        let content_type = header_str(&response, CONTENT_TYPE);
        let content_disposition = header_str(&response, CONTENT_DISPOSITION);
        let bytes = response.bytes().await?.to_vec();

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));

        if is_json && let Some(signal) = not_downloadable(&bytes) {
            debug!("Item is fulfilled by contact");
            return Ok(DownloadResponse::NotDownloadable(signal));
        }

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| {
                    v.get("message")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| format!("HTTP {status}"));
            tracing::warn!(status = %status, message = %message, "Download refused");
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(size = bytes.len(), "Template downloaded");
        Ok(DownloadResponse::File(DownloadedFile {
            bytes,
            content_disposition,
            content_type,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_signal_detected() {
        let signal = not_downloadable(
            br#"{"isCustom":true,"scheduleLink":"https://cal.test/x","message":"Book a call"}"#,
        )
        .unwrap();
        assert_eq!(signal.schedule_link.as_deref(), Some("https://cal.test/x"));
        assert!(signal.contact_email.is_none());
    }

    #[test]
    fn test_plain_json_file_is_not_a_signal() {
        assert!(not_downloadable(br#"{"name":"budget","rows":[]}"#).is_none());
        assert!(not_downloadable(br#"{"isCustom":false}"#).is_none());
        assert!(not_downloadable(b"PK\x03\x04").is_none());
    }
}
