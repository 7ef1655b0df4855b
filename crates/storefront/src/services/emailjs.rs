//! EmailJS client for transactional contact messages.
//!
//! Contact requests for custom items with no scheduling link and no
//! dedicated address go to the site's inbound mailbox through an EmailJS
//! template.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::EmailJsConfig;

/// Errors that can occur when sending through EmailJS.
#[derive(Debug, Error)]
pub enum EmailJsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl EmailJsError {
    #[must_use]
    pub fn user_message(&self) -> String {
        "Your message could not be sent. Please email us directly.".to_string()
    }
}

/// Variables substituted into the EmailJS template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    pub to_email: String,
    pub from_name: String,
    pub reply_to: String,
    pub subject: String,
    pub message: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a TemplateParams,
}

/// EmailJS REST client.
#[derive(Clone)]
pub struct EmailJsClient {
    client: reqwest::Client,
    config: EmailJsConfig,
}

impl std::fmt::Debug for EmailJsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EmailJsClient {
    /// Create a new EmailJS client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: EmailJsConfig, timeout: Duration) -> Result<Self, EmailJsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    /// The mailbox contact messages are delivered to.
    #[must_use]
    pub fn recipient(&self) -> &str {
        self.config.recipient.as_str()
    }

    /// Send one templated message.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or EmailJS rejects it.
    #[instrument(skip(self, params), fields(subject = %params.subject))]
    pub async fn send(&self, params: &TemplateParams) -> Result<(), EmailJsError> {
        let body = SendRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            access_token: self
                .config
                .private_key
                .as_ref()
                .map(|key| key.expose_secret()),
            template_params: params,
        };

        let response = self
            .client
            .post(self.config.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailJsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Contact message sent");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let params = TemplateParams {
            to_email: "hello@counsel.test".to_string(),
            from_name: "Asha".to_string(),
            reply_to: "asha@example.in".to_string(),
            subject: "Contract Review".to_string(),
            message: "Please get in touch.".to_string(),
        };
        let json = serde_json::to_value(SendRequest {
            service_id: "service_x",
            template_id: "template_y",
            user_id: "pk_z",
            access_token: None,
            template_params: &params,
        })
        .unwrap();

        assert_eq!(json["user_id"], "pk_z");
        assert!(json.get("accessToken").is_none());
        assert_eq!(json["template_params"]["reply_to"], "asha@example.in");
    }
}
