//! WhatsApp Cloud API (Graph API) client.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{DeliveryOutcome, MessageSender, TemplateSource};
use crate::config::ProviderConfig;
use crate::dispatch::payload::MessagePayload;
use crate::models::template::Template;
use crate::{AppError, Result};

/// Envelope of the template listing response.
#[derive(Debug, Deserialize)]
struct TemplateListResponse {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// HTTP client for the provider's template, message, and phone endpoints.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl GraphClient {
    /// Build a client for the given provider settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Provider` if the HTTP client cannot be constructed.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Provider(format!("failed to build http client: {err}")))?;
        Ok(Self { http, config })
    }

    fn templates_url(&self) -> String {
        format!(
            "{}/{}/message_templates?limit={}",
            self.config.api_root(),
            self.config.waba_id,
            self.config.template_page_limit
        )
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_root(),
            self.config.phone_number_id
        )
    }

    fn phone_url(&self) -> String {
        format!(
            "{}/{}?fields=display_phone_number,verified_name",
            self.config.api_root(),
            self.config.phone_number_id
        )
    }

    /// Fetch the approved template list.
    ///
    /// Templates that fail to deserialize are skipped with a warning rather
    /// than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Provider` on transport failure, timeout, a non-200
    /// status, or an unreadable body.
    pub async fn fetch_templates(&self) -> Result<Vec<Template>> {
        let response = self
            .http
            .get(self.templates_url())
            .bearer_auth(&self.config.access_token)
            .timeout(self.config.template_timeout())
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AppError::Provider(format!(
                "template listing returned {status}"
            )));
        }

        let body: TemplateListResponse = response.json().await?;
        let templates = body
            .data
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Template>(raw) {
                Ok(template) => Some(template),
                Err(err) => {
                    warn!(%err, "skipping unreadable template");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(count = templates.len(), "fetched template catalog");
        Ok(templates)
    }

    /// Post one template message and report the provider status code.
    pub async fn send_payload(&self, payload: &MessagePayload) -> DeliveryOutcome {
        let mut request = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(payload);
        if let Some(timeout) = self.config.send_timeout() {
            request = request.timeout(timeout);
        }

        match request.send().await {
            Ok(response) => {
                let code = response.status().as_u16();
                if !response.status().is_success() {
                    let detail = response.text().await.unwrap_or_default();
                    warn!(to = %payload.to, code, detail = %detail, "provider rejected message");
                    return DeliveryOutcome {
                        status_code: code,
                        detail: Some(detail),
                    };
                }
                DeliveryOutcome::from_status(code)
            }
            Err(err) => {
                warn!(to = %payload.to, %err, "message send failed");
                DeliveryOutcome::transport_failure(err.to_string())
            }
        }
    }

    /// Query the phone number node; `true` only on a 200 response.
    pub async fn check_health(&self) -> bool {
        let result = self
            .http
            .get(self.phone_url())
            .bearer_auth(&self.config.access_token)
            .timeout(self.config.health_timeout())
            .send()
            .await;

        match result {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(err) => {
                debug!(%err, "provider health check failed");
                false
            }
        }
    }
}

impl TemplateSource for GraphClient {
    fn list_templates(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Template>>> + Send + '_>> {
        Box::pin(self.fetch_templates())
    }
}

impl MessageSender for GraphClient {
    fn send<'a>(
        &'a self,
        payload: &'a MessagePayload,
    ) -> Pin<Box<dyn Future<Output = DeliveryOutcome> + Send + 'a>> {
        Box::pin(self.send_payload(payload))
    }
}
