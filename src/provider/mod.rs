//! Messaging provider boundary.
//!
//! The dispatcher talks to the provider only through the [`TemplateSource`]
//! and [`MessageSender`] traits so that the WhatsApp Cloud API client
//! ([`client::GraphClient`]) can be swapped for an in-process fake.

pub mod catalog;
pub mod client;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::dispatch::payload::MessagePayload;
use crate::models::contact::DeliveryStatus;
use crate::models::template::Template;
use crate::Result;

/// Status code reported when a send never produced a provider response.
pub const TRANSPORT_FAILURE_CODE: u16 = 500;

/// Coarse outcome of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// Provider HTTP status, or [`TRANSPORT_FAILURE_CODE`].
    pub status_code: u16,
    /// Transport or provider error text, for logging only.
    pub detail: Option<String>,
}

impl DeliveryOutcome {
    /// Outcome carrying a provider status code.
    #[must_use]
    pub fn from_status(status_code: u16) -> Self {
        Self {
            status_code,
            detail: None,
        }
    }

    /// Outcome for a request that could not be completed at all.
    #[must_use]
    pub fn transport_failure(detail: impl Into<String>) -> Self {
        Self {
            status_code: TRANSPORT_FAILURE_CODE,
            detail: Some(detail.into()),
        }
    }

    /// Whether the provider accepted the message (200 or 201).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.delivery_status() == DeliveryStatus::Sent
    }

    /// Per-contact status this outcome maps to.
    #[must_use]
    pub fn delivery_status(&self) -> DeliveryStatus {
        DeliveryStatus::from_status_code(self.status_code)
    }
}

/// Source of the approved template list.
pub trait TemplateSource: Send + Sync {
    /// Fetch the full template list from the provider.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Provider` on transport failure or a non-200 response.
    fn list_templates(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Template>>> + Send + '_>>;
}

/// Sink for built template messages.
pub trait MessageSender: Send + Sync {
    /// Send one payload. Never fails: every failure path is folded into the
    /// returned [`DeliveryOutcome`].
    fn send<'a>(
        &'a self,
        payload: &'a MessagePayload,
    ) -> Pin<Box<dyn Future<Output = DeliveryOutcome> + Send + 'a>>;
}
