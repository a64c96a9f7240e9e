//! Builds provider-shaped template message requests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_IMAGE_KEY;
use crate::models::plan::ParameterPlan;
use crate::models::template::{HeaderFormat, Template};
use crate::{AppError, Result};

/// Body value used when a contact has no display name.
pub const FALLBACK_DISPLAY_NAME: &str = "Patient";

/// A single substitution value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Parameter {
    /// Text substitution.
    Text {
        /// Substituted text.
        text: String,
    },
    /// Image header media.
    Image {
        /// Media reference.
        image: MediaLink,
    },
}

/// Link to hosted media.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaLink {
    /// Public URL of the media.
    pub link: String,
}

/// A filled-in template component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PayloadComponent {
    /// Header media.
    Header {
        /// Header parameters.
        parameters: Vec<Parameter>,
    },
    /// Body placeholder values, in slot order.
    Body {
        /// Body parameters.
        parameters: Vec<Parameter>,
    },
    /// Dynamic suffix for one URL button.
    Button {
        /// Button subtype; always `url` here.
        sub_type: String,
        /// Button position, as a string.
        index: String,
        /// Button parameters.
        parameters: Vec<Parameter>,
    },
}

/// Language selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageSpec {
    /// Language code, e.g. `en_US`.
    pub code: String,
}

/// Template section of a message request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateMessage {
    /// Template name.
    pub name: String,
    /// Template language.
    pub language: LanguageSpec,
    /// Components in header, body, button order.
    pub components: Vec<PayloadComponent>,
}

/// Full request body for the provider's message endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    /// Always `whatsapp`.
    pub messaging_product: String,
    /// Destination phone number.
    pub to: String,
    /// Always `template`.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Template to send.
    pub template: TemplateMessage,
}

impl MessagePayload {
    /// Header component, if one was emitted.
    #[must_use]
    pub fn header(&self) -> Option<&PayloadComponent> {
        self.template
            .components
            .iter()
            .find(|c| matches!(c, PayloadComponent::Header { .. }))
    }

    /// Body component, if one was emitted.
    #[must_use]
    pub fn body(&self) -> Option<&PayloadComponent> {
        self.template
            .components
            .iter()
            .find(|c| matches!(c, PayloadComponent::Body { .. }))
    }
}

/// Stateless builder holding the template-name to header-image mapping.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    images: HashMap<String, String>,
    default_image: String,
}

impl PayloadBuilder {
    /// Create a builder from the configured image map.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the map has no `default` entry.
    pub fn new(images: HashMap<String, String>) -> Result<Self> {
        let default_image = images.get(DEFAULT_IMAGE_KEY).cloned().ok_or_else(|| {
            AppError::Config(format!(
                "template image map has no '{DEFAULT_IMAGE_KEY}' entry"
            ))
        })?;
        Ok(Self {
            images,
            default_image,
        })
    }

    /// Header image link for a template, falling back to the default.
    #[must_use]
    pub fn image_for(&self, template_name: &str) -> &str {
        self.images
            .get(template_name)
            .unwrap_or(&self.default_image)
    }

    /// Build the message request for one recipient.
    ///
    /// Every body slot receives the same value: `display_name`, or
    /// [`FALLBACK_DISPLAY_NAME`] when it is empty. Each dynamic URL button
    /// receives the recipient's phone number.
    #[must_use]
    pub fn build(
        &self,
        recipient_phone: &str,
        display_name: &str,
        template: &Template,
        plan: &ParameterPlan,
    ) -> MessagePayload {
        let mut components = Vec::new();

        if plan.header_kind == Some(HeaderFormat::Image) {
            components.push(PayloadComponent::Header {
                parameters: vec![Parameter::Image {
                    image: MediaLink {
                        link: self.image_for(&template.name).to_owned(),
                    },
                }],
            });
        }

        if plan.body_slot_count > 0 {
            let value = if display_name.is_empty() {
                FALLBACK_DISPLAY_NAME
            } else {
                display_name
            };
            components.push(PayloadComponent::Body {
                parameters: (0..plan.body_slot_count)
                    .map(|_| Parameter::Text {
                        text: value.to_owned(),
                    })
                    .collect(),
            });
        }

        // BTreeSet iteration is ascending.
        for index in &plan.dynamic_button_indices {
            components.push(PayloadComponent::Button {
                sub_type: "url".into(),
                index: index.to_string(),
                parameters: vec![Parameter::Text {
                    text: recipient_phone.to_owned(),
                }],
            });
        }

        MessagePayload {
            messaging_product: "whatsapp".into(),
            to: recipient_phone.to_owned(),
            message_type: "template".into(),
            template: TemplateMessage {
                name: template.name.clone(),
                language: LanguageSpec {
                    code: plan.language_code.clone(),
                },
                components,
            },
        }
    }
}
