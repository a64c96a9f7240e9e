//! Message template model as returned by the provider's template listing.

use serde::{Deserialize, Serialize};

/// Media format declared by a template header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderFormat {
    /// Plain text header.
    Text,
    /// Image header; requires a media link at send time.
    Image,
    /// Document header.
    Document,
    /// Video header.
    Video,
    /// Location header.
    Location,
    /// Header declared without a format.
    #[serde(rename = "NONE")]
    Empty,
    /// Any format this service does not know about.
    #[serde(other)]
    Unknown,
}

/// Kind of a template button.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonKind {
    /// Opens a link; the link may carry a `{{n}}` placeholder.
    Url,
    /// Sends a canned reply.
    QuickReply,
    /// Dials a phone number.
    PhoneNumber,
    /// Copies a code to the clipboard.
    CopyCode,
    /// Anything else.
    #[serde(other)]
    Other,
}

/// A single button inside a `BUTTONS` component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Button {
    /// Button kind.
    #[serde(rename = "type")]
    pub kind: ButtonKind,
    /// Button label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Link target for URL buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Button {
    /// URL button with the given link.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::Url,
            text: None,
            url: Some(url.into()),
        }
    }

    /// Quick-reply button with the given label.
    #[must_use]
    pub fn quick_reply(text: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::QuickReply,
            text: Some(text.into()),
            url: None,
        }
    }
}

/// One structural component of a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Component {
    /// Header block.
    Header {
        /// Declared media format, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<HeaderFormat>,
    },
    /// Body text with positional `{{n}}` placeholders.
    Body {
        /// Raw body text.
        #[serde(default)]
        text: String,
    },
    /// Button row.
    Buttons {
        /// Buttons in declaration order.
        #[serde(default)]
        buttons: Vec<Button>,
    },
    /// Footer or any other component type (ignored when sending).
    #[serde(other)]
    Other,
}

/// A provider-approved message template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    /// Template name; unique per language within the business account.
    pub name: String,
    /// Language code, e.g. `en_US`.
    pub language: String,
    /// Structural components in declaration order.
    #[serde(default)]
    pub components: Vec<Component>,
    /// Review status reported by the provider (`APPROVED`, `PENDING`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Template category (`MARKETING`, `UTILITY`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Provider-side identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Template {
    /// Construct a template with no provider metadata.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        language: impl Into<String>,
        components: Vec<Component>,
    ) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            components,
            status: None,
            category: None,
            id: None,
        }
    }
}
