//! Derives a [`ParameterPlan`] from a template's structure.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::plan::ParameterPlan;
use crate::models::template::{ButtonKind, Component, Template};

#[allow(clippy::expect_used)] // Literal pattern, exercised by the tests below.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[0-9]+\}\}").expect("placeholder pattern is valid"));

/// Analyze a template.
///
/// - `header_kind` is the format of the first `HEADER` component.
/// - `body_slot_count` counts *distinct* `{{n}}` tokens across all `BODY`
///   components. Numbering gaps are not checked: `{{1}}` and `{{5}}` alone
///   count as two slots.
/// - `dynamic_button_indices` holds the 0-based positions of `URL` buttons
///   whose link contains `{{`.
#[must_use]
pub fn analyze(template: &Template) -> ParameterPlan {
    let mut header_kind = None;
    let mut seen_header = false;
    let mut placeholders: HashSet<&str> = HashSet::new();
    let mut dynamic_button_indices = BTreeSet::new();

    for component in &template.components {
        match component {
            Component::Header { format } => {
                if !seen_header {
                    header_kind = *format;
                    seen_header = true;
                }
            }
            Component::Body { text } => {
                placeholders.extend(PLACEHOLDER.find_iter(text).map(|m| m.as_str()));
            }
            Component::Buttons { buttons } => {
                for (index, button) in buttons.iter().enumerate() {
                    let templated = button.url.as_deref().is_some_and(|url| url.contains("{{"));
                    if button.kind == ButtonKind::Url && templated {
                        dynamic_button_indices.insert(index);
                    }
                }
            }
            Component::Other => {}
        }
    }

    ParameterPlan {
        language_code: template.language.clone(),
        header_kind,
        body_slot_count: placeholders.len(),
        dynamic_button_indices,
    }
}
