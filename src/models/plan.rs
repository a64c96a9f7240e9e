//! Parameter plan derived from a template's structure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::template::HeaderFormat;

/// Which parts of a template need runtime values at send time.
///
/// Derived per dispatch by [`analyze`](crate::dispatch::analyzer::analyze);
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterPlan {
    /// Language code copied from the template.
    pub language_code: String,
    /// Format of the first header component, if any.
    pub header_kind: Option<HeaderFormat>,
    /// Number of distinct body placeholders.
    pub body_slot_count: usize,
    /// Positions of URL buttons whose link carries a placeholder.
    pub dynamic_button_indices: BTreeSet<usize>,
}
