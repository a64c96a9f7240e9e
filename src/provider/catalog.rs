//! Time-bounded template catalog cache.
//!
//! Serves the last successful listing for up to `ttl`. When the listing is
//! stale it refetches under a timeout; a failed refetch falls back to the
//! previous listing (or an empty one), so callers never see an error. An
//! empty result means "no templates usable right now".

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::TemplateSource;
use crate::models::template::Template;

#[derive(Default)]
struct CacheState {
    templates: Vec<Template>,
    fetched_at: Option<Instant>,
}

/// Stale-on-failure cache in front of a [`TemplateSource`].
pub struct TemplateCatalog {
    source: Arc<dyn TemplateSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    // Held across the refetch so concurrent callers share one request.
    state: Mutex<CacheState>,
}

impl TemplateCatalog {
    /// Wrap `source` with the given freshness window and fetch timeout.
    #[must_use]
    pub fn new(source: Arc<dyn TemplateSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Current template list, refetching when stale.
    pub async fn fetch_templates(&self) -> Vec<Template> {
        let mut state = self.state.lock().await;

        if let Some(fetched_at) = state.fetched_at {
            if fetched_at.elapsed() < self.ttl {
                return state.templates.clone();
            }
        }

        match tokio::time::timeout(self.fetch_timeout, self.source.list_templates()).await {
            Ok(Ok(templates)) => {
                info!(count = templates.len(), "template catalog refreshed");
                state.templates = templates;
                state.fetched_at = Some(Instant::now());
            }
            Ok(Err(err)) => {
                warn!(%err, cached = state.templates.len(), "template fetch failed, serving cache");
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.fetch_timeout.as_secs(),
                    cached = state.templates.len(),
                    "template fetch timed out, serving cache"
                );
            }
        }

        state.templates.clone()
    }

    /// Look up a template by exact name.
    pub async fn find(&self, name: &str) -> Option<Template> {
        self.fetch_templates()
            .await
            .into_iter()
            .find(|template| template.name == name)
    }

    /// Mark the cache stale so the next call refetches. Cached data is kept
    /// as the fallback.
    pub async fn invalidate(&self) {
        debug!("template catalog invalidated");
        self.state.lock().await.fetched_at = None;
    }
}
