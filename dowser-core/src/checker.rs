use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::error::Result;
use crate::extract::extract_links;
use crate::status::{LinkRecord, LinkStatus, StatusResolver, TransportError, TransportKind};

pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

const DEFAULT_CONCURRENCY: usize = 8;

/// Checks every link in a document: extraction, then a bounded concurrent
/// probe per distinct URL, with results in extraction order.
#[derive(Debug)]
pub struct LinkChecker {
    resolver: StatusResolver,
    concurrency: usize,
    deadline: Option<Duration>,
}

impl LinkChecker {
    /// Checker with a default resolver.
    pub fn new() -> Result<Self> {
        Ok(Self::with_resolver(StatusResolver::new()?))
    }

    /// Checker over an already-configured resolver.
    pub fn with_resolver(resolver: StatusResolver) -> Self {
        Self {
            resolver,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
        }
    }

    /// Maximum probes in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bound on total wall time for one document. Probes still pending at
    /// the deadline report as timeouts instead of holding up the batch.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    /// Check every link in `text`. One status per distinct URL, in order
    /// of first appearance; per-link failures never abort the batch.
    pub async fn check_document(&self, text: &str) -> Vec<LinkStatus> {
        self.check_document_with_progress(text, None).await
    }

    /// Like [`check_document`](Self::check_document), invoking `progress`
    /// with (done, total, url) as each probe completes.
    pub async fn check_document_with_progress(
        &self,
        text: &str,
        progress: Option<ProgressCallback>,
    ) -> Vec<LinkStatus> {
        let urls = extract_links(text);
        let total = urls.len();
        if total == 0 {
            return Vec::new();
        }

        let completed = Arc::new(AtomicUsize::new(0));
        let deadline = self.deadline.map(|d| Instant::now() + d);

        debug!(total, concurrency = self.concurrency, "checking document links");

        stream::iter(urls)
            .map(|url| {
                let completed = completed.clone();
                let progress = progress.as_ref();
                let resolver = &self.resolver;

                async move {
                    let status = match deadline {
                        Some(deadline) => {
                            match timeout_at(deadline, resolver.resolve(&url)).await {
                                Ok(status) => status,
                                // Not cached: a deadline artifact must not
                                // outlive this batch.
                                Err(_) => LinkStatus::failed(
                                    url.as_str(),
                                    TransportError::new(
                                        TransportKind::Timeout,
                                        "document deadline exceeded",
                                    ),
                                ),
                            }
                        }
                        None => resolver.resolve(&url).await,
                    };

                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = progress {
                        progress(count, total, &url);
                    }

                    status
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// One document's checked links, labeled with where the text came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: String,
    pub statuses: Vec<LinkStatus>,
}

impl DocumentReport {
    pub fn new(source: impl Into<String>, statuses: Vec<LinkStatus>) -> Self {
        Self {
            source: source.into(),
            statuses,
        }
    }

    pub fn link_count(&self) -> usize {
        self.statuses.len()
    }

    pub fn good_count(&self) -> usize {
        self.statuses.iter().filter(|s| s.good()).count()
    }

    pub fn broken_count(&self) -> usize {
        self.link_count() - self.good_count()
    }

    pub fn all_good(&self) -> bool {
        self.statuses.iter().all(|s| s.good())
    }

    pub fn has_links(&self) -> bool {
        !self.statuses.is_empty()
    }

    /// Per-link records for serialization.
    pub fn records(&self) -> Vec<LinkRecord> {
        self.statuses.iter().map(|s| s.to_record()).collect()
    }
}
