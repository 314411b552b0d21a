use crate::category::classify;
use crate::config::SubtreePolicy;
use crate::coordinator::ConcurrencyCoordinator;
use crate::error::{Result, ScanError};
use crate::http::HttpFetch;
use crate::result::{PageRecord, ResultSet, SkippedSitemap};
use crate::sitemap::{SitemapDocument, parse_sitemap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A sitemap waiting to be expanded, with the chain of index sitemaps that led to it.
#[derive(Debug)]
struct PendingSitemap {
    url: String,
    ancestors: Vec<String>,
}

/// Records produced by a walk plus the nested subtrees that were skipped.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub records: ResultSet,
    pub skipped: Vec<SkippedSitemap>,
}

/// Expands a sitemap URL into page records, following nested sitemap indexes.
///
/// The tree is walked depth first from an explicit stack so that output order
/// matches the order in which every index lists its children.
pub struct SitemapTreeWalker<C> {
    client: Arc<C>,
    coordinator: ConcurrencyCoordinator<C>,
    max_depth: usize,
    policy: SubtreePolicy,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<C: HttpFetch + 'static> SitemapTreeWalker<C> {
    pub fn new(client: Arc<C>, coordinator: ConcurrencyCoordinator<C>) -> Self {
        Self {
            client,
            coordinator,
            max_depth: crate::config::DEFAULT_MAX_DEPTH,
            policy: SubtreePolicy::default(),
            cancel_flag: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subtree_policy(mut self, policy: SubtreePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Fetch and parse a single sitemap document.
    pub async fn fetch_document(&self, url: &str) -> Result<SitemapDocument> {
        let fetched = self.client.fetch(url).await?;
        parse_sitemap(url, &fetched.text())
    }

    /// Fetch titles for every page of an already parsed urlset.
    pub async fn leaf_batch(&self, sitemap_url: &str, document: &SitemapDocument) -> Vec<PageRecord> {
        let category = classify(sitemap_url);
        let pages = document.page_urls();
        let skipped_assets = document.locs.len() - pages.len();

        info!(
            "Sitemap {} lists {} pages (category '{}', {} image entries ignored)",
            sitemap_url,
            pages.len(),
            category,
            skipped_assets
        );

        self.coordinator.fetch_all(pages, &category).await
    }

    /// Resolve `sitemap_url` into its page records and the nested sitemaps
    /// that were skipped along the way.
    ///
    /// A failure of `sitemap_url` itself is always returned. Failures of nested
    /// sitemaps follow the configured [`SubtreePolicy`].
    pub async fn walk(&self, sitemap_url: &str) -> Result<WalkOutcome> {
        self.walk_from(sitemap_url, Vec::new()).await
    }

    /// Like [`walk`](Self::walk) for a sitemap reached through `ancestors`.
    /// Depth and cycle limits count those ancestors: an index with more than
    /// `max_depth` ancestors is not expanded. Urlsets are never depth limited.
    pub async fn walk_from(&self, sitemap_url: &str, ancestors: Vec<String>) -> Result<WalkOutcome> {
        let mut outcome = WalkOutcome::default();
        let mut stack = vec![PendingSitemap {
            url: sitemap_url.to_string(),
            ancestors,
        }];
        let mut is_start = true;

        while let Some(node) = stack.pop() {
            if self.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let document = match self.expand(&node).await {
                Ok(document) => document,
                Err(e) if is_start => return Err(e),
                Err(e) => match self.policy {
                    SubtreePolicy::Abort => return Err(e),
                    SubtreePolicy::Skip => {
                        warn!("Skipping sitemap {}: {}", node.url, e);
                        outcome.skipped.push(SkippedSitemap {
                            url: node.url,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                },
            };
            is_start = false;

            if document.is_index() {
                debug!(
                    "Sitemap index {} lists {} sitemaps",
                    node.url,
                    document.locs.len()
                );
                let mut chain = node.ancestors;
                chain.push(node.url);
                // Reversed so that popping yields children in listed order.
                for child in document.locs.into_iter().rev() {
                    stack.push(PendingSitemap {
                        url: child,
                        ancestors: chain.clone(),
                    });
                }
            } else {
                let records = self.leaf_batch(&node.url, &document).await;
                outcome.records.extend(records);
            }
        }

        Ok(outcome)
    }

    async fn expand(&self, node: &PendingSitemap) -> Result<SitemapDocument> {
        if node.ancestors.iter().any(|a| a == &node.url) {
            return Err(ScanError::SitemapCycle(node.url.clone()));
        }

        let document = self.fetch_document(&node.url).await?;
        if document.is_index() && node.ancestors.len() > self.max_depth {
            return Err(ScanError::DepthLimit {
                url: node.url.clone(),
                max_depth: self.max_depth,
            });
        }
        Ok(document)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }
}
