use crate::config::{ScannerConfig, SubtreePolicy};
use crate::coordinator::{ConcurrencyCoordinator, RecordCallback};
use crate::error::{CrawlError, Result, ScanError};
use crate::http::{HttpClient, HttpFetch};
use crate::locator::{SitemapLocator, normalize_site_root};
use crate::page::PageMetadataFetcher;
use crate::result::{CrawlReport, SkippedSitemap};
use crate::sitemap::parse_sitemap;
use crate::walker::SitemapTreeWalker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};
use url::Url;

/// Called with `(entries_done, entries_total, sitemap_url)`: once with zero
/// done when the root sitemap has been read, then after every top-level entry.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, String) + Send + Sync>;

/// Locates a site's sitemap and resolves it into page records.
pub struct SiteCrawler<C = HttpClient> {
    client: Arc<C>,
    config: ScannerConfig,
    progress_callback: Option<ProgressCallback>,
    record_callback: Option<RecordCallback>,
    cancel_flag: Arc<AtomicBool>,
}

impl SiteCrawler<HttpClient> {
    pub fn new(config: ScannerConfig) -> Result<Self> {
        let client = Arc::new(HttpClient::new(&config)?);
        Ok(Self::with_client(client, config))
    }
}

impl<C: HttpFetch + 'static> SiteCrawler<C> {
    pub fn with_client(client: Arc<C>, config: ScannerConfig) -> Self {
        Self {
            client,
            config,
            progress_callback: None,
            record_callback: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_record_callback(mut self, callback: RecordCallback) -> Self {
        self.record_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Shared flag that stops the crawl before the next sitemap when set.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Crawl one site: locate its sitemap, walk every entry and fetch titles.
    ///
    /// When the root sitemap is an index each of its entries is a top-level
    /// entry; a root urlset is a single top-level entry.
    pub async fn crawl_site(&self, site_root: &str) -> std::result::Result<CrawlReport, CrawlError> {
        let site = validate_site_root(site_root)?;
        info!("Starting sitemap crawl of {}", site);
        let start = Instant::now();

        let locator = SitemapLocator::new(self.client.clone(), self.config.sitemap_candidates.clone());
        let fetched = locator.probe(&site).await?;
        let root_url = fetched.url.clone();

        let root = parse_sitemap(&root_url, &fetched.text()).map_err(|source| {
            CrawlError::RootFetchFailed {
                url: root_url.clone(),
                source,
            }
        })?;

        let walker = self.build_walker();
        let mut report = CrawlReport {
            sitemap_url: root_url.clone(),
            ..CrawlReport::default()
        };

        if !root.is_index() {
            report.top_level_entries = 1;
            self.report_progress(0, 1, &root_url);
            self.check_cancelled()?;
            report.records = walker.leaf_batch(&root_url, &root).await;
            self.report_progress(1, 1, &root_url);
        } else {
            let total = root.locs.len();
            report.top_level_entries = total;
            self.report_progress(0, total, &root_url);

            for (idx, entry) in root.locs.iter().enumerate() {
                self.check_cancelled()?;

                match walker.walk_from(entry, vec![root_url.clone()]).await {
                    Ok(outcome) => {
                        report.records.extend(outcome.records);
                        report.skipped.extend(outcome.skipped);
                    }
                    Err(ScanError::Cancelled) => return Err(CrawlError::Cancelled),
                    Err(e) => match self.config.subtree_policy {
                        SubtreePolicy::Abort => {
                            return Err(CrawlError::SubtreeFailed {
                                url: entry.clone(),
                                source: e,
                            });
                        }
                        SubtreePolicy::Skip => {
                            warn!("Skipping sitemap {}: {}", entry, e);
                            report.skipped.push(SkippedSitemap {
                                url: entry.clone(),
                                reason: e.to_string(),
                            });
                        }
                    },
                }

                self.report_progress(idx + 1, total, entry);
            }
        }

        info!(
            "Crawl of {} complete: {} pages, {} skipped sitemaps in {:?}",
            site,
            report.records.len(),
            report.skipped.len(),
            start.elapsed()
        );
        Ok(report)
    }

    fn build_walker(&self) -> SitemapTreeWalker<C> {
        let fetcher = Arc::new(PageMetadataFetcher::new(self.client.clone()));
        let mut coordinator = ConcurrencyCoordinator::new(fetcher, self.config.workers);
        if let Some(ref callback) = self.record_callback {
            coordinator = coordinator.with_record_callback(callback.clone());
        }

        SitemapTreeWalker::new(self.client.clone(), coordinator)
            .with_max_depth(self.config.max_depth)
            .with_subtree_policy(self.config.subtree_policy)
            .with_cancel_flag(self.cancel_flag.clone())
    }

    fn report_progress(&self, done: usize, total: usize, sitemap_url: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(done, total, sitemap_url.to_string());
        }
    }

    fn check_cancelled(&self) -> std::result::Result<(), CrawlError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(CrawlError::Cancelled);
        }
        Ok(())
    }
}

/// The site root must be an absolute http(s) URL. Returns it normalized.
pub fn validate_site_root(site_root: &str) -> std::result::Result<String, CrawlError> {
    let site = normalize_site_root(site_root);
    let parsed = Url::parse(&site).map_err(|e| CrawlError::InvalidSite {
        site: site_root.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CrawlError::InvalidSite {
            site: site_root.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(site)
}
