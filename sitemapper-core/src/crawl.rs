use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_scanner::{
    CrawlReport, PageRecord, ScannerConfig, SiteCrawler, SubtreePolicy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub sites: Vec<String>,
    pub workers: usize,
    pub timeout_secs: u64,
    pub max_depth: usize,
    /// Abort a site's crawl on the first broken nested sitemap instead of skipping it
    pub fail_fast: bool,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        let defaults = ScannerConfig::default();
        Self {
            sites: Vec::new(),
            workers: defaults.workers,
            timeout_secs: defaults.timeout.as_secs(),
            max_depth: defaults.max_depth,
            fail_fast: false,
            show_progress_bars: false,
        }
    }
}

/// The outcome of crawling one site
#[derive(Debug, Clone)]
pub struct SiteResult {
    pub site: String,
    pub outcome: Result<CrawlReport, String>,
}

impl SiteResult {
    pub fn records(&self) -> &[PageRecord] {
        match self.outcome {
            Ok(ref report) => &report.records,
            Err(_) => &[],
        }
    }
}

/// Callback for reporting crawl progress messages
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for reporting individual page records as they come in
pub type CrawlRecordCallback = Arc<dyn Fn(PageRecord) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Translate CLI-level options into scanner configuration
pub fn scanner_config(options: &CrawlOptions) -> ScannerConfig {
    let policy = if options.fail_fast {
        SubtreePolicy::Abort
    } else {
        SubtreePolicy::Skip
    };

    ScannerConfig::new()
        .with_workers(options.workers)
        .with_timeout(Duration::from_secs(options.timeout_secs))
        .with_max_depth(options.max_depth)
        .with_subtree_policy(policy)
}

/// Execute a crawl with the given options
/// Returns one result per site, in the order the sites were given
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    record_callback: Option<CrawlRecordCallback>,
) -> Result<Vec<SiteResult>, String> {
    if options.sites.is_empty() {
        return Err("No sites provided".to_string());
    }

    let config = scanner_config(&options);
    let mut results = Vec::with_capacity(options.sites.len());

    for (idx, site) in options.sites.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && options.sites.len() > 1
        {
            callback(format!(
                "Crawling site {}/{}: {}",
                idx + 1,
                options.sites.len(),
                site
            ));
        }

        let progress_bar = if options.show_progress_bars {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} sitemaps {msg}")
                    .unwrap()
                    .progress_chars("=>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message(format!("Locating sitemap for {}", site));
            Some(Arc::new(pb))
        } else {
            None
        };

        let page_count = Arc::new(AtomicUsize::new(0));
        let crawler = match SiteCrawler::new(config.clone()) {
            Ok(crawler) => crawler,
            Err(e) => return Err(format!("Failed to create HTTP client: {}", e)),
        };

        let crawler = match progress_bar {
            Some(ref pb) => {
                let pb_clone = pb.clone();
                let count_clone = page_count.clone();
                crawler.with_progress_callback(Arc::new(
                    move |done: usize, total: usize, sitemap_url: String| {
                        pb_clone.set_length(total as u64);
                        pb_clone.set_position(done as u64);
                        pb_clone.set_message(format!(
                            "{} ({} pages)",
                            extract_url_path(&sitemap_url),
                            count_clone.load(Ordering::Relaxed)
                        ));
                    },
                ))
            }
            None => crawler,
        };

        let record_cb = record_callback.clone();
        let count_clone = page_count.clone();
        let crawler = crawler.with_record_callback(Arc::new(move |record: &PageRecord| {
            count_clone.fetch_add(1, Ordering::Relaxed);
            if let Some(ref cb) = record_cb {
                cb(record.clone());
            }
        }));

        let outcome = crawler.crawl_site(site).await.map_err(|e| e.to_string());

        if let Some(ref pb) = progress_bar {
            match outcome {
                Ok(ref report) => pb.finish_with_message(format!(
                    "Done! {} pages from {}",
                    report.records.len(),
                    report.sitemap_url
                )),
                Err(_) => pb.abandon_with_message("Failed"),
            }
        }

        if let Err(ref e) = outcome {
            warn!("Failed to crawl {}: {}", site, e);
            if let Some(ref callback) = progress_callback {
                callback(format!("[!]  Failed to crawl {}: {}", site, e));
            }
        }

        results.push(SiteResult {
            site: site.clone(),
            outcome,
        });
    }

    Ok(results)
}
