use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error in {url}: {reason}")]
    ParseError { url: String, reason: String },

    #[error("Sitemap {0} references one of its own ancestors")]
    SitemapCycle(String),

    #[error("Sitemap index {url} is nested more than {max_depth} levels below the root")]
    DepthLimit { url: String, max_depth: usize },

    #[error("Crawl cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by [`crate::SiteCrawler::crawl_site`].
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid site root '{site}': {reason}")]
    InvalidSite { site: String, reason: String },

    #[error("No valid sitemap found for {site}")]
    NoSitemapFound { site: String },

    #[error("Error fetching sitemap {url}: {source}")]
    RootFetchFailed {
        url: String,
        #[source]
        source: ScanError,
    },

    #[error("Sitemap {url} failed: {source}")]
    SubtreeFailed {
        url: String,
        #[source]
        source: ScanError,
    },

    #[error("Crawl cancelled")]
    Cancelled,
}
