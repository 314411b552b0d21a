pub mod category;
pub mod config;
pub mod coordinator;
pub mod crawler;
pub mod error;
pub mod http;
pub mod locator;
pub mod page;
pub mod result;
pub mod sitemap;
pub mod walker;

pub use category::classify;
pub use config::{ScannerConfig, SubtreePolicy};
pub use coordinator::{ConcurrencyCoordinator, RecordCallback};
pub use crawler::{ProgressCallback, SiteCrawler};
pub use error::{CrawlError, ScanError};
pub use http::{FetchedBody, HttpClient, HttpFetch};
pub use locator::SitemapLocator;
pub use page::PageMetadataFetcher;
pub use result::{CrawlReport, PageRecord, ResultSet, SkippedSitemap};
pub use walker::SitemapTreeWalker;
