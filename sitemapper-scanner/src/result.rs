use serde::{Deserialize, Serialize};

/// Title used when a page has no `<title>` element.
pub const NO_TITLE: &str = "No title found";

/// Prefix of the title of a record whose page could not be fetched.
pub const TITLE_ERROR_PREFIX: &str = "Error fetching title: ";

/// One content URL with its title and the category of the sitemap that listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub category: String,
}

impl PageRecord {
    pub fn new(url: String, title: String, category: String) -> Self {
        Self {
            url,
            title,
            category,
        }
    }

    pub fn with_error(url: String, category: String, error: impl std::fmt::Display) -> Self {
        Self {
            url,
            title: format!("{}{}", TITLE_ERROR_PREFIX, error),
            category,
        }
    }

    pub fn is_error(&self) -> bool {
        self.title.starts_with(TITLE_ERROR_PREFIX)
    }
}

/// Ordered records accumulated across every leaf sitemap of a crawl.
pub type ResultSet = Vec<PageRecord>;

/// A sitemap subtree that was skipped because it could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSitemap {
    pub url: String,
    pub reason: String,
}

/// Outcome of crawling one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    pub sitemap_url: String,
    pub top_level_entries: usize,
    pub records: ResultSet,
    pub skipped: Vec<SkippedSitemap>,
}

impl CrawlReport {
    /// True when the sitemap was located but yielded no pages.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }
}
