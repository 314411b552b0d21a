use crate::http::HttpFetch;
use crate::result::{NO_TITLE, PageRecord};
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches a single content page and turns it into a [`PageRecord`].
pub struct PageMetadataFetcher<C> {
    client: Arc<C>,
}

impl<C: HttpFetch> PageMetadataFetcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Never fails: transport errors, bad statuses and timeouts end up in the
    /// record's title instead.
    pub async fn fetch_one(&self, url: &str, category: &str) -> PageRecord {
        match self.client.fetch(url).await {
            Ok(fetched) => {
                let title = extract_title(&fetched.text());
                debug!("Title for {}: {}", url, title);
                PageRecord::new(url.to_string(), title, category.to_string())
            }
            Err(e) => {
                warn!("Failed to fetch title for {}: {}", url, e);
                PageRecord::with_error(url.to_string(), category.to_string(), e)
            }
        }
    }
}

/// Trimmed text of the first `<title>` element, or [`NO_TITLE`].
pub fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").unwrap();

    document
        .select(&title_selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| NO_TITLE.to_string())
}
