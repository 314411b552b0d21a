use crate::error::CrawlError;
use crate::http::{FetchedBody, HttpFetch};
use std::sync::Arc;
use tracing::{debug, info};

/// Finds the root sitemap of a site by probing well-known paths in order.
pub struct SitemapLocator<C> {
    client: Arc<C>,
    candidates: Vec<String>,
}

impl<C: HttpFetch> SitemapLocator<C> {
    pub fn new(client: Arc<C>, candidates: Vec<String>) -> Self {
        Self { client, candidates }
    }

    /// Candidate sitemap URLs for `site_root`, in probe order.
    pub fn candidate_urls(&self, site_root: &str) -> Vec<String> {
        let root = normalize_site_root(site_root);
        self.candidates
            .iter()
            .map(|path| format!("{}/{}", root, path.trim_start_matches('/')))
            .collect()
    }

    /// Returns the URL of the first candidate that answers with a success status.
    pub async fn locate(&self, site_root: &str) -> Result<String, CrawlError> {
        self.probe(site_root).await.map(|fetched| fetched.url)
    }

    /// Like [`locate`](Self::locate) but keeps the response so the root
    /// sitemap does not have to be downloaded twice.
    pub async fn probe(&self, site_root: &str) -> Result<FetchedBody, CrawlError> {
        for candidate in self.candidate_urls(site_root) {
            match self.client.fetch(&candidate).await {
                Ok(fetched) => {
                    info!("Found sitemap at {}", candidate);
                    return Ok(fetched);
                }
                Err(e) => debug!("Sitemap candidate {} rejected: {}", candidate, e),
            }
        }

        Err(CrawlError::NoSitemapFound {
            site: normalize_site_root(site_root),
        })
    }
}

/// Strip surrounding whitespace and trailing slashes.
pub fn normalize_site_root(site_root: &str) -> String {
    site_root.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_SITEMAP_CANDIDATES, ScannerConfig};
    use crate::http::HttpClient;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn locator(server: &MockServer) -> (SitemapLocator<HttpClient>, String) {
        let config = ScannerConfig::default();
        let client = Arc::new(HttpClient::new(&config).unwrap());
        (
            SitemapLocator::new(client, config.sitemap_candidates),
            server.uri(),
        )
    }

    #[test]
    fn test_normalize_site_root() {
        assert_eq!(normalize_site_root("https://example.com/"), "https://example.com");
        assert_eq!(normalize_site_root(" https://example.com// "), "https://example.com");
        assert_eq!(normalize_site_root("https://example.com/blog"), "https://example.com/blog");
    }

    #[test]
    fn test_candidate_order() {
        let client = Arc::new(HttpClient::new(&ScannerConfig::default()).unwrap());
        let locator = SitemapLocator::new(
            client,
            DEFAULT_SITEMAP_CANDIDATES.iter().map(|s| s.to_string()).collect(),
        );
        assert_eq!(
            locator.candidate_urls("https://example.com/"),
            vec![
                "https://example.com/sitemap_index.xml",
                "https://example.com/sitemap.xml"
            ]
        );
    }

    #[tokio::test]
    async fn test_prefers_sitemap_index() {
        let mock_server = MockServer::start().await;

        for p in ["/sitemap_index.xml", "/sitemap.xml"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<urlset/>"))
                .mount(&mock_server)
                .await;
        }

        let (locator, root) = locator(&mock_server);
        let found = locator.locate(&format!("{}/", root)).await.unwrap();
        assert_eq!(found, format!("{}/sitemap_index.xml", root));
    }

    #[tokio::test]
    async fn test_falls_back_to_sitemap_xml() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sitemap_index.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<urlset/>"))
            .mount(&mock_server)
            .await;

        let (locator, root) = locator(&mock_server);
        let found = locator.locate(&root).await.unwrap();
        assert_eq!(found, format!("{}/sitemap.xml", root));
    }

    #[tokio::test]
    async fn test_no_sitemap_found() {
        let mock_server = MockServer::start().await;

        let (locator, root) = locator(&mock_server);
        let err = locator.locate(&root).await.unwrap_err();
        assert!(matches!(err, CrawlError::NoSitemapFound { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_not_found() {
        let client = Arc::new(HttpClient::new(&ScannerConfig::default()).unwrap());
        let locator = SitemapLocator::new(client, vec!["sitemap.xml".to_string()]);

        // Port 9 (discard) is closed on test machines, so the connection is refused.
        let err = locator.locate("http://127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, CrawlError::NoSitemapFound { .. }));
    }
}
