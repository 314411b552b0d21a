use crate::config::ScannerConfig;
use crate::error::{Result, ScanError};
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// A successful (2xx) response with its body already read.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub response_time: Duration,
}

impl FetchedBody {
    /// Body decoded as UTF-8, whatever charset the server declared.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The single network seam of the scanner. Every sitemap and page request
/// goes through an implementation of this trait.
pub trait HttpFetch: Send + Sync {
    /// GET `url`. Non-2xx statuses and non-http(s) URLs are errors.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedBody>> + Send;
}

/// reqwest-backed fetcher with a browser User-Agent and a finite timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &ScannerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(config.workers.max(1))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl HttpFetch for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedBody> {
        debug!("Fetching {}", url);

        let target = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "{url}: unsupported scheme '{}'",
                target.scheme()
            )));
        }

        let start = Instant::now();
        let response = self.client.get(target).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await?.to_vec();
        let response_time = start.elapsed();
        debug!("Fetched {} ({} bytes in {:?})", url, body.len(), response_time);

        Ok(FetchedBody {
            url: url.to_string(),
            status: status.as_u16(),
            content_type,
            body,
            response_time,
        })
    }
}
