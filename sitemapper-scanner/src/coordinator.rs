use crate::http::HttpFetch;
use crate::page::PageMetadataFetcher;
use crate::result::PageRecord;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub type RecordCallback = Arc<dyn Fn(&PageRecord) + Send + Sync>;

/// Runs [`PageMetadataFetcher::fetch_one`] over one leaf batch with at most
/// `workers` fetches in flight.
pub struct ConcurrencyCoordinator<C> {
    fetcher: Arc<PageMetadataFetcher<C>>,
    workers: usize,
    record_callback: Option<RecordCallback>,
}

impl<C: HttpFetch + 'static> ConcurrencyCoordinator<C> {
    pub fn new(fetcher: Arc<PageMetadataFetcher<C>>, workers: usize) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            record_callback: None,
        }
    }

    pub fn with_record_callback(mut self, callback: RecordCallback) -> Self {
        self.record_callback = Some(callback);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns exactly one record per input URL once the whole batch is done.
    ///
    /// Each task writes its record into the slot of its input index. Dropping
    /// the returned future aborts whatever is still in flight.
    pub async fn fetch_all(&self, urls: Vec<String>, category: &str) -> Vec<PageRecord> {
        debug!(
            "Fetching {} pages for category '{}' with {} workers",
            urls.len(),
            category,
            self.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<PageRecord>> = vec![None; urls.len()];

        for (idx, url) in urls.iter().enumerate() {
            // Acquire before spawning so no more than `workers` tasks exist at once.
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let fetcher = self.fetcher.clone();
            let url = url.clone();
            let category = category.to_string();
            tasks.spawn(async move {
                let record = fetcher.fetch_one(&url, &category).await;
                drop(permit);
                (idx, record)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.store(joined, &mut slots);
        }

        slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| {
                slot.unwrap_or_else(|| {
                    warn!("Worker for {} did not produce a record", url);
                    PageRecord::with_error(url, category.to_string(), "worker task failed")
                })
            })
            .collect()
    }

    fn store(
        &self,
        joined: Result<(usize, PageRecord), tokio::task::JoinError>,
        slots: &mut [Option<PageRecord>],
    ) {
        match joined {
            Ok((idx, record)) => {
                if let Some(ref callback) = self.record_callback {
                    callback(&record);
                }
                slots[idx] = Some(record);
            }
            Err(e) => warn!("Page worker failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScanError};
    use crate::http::FetchedBody;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts how many fetches overlap and fails the URLs it is told to.
    struct InstrumentedClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        failing: HashSet<String>,
        delay: Duration,
    }

    impl InstrumentedClient {
        fn new(failing: &[&str], delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                failing: failing.iter().map(|s| s.to_string()).collect(),
                delay,
            }
        }
    }

    impl HttpFetch for InstrumentedClient {
        async fn fetch(&self, url: &str) -> Result<FetchedBody> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(url) {
                return Err(ScanError::Status {
                    url: url.to_string(),
                    status: 504,
                });
            }

            Ok(FetchedBody {
                url: url.to_string(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body: format!("<title>{url}</title>").into_bytes(),
                response_time: self.delay,
            })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/p{i}")).collect()
    }

    #[tokio::test]
    async fn test_peak_concurrency_never_exceeds_cap() {
        let client = Arc::new(InstrumentedClient::new(&[], Duration::from_millis(20)));
        let fetcher = Arc::new(PageMetadataFetcher::new(client.clone()));
        let coordinator = ConcurrencyCoordinator::new(fetcher, 10);

        let records = coordinator.fetch_all(urls(57), "post").await;

        assert_eq!(records.len(), 57);
        let peak = client.peak.load(Ordering::SeqCst);
        assert!(peak <= 10, "peak concurrency was {peak}");
        assert!(peak > 1, "expected overlapping fetches, peak was {peak}");
    }

    #[tokio::test]
    async fn test_cap_of_one_is_sequential_and_ordered() {
        let client = Arc::new(InstrumentedClient::new(&[], Duration::from_millis(1)));
        let fetcher = Arc::new(PageMetadataFetcher::new(client.clone()));
        let coordinator = ConcurrencyCoordinator::new(fetcher, 1);

        let input = urls(5);
        let records = coordinator.fetch_all(input.clone(), "page").await;

        assert_eq!(client.peak.load(Ordering::SeqCst), 1);
        let got: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
        assert_eq!(got, input);
        assert!(records.iter().all(|r| r.title == r.url));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let input = urls(6);
        let client = Arc::new(InstrumentedClient::new(
            &[input[3].as_str()],
            Duration::from_millis(5),
        ));
        let fetcher = Arc::new(PageMetadataFetcher::new(client));
        let coordinator = ConcurrencyCoordinator::new(fetcher, 3);

        let records = coordinator.fetch_all(input.clone(), "post").await;

        assert_eq!(records.len(), 6);
        for (idx, record) in records.iter().enumerate() {
            assert_eq!(record.url, input[idx]);
            assert_eq!(record.category, "post");
            if idx == 3 {
                assert!(record.is_error());
                assert!(record.title.contains("HTTP status 504"));
            } else {
                assert_eq!(record.title, input[idx]);
            }
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let client = Arc::new(InstrumentedClient::new(&[], Duration::ZERO));
        let fetcher = Arc::new(PageMetadataFetcher::new(client));
        let coordinator = ConcurrencyCoordinator::new(fetcher, 10);

        assert!(coordinator.fetch_all(Vec::new(), "post").await.is_empty());
    }

    #[tokio::test]
    async fn test_record_callback_sees_every_record() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();

        let client = Arc::new(InstrumentedClient::new(&[], Duration::from_millis(1)));
        let fetcher = Arc::new(PageMetadataFetcher::new(client));
        let coordinator = ConcurrencyCoordinator::new(fetcher, 4).with_record_callback(
            Arc::new(move |_record: &PageRecord| {
                seen_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        coordinator.fetch_all(urls(9), "post").await;
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn test_dropping_batch_aborts_workers() {
        let client = Arc::new(InstrumentedClient::new(&[], Duration::from_secs(30)));
        let fetcher = Arc::new(PageMetadataFetcher::new(client));
        let coordinator = ConcurrencyCoordinator::new(fetcher.clone(), 5);

        let batch = coordinator.fetch_all(urls(20), "post");
        let timed_out = tokio::time::timeout(Duration::from_millis(50), batch).await;
        assert!(timed_out.is_err());

        // Aborted tasks release their fetcher handles once the runtime reaps them.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&fetcher), 2);
    }
}
