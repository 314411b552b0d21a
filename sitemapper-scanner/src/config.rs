use std::time::Duration;

/// Desktop browser identity sent with every request. Some hosts refuse
/// requests that look like bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Paths probed under the site root, in order, to find the root sitemap.
pub const DEFAULT_SITEMAP_CANDIDATES: [&str; 2] = ["sitemap_index.xml", "sitemap.xml"];

/// What to do when a nested sitemap cannot be fetched or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubtreePolicy {
    /// Log the failure, remember it in the report and carry on with siblings.
    #[default]
    Skip,
    /// Stop the whole crawl with the failure.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub workers: usize,
    pub max_depth: usize,
    pub subtree_policy: SubtreePolicy,
    pub sitemap_candidates: Vec<String>,
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: BROWSER_USER_AGENT.to_string(),
            workers: DEFAULT_WORKERS,
            max_depth: DEFAULT_MAX_DEPTH,
            subtree_policy: SubtreePolicy::default(),
            sitemap_candidates: DEFAULT_SITEMAP_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// A zero timeout would mean an unbounded wait, so it is bumped to one second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() {
            Duration::from_secs(1)
        } else {
            timeout
        };
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_subtree_policy(mut self, policy: SubtreePolicy) -> Self {
        self.subtree_policy = policy;
        self
    }

    pub fn with_sitemap_candidates(mut self, candidates: Vec<String>) -> Self {
        self.sitemap_candidates = candidates;
        self
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.workers, 10);
        assert_eq!(config.subtree_policy, SubtreePolicy::Skip);
        assert_eq!(
            config.sitemap_candidates,
            vec!["sitemap_index.xml".to_string(), "sitemap.xml".to_string()]
        );
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_timeout_and_workers_are_never_zero() {
        let config = ScannerConfig::new()
            .with_timeout(Duration::ZERO)
            .with_workers(0);
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.workers, 1);
    }
}
