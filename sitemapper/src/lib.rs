// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    load_urls_from_file, load_urls_from_source, parse_site_arg, parse_url_line,
    resolve_output_path, write_report,
};

// Re-export crawl functionality from sitemapper-core
pub use sitemapper_core::crawl::{
    CrawlOptions, CrawlProgressCallback, SiteResult, execute_crawl, extract_url_path,
};
