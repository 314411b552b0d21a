use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

// Re-export crawl types and functions from sitemapper-core
pub use sitemapper_core::crawl::{
    CrawlOptions, CrawlProgressCallback, SiteResult, execute_crawl, extract_url_path,
};
pub use sitemapper_core::report::{ReportFormat, generate_report};

// Helper functions for crawl handler

/// Load site roots from either a hosts file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse site roots from a file, one per line. Lines starting with `#` are ignored.
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let content = fs::read_to_string(&expanded)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a site root, adding https:// when no http(s) scheme is present
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("https://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some_and(|host| !host.contains(' '))
    {
        return Some(with_scheme);
    }

    eprintln!("{}  Skipping invalid URL '{}'", "⚠️".yellow(), line);
    None
}

/// clap value parser for `--url`, accepting bare hostnames
pub fn parse_site_arg(value: &str) -> Result<Url, String> {
    let candidate = value.trim();
    let with_scheme = if candidate.starts_with("http://") || candidate.starts_with("https://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    };

    let url = Url::parse(&with_scheme).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    if url.host_str().is_none() {
        return Err(format!("invalid URL '{}': missing host", value));
    }
    Ok(url)
}

/// Resolve the `--output` path, expanding `~` and appending the format's extension when absent
pub fn resolve_output_path(path: &Path, format: ReportFormat) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
    if expanded.extension().is_some() {
        expanded
    } else {
        expanded.with_extension(format.extension())
    }
}

/// Write a rendered report, creating parent directories as needed
pub fn write_report(content: &str, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    sitemapper_core::report::save_report(content, path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // try_init: a subscriber may already be installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_summary(results: &[SiteResult]) {
    for result in results {
        match result.outcome {
            Ok(ref report) if report.is_empty() => {
                println!(
                    "{} {}: {}",
                    "⚠".yellow().bold(),
                    result.site.bright_white(),
                    "No data found in the sitemap.".yellow()
                );
            }
            Ok(ref report) => {
                println!(
                    "{} {}: {} pages, {} title errors, {} skipped sitemaps",
                    "✓".green().bold(),
                    result.site.bright_white(),
                    report.records.len(),
                    report.error_count(),
                    report.skipped.len()
                );
            }
            Err(ref e) => {
                println!("{} {}: {}", "✗".red().bold(), result.site.bright_white(), e.red());
            }
        }
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    let verbose = sub_matches.get_flag("verbose");
    init_tracing(verbose);

    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let workers = *sub_matches.get_one::<usize>("workers").unwrap_or(&10);
    let timeout_secs = *sub_matches.get_one::<u64>("timeout").unwrap_or(&10);
    let max_depth = *sub_matches.get_one::<usize>("max-depth").unwrap_or(&8);
    let fail_fast = sub_matches.get_flag("fail-fast");
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches.get_one::<PathBuf>("output");

    // Load sites from source
    let sites = match load_urls_from_source(url, hosts_file) {
        Ok(sites) => sites,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Only the report itself goes to stdout when it is not being saved
    let chatty = !quiet && output.is_some();

    if chatty {
        println!("\n🗺️  Resolving sitemaps for {} site(s)", sites.len());
        println!("Workers: {}", workers);
        println!("Timeout: {}s", timeout_secs);
        println!("Max depth: {}", max_depth);
        println!(
            "Broken nested sitemaps: {}\n",
            if fail_fast { "abort site" } else { "skip" }
        );
    }

    let options = CrawlOptions {
        sites,
        workers,
        timeout_secs,
        max_depth,
        fail_fast,
        show_progress_bars: !quiet,
    };

    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            eprintln!("{}", msg);
        }))
    };

    let all_results = match execute_crawl(options, progress_callback, None).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let report = match generate_report(&all_results, format) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            let path = resolve_output_path(path, format);
            if let Err(e) = write_report(&report, &path) {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            if chatty {
                println!("\n{} Crawl complete!\n", "✓".green().bold());
                print_summary(&all_results);
                println!(
                    "\n{} Report saved to {}",
                    "→".blue(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", report),
    }

    if all_results.iter().all(|r| r.outcome.is_err()) {
        std::process::exit(1);
    }
}
