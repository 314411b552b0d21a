// Report generation from crawl results

use crate::crawl::SiteResult;
use sitemapper_scanner::PageRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Markdown => "md",
        }
    }
}

pub fn generate_report(results: &[SiteResult], format: ReportFormat) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(results)),
        ReportFormat::Json => generate_json_report(results)
            .map_err(|e| format!("Failed to serialize report: {}", e)),
        ReportFormat::Csv => Ok(generate_csv_report(results)),
        ReportFormat::Markdown => Ok(generate_markdown_report(results)),
    }
}

pub fn generate_text_report(results: &[SiteResult]) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                          SITEMAP URL EXTRACTOR REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    for result in results {
        report.push_str(&format!("## {}\n\n", result.site));

        let site_report = match result.outcome {
            Ok(ref site_report) => site_report,
            Err(ref e) => {
                report.push_str(&format!("  Error: {}\n\n", e));
                continue;
            }
        };

        report.push_str(&format!("  Sitemap:      {}\n", site_report.sitemap_url));
        report.push_str(&format!("  Sitemaps:     {}\n", site_report.top_level_entries));
        report.push_str(&format!("  Pages:        {}\n", site_report.records.len()));
        report.push_str(&format!("  Title errors: {}\n", site_report.error_count()));

        if !site_report.skipped.is_empty() {
            report.push_str(&format!("  Skipped:      {}\n", site_report.skipped.len()));
            for skipped in &site_report.skipped {
                report.push_str(&format!("    - {} ({})\n", skipped.url, skipped.reason));
            }
        }
        report.push('\n');

        if site_report.is_empty() {
            report.push_str("  No data found in the sitemap.\n\n");
            continue;
        }

        for (category, records) in group_by_category(&site_report.records) {
            let label = if category.is_empty() { "(uncategorized)" } else { category };
            report.push_str(&format!("  [{}] {} pages\n", label, records.len()));
            for record in records {
                report.push_str(&format!("    {}\n      {}\n", record.title, record.url));
            }
            report.push('\n');
        }
    }

    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!(
        "Generated by Sitemapper v{} at {}\n",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    report
}

pub fn generate_json_report(results: &[SiteResult]) -> Result<String, serde_json::Error> {
    let sites: Vec<serde_json::Value> = results
        .iter()
        .map(|result| match result.outcome {
            Ok(ref report) => serde_json::json!({
                "site": result.site,
                "sitemap_url": report.sitemap_url,
                "top_level_entries": report.top_level_entries,
                "total_pages": report.records.len(),
                "title_errors": report.error_count(),
                "skipped_sitemaps": report.skipped,
                "records": report.records,
            }),
            Err(ref e) => serde_json::json!({
                "site": result.site,
                "error": e,
            }),
        })
        .collect();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Sitemapper",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "sites": sites
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// One row per page record: URL, page title, category.
pub fn generate_csv_report(results: &[SiteResult]) -> String {
    let mut csv = String::from("URL,Page Title,Category\n");

    for record in results.iter().flat_map(|r| r.records()) {
        csv.push_str(&format!(
            "{},{},{}\n",
            csv_escape(&record.url),
            csv_escape(&record.title),
            csv_escape(&record.category)
        ));
    }

    csv
}

pub fn generate_markdown_report(results: &[SiteResult]) -> String {
    let mut md = String::from("# Sitemap URL Extractor Report\n\n");

    for result in results {
        md.push_str(&format!("## {}\n\n", result.site));

        match result.outcome {
            Err(ref e) => md.push_str(&format!("**Error:** {}\n\n", markdown_escape(e))),
            Ok(ref report) if report.is_empty() => {
                md.push_str("_No data found in the sitemap._\n\n");
            }
            Ok(ref report) => {
                md.push_str(&format!(
                    "{} pages from `{}`\n\n",
                    report.records.len(),
                    report.sitemap_url
                ));
                md.push_str("| URL | Page Title | Category |\n");
                md.push_str("|-----|------------|----------|\n");
                for record in &report.records {
                    md.push_str(&format!(
                        "| {} | {} | {} |\n",
                        markdown_escape(&record.url),
                        markdown_escape(&record.title),
                        markdown_escape(&record.category)
                    ));
                }
                md.push('\n');
            }
        }
    }

    md
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Records grouped by category, groups in order of first appearance.
pub fn group_by_category(records: &[PageRecord]) -> Vec<(&str, Vec<&PageRecord>)> {
    let mut groups: Vec<(&str, Vec<&PageRecord>)> = Vec::new();

    for record in records {
        match groups.iter_mut().find(|(c, _)| *c == record.category) {
            Some((_, members)) => members.push(record),
            None => groups.push((record.category.as_str(), vec![record])),
        }
    }

    groups
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn markdown_escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_markdown_escape() {
        assert_eq!(markdown_escape("Home | Shop"), "Home \\| Shop");
        assert_eq!(markdown_escape("two\nlines"), "two lines");
    }
}
