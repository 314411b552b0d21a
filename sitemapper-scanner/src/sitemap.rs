//! Sitemap XML parsing.
//!
//! Handles both `<sitemapindex>/<sitemap>/<loc>` and `<urlset>/<url>/<loc>`
//! documents. Namespace prefixes are ignored; only local names are compared.

use crate::error::{Result, ScanError};
use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

/// Extensions of asset entries that image sitemaps mix into urlsets.
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    ".jpg", ".jpeg", ".png", ".webp", ".gif", ".svg", ".bmp", ".tiff", ".ico",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    /// Entries are further sitemaps.
    Index,
    /// Entries are content pages.
    UrlSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    pub kind: SitemapKind,
    /// Every `<loc>` text in document order.
    pub locs: Vec<String>,
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        self.kind == SitemapKind::Index
    }

    /// The `<loc>` entries that are content pages rather than image assets.
    pub fn page_urls(&self) -> Vec<String> {
        self.locs
            .iter()
            .filter(|loc| !is_image_url(loc))
            .cloned()
            .collect()
    }
}

/// Parse a sitemap body fetched from `url`.
///
/// A document containing at least one `<sitemap>` element is an index,
/// anything else is treated as a urlset.
pub fn parse_sitemap(url: &str, xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut is_index = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"sitemap" => is_index = true,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"sitemap" {
                    is_index = true;
                }
            }
            Ok(Event::Text(ref e)) if in_loc => {
                let text = e.unescape().map_err(|err| ScanError::ParseError {
                    url: url.to_string(),
                    reason: err.to_string(),
                })?;
                current.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"loc" && in_loc {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    in_loc = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScanError::ParseError {
                    url: url.to_string(),
                    reason: format!(
                        "invalid XML at position {}: {}",
                        reader.error_position(),
                        e
                    ),
                });
            }
            _ => {}
        }
    }

    let kind = if is_index {
        SitemapKind::Index
    } else {
        SitemapKind::UrlSet
    };

    Ok(SitemapDocument { kind, locs })
}

/// True when the URL path ends with one of [`IMAGE_EXTENSIONS`], ignoring case.
pub fn is_image_url(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
