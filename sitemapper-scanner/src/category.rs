//! Sitemap filename to category label.
//!
//! Classification only looks at the URL string, so the same sitemap URL always
//! maps to the same category.

use url::Url;

pub const POST_CATEGORY: &str = "post";
pub const PAGE_CATEGORY: &str = "page";

/// Derive the category label for every page listed by `sitemap_url`.
///
/// * `.../post-sitemap.xml`, `.../post-sitemap3.xml` -> `"post"`
/// * anything with `page-sitemap` in its path -> `"page"`
/// * `.../product-category-sitemap.xml` -> `"product category"`
///
/// An empty label is a valid result.
pub fn classify(sitemap_url: &str) -> String {
    let path = sitemap_path(sitemap_url);
    let filename = path.rsplit('/').next().unwrap_or_default();

    if is_post_sitemap(filename) {
        return POST_CATEGORY.to_string();
    }

    if path.contains("page-sitemap") {
        return PAGE_CATEGORY.to_string();
    }

    let stem = filename.strip_suffix(".xml").unwrap_or(filename);
    stem.strip_suffix("-sitemap")
        .unwrap_or(stem)
        .replace('-', " ")
}

/// The path portion of the URL, without query or fragment.
fn sitemap_path(sitemap_url: &str) -> String {
    match Url::parse(sitemap_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => sitemap_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// `post-sitemap`, optional digits, then `.xml`.
fn is_post_sitemap(filename: &str) -> bool {
    const MARKER: &str = "post-sitemap";

    filename.match_indices(MARKER).any(|(idx, _)| {
        let rest = &filename[idx + MARKER.len()..];
        rest.trim_start_matches(|c: char| c.is_ascii_digit())
            .starts_with(".xml")
    })
}
