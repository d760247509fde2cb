//! Sitemap generation.

use chrono::{DateTime, Utc};
use quire_core::{Config, Page};
use thiserror::Error;
use tracing::debug;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// Absolute URLs need `site.base_url`.
    #[error("sitemap requires site.base_url to be set")]
    MissingBaseUrl,
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// A sitemap URL entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapUrl {
    /// Absolute URL.
    pub loc: String,

    /// Last modification date.
    pub lastmod: Option<DateTime<Utc>>,
}

/// Sitemap generator.
#[derive(Debug)]
pub struct SitemapGenerator<'a> {
    config: &'a Config,
}

impl<'a> SitemapGenerator<'a> {
    /// Create a new sitemap generator.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Whether the configuration allows a sitemap.
    pub fn enabled(&self) -> bool {
        self.config.site.base_url.is_some()
    }

    /// Generate sitemap XML; URLs are sorted so output is stable.
    pub fn generate(&self, pages: &[&Page]) -> Result<String> {
        debug!(count = pages.len(), "generating sitemap");

        let mut urls = pages
            .iter()
            .map(|page| self.page_to_url(page))
            .collect::<Result<Vec<_>>>()?;
        urls.sort_by(|a, b| a.loc.cmp(&b.loc));

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');
        for url in &urls {
            xml.push_str(&url_to_xml(url));
        }
        xml.push_str("</urlset>\n");

        Ok(xml)
    }

    fn page_to_url(&self, page: &Page) -> Result<SitemapUrl> {
        let loc = self
            .config
            .absolute_url(&page.url)
            .ok_or(SitemapError::MissingBaseUrl)?;
        Ok(SitemapUrl {
            loc,
            lastmod: page.updated,
        })
    }
}

fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));
    if let Some(lastmod) = &url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }
    xml.push_str("  </url>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
