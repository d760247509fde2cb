//! HTML generation from rendered pages.
//!
//! A page's layout template renders the inner markup, which is then wrapped in
//! the `base` template.

use quire_core::{Config, Page};
use quire_parser::syntax::html_escape;
use thiserror::Error;
use tracing::debug;

use crate::{
    navigation::{NavEntry, Navigation},
    template::{TemplateContext, TemplateError, TemplateRegistry},
};

/// HTML generation errors.
#[derive(Debug, Error)]
pub enum HtmlError {
    /// Template error.
    #[error("template error in {page}: {source}")]
    Template {
        page: String,
        #[source]
        source: TemplateError,
    },

    /// A page asks for a layout that is not registered.
    #[error("{page} uses unknown layout `{layout}` (available: {available})")]
    UnknownLayout {
        page: String,
        layout: String,
        available: String,
    },
}

/// Result type for HTML generation.
pub type Result<T> = std::result::Result<T, HtmlError>;

/// Layouts that wrap other templates and cannot be chosen by a page.
const RESERVED_LAYOUTS: [&str; 2] = ["base", "404"];

/// HTML page generator.
#[derive(Debug)]
pub struct HtmlGenerator<'a> {
    config: &'a Config,
    templates: &'a TemplateRegistry,
    navigation: &'a Navigation,
    stylesheet: String,
}

impl<'a> HtmlGenerator<'a> {
    /// Create a new HTML generator.
    #[must_use]
    pub fn new(config: &'a Config, templates: &'a TemplateRegistry, navigation: &'a Navigation) -> Self {
        Self {
            config,
            templates,
            navigation,
            stylesheet: config.url_for("/assets/theme.css"),
        }
    }

    /// Use a different stylesheet URL, e.g. a fingerprinted one.
    #[must_use]
    pub fn with_stylesheet(mut self, url: impl Into<String>) -> Self {
        self.stylesheet = url.into();
        self
    }

    /// Check that a page's layout can be rendered.
    pub fn check_layout(&self, page: &Page) -> Result<()> {
        if self.templates.contains(&page.layout) && !RESERVED_LAYOUTS.contains(&page.layout.as_str()) {
            return Ok(());
        }

        let available = self
            .templates
            .names()
            .filter(|name| !RESERVED_LAYOUTS.contains(name))
            .collect::<Vec<_>>()
            .join(", ");
        Err(HtmlError::UnknownLayout {
            page: page.key.clone(),
            layout: page.layout.clone(),
            available,
        })
    }

    /// Generate the full HTML document for a page.
    pub fn generate_page(&self, page: &Page) -> Result<String> {
        debug!(url = %page.url, layout = %page.layout, "generating HTML for page");
        self.check_layout(page)?;

        let inner_ctx = TemplateContext::new()
            .with_var("title", html_escape(&page.title))
            .with_var("content", page.content.as_str())
            .with_var("sidebar", self.sidebar_html(&page.key))
            .with_var("home_url", self.config.url_for("/"))
            .with_opt("description", page.description.as_deref().map(html_escape))
            .with_opt("outline", self.outline_html(page))
            .with_opt("prev_next", self.prev_next_html(&page.key))
            .with_opt("updated", page.updated.map(|date| {
                format!(
                    "<p class=\"last-updated\">Last updated: <time datetime=\"{0}\">{0}</time></p>",
                    date.format("%Y-%m-%d")
                )
            }));

        let inner = self
            .templates
            .render(&page.layout, &inner_ctx)
            .map_err(|source| HtmlError::Template {
                page: page.key.clone(),
                source,
            })?;

        self.wrap(&page.key, &page.title, page.description.as_deref(), &page.url, &inner)
    }

    /// Generate the not-found page.
    pub fn generate_not_found(&self) -> Result<String> {
        let ctx = TemplateContext::new().with_var("home_url", self.config.url_for("/"));
        let inner = self
            .templates
            .render("404", &ctx)
            .map_err(|source| HtmlError::Template {
                page: "404.html".to_string(),
                source,
            })?;

        self.wrap("404.html", "Page not found", None, "", &inner)
    }

    fn wrap(
        &self,
        key: &str,
        title: &str,
        description: Option<&str>,
        url: &str,
        inner: &str,
    ) -> Result<String> {
        let site = &self.config.site;
        let is_home = url == "/";
        let title_suffix = (!is_home && title != site.title).then(|| format!(" | {}", html_escape(&site.title)));
        let canonical = (!url.is_empty())
            .then(|| self.config.absolute_url(url))
            .flatten()
            .map(|href| format!("<link rel=\"canonical\" href=\"{}\">", html_escape(&href)));

        let ctx = TemplateContext::new()
            .with_var("lang", html_escape(&site.language))
            .with_var("title", html_escape(title))
            .with_var("site_title", html_escape(&site.title))
            .with_var("home_url", self.config.url_for("/"))
            .with_var("base_path", site.base_path.as_str())
            .with_var("stylesheet", self.stylesheet.as_str())
            .with_var("content", inner)
            .with_opt("title_suffix", title_suffix)
            .with_opt(
                "description",
                description.or(site.description.as_deref()).map(html_escape),
            )
            .with_opt("canonical", canonical);

        self.templates
            .render("base", &ctx)
            .map_err(|source| HtmlError::Template {
                page: key.to_string(),
                source,
            })
    }

    /// Sidebar markup with the entry for `active` highlighted.
    pub fn sidebar_html(&self, active: &str) -> String {
        let mut html = String::new();
        self.sidebar_level(self.navigation.entries(), active, &mut html);
        html
    }

    fn sidebar_level(&self, entries: &[NavEntry], active: &str, html: &mut String) {
        if entries.is_empty() {
            return;
        }

        html.push_str("<ul class=\"sidebar-items\">\n");
        for entry in entries {
            let mut class = String::from("sidebar-item");
            if entry.target == active {
                class.push_str(" is-active");
            } else if entry.contains(active) {
                class.push_str(" has-active");
            }

            html.push_str(&format!(
                "<li class=\"{class}\"><a href=\"{}\">{}</a>",
                html_escape(&self.config.url_for(&entry.url)),
                html_escape(&entry.label)
            ));
            if !entry.children.is_empty() {
                html.push('\n');
                self.sidebar_level(&entry.children, active, html);
            }
            html.push_str("</li>\n");
        }
        html.push_str("</ul>");
    }

    /// Outline markup, or `None` when disabled or empty.
    pub fn outline_html(&self, page: &Page) -> Option<String> {
        let entries = page.outline_entries();
        if entries.is_empty() {
            return None;
        }

        let mut html = String::from(
            "<nav class=\"outline\" aria-label=\"On this page\">\n<p class=\"outline-title\">On this page</p>\n<ul>\n",
        );
        for entry in entries {
            html.push_str(&format!(
                "<li class=\"outline-level-{}\"><a href=\"#{}\">{}</a></li>\n",
                entry.level,
                html_escape(&entry.id),
                html_escape(&entry.text)
            ));
        }
        html.push_str("</ul>\n</nav>");
        Some(html)
    }

    /// Previous/next links following the navigation order.
    pub fn prev_next_html(&self, key: &str) -> Option<String> {
        let (prev, next) = self.navigation.neighbors(key);
        if prev.is_none() && next.is_none() {
            return None;
        }

        let link = |entry: &NavEntry, class: &str, desc: &str| {
            format!(
                "<a class=\"pager-link {class}\" href=\"{}\"><span class=\"desc\">{desc}</span><span class=\"title\">{}</span></a>",
                html_escape(&self.config.url_for(&entry.url)),
                html_escape(&entry.label)
            )
        };

        let mut html = String::from("<nav class=\"prev-next\">");
        if let Some(prev) = prev {
            html.push_str(&link(prev, "prev", "Previous page"));
        }
        if let Some(next) = next {
            html.push_str(&link(next, "next", "Next page"));
        }
        html.push_str("</nav>");
        Some(html)
    }
}
