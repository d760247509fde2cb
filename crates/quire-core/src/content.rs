//! Content types and structures.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    frontmatter::{Frontmatter, parse_frontmatter},
};

/// File extensions treated as markdown documents.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Whether a file extension names a markdown document.
pub fn is_markdown_extension(ext: &str) -> bool {
    MARKDOWN_EXTENSIONS
        .iter()
        .any(|candidate| ext.eq_ignore_ascii_case(candidate))
}

/// Location of a document within the content tree, and the URL derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    /// Content-relative key with `/` separators, e.g. `guide/intro.md`.
    pub key: String,

    /// URL slug without slashes at either end; empty for the root index.
    pub slug: String,
}

impl DocumentPath {
    /// Parse a content-relative path.
    ///
    /// - `index.md` → slug `""`, URL `/`
    /// - `guide/index.md` → slug `guide`, URL `/guide/`
    /// - `guide/intro.md` → slug `guide/intro`, URL `/guide/intro/`
    ///
    /// Returns `None` for non-markdown files and paths escaping the root.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if !is_markdown_extension(extension) {
            return None;
        }

        let key = normalize_key(path)?;
        let without_ext = key.strip_suffix(extension)?.strip_suffix('.')?;

        let slug = if without_ext == "index" {
            String::new()
        } else if let Some(dir) = without_ext.strip_suffix("/index") {
            dir.to_string()
        } else {
            without_ext.to_string()
        };

        Some(Self { key, slug })
    }

    /// Whether this is an `index` document of its directory.
    pub fn is_index(&self) -> bool {
        Path::new(&self.key).file_stem().is_some_and(|stem| stem == "index")
    }

    /// Whether this is the site's home page.
    pub fn is_root(&self) -> bool {
        self.slug.is_empty()
    }

    /// Directory key that contains this document (`""` at the root).
    pub fn parent_dir(&self) -> &str {
        self.key.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Get the URL path for this content, relative to the base path.
    pub fn url_path(&self) -> String {
        if self.slug.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.slug)
        }
    }

    /// Output file relative to the output directory.
    pub fn output_path(&self) -> PathBuf {
        if self.slug.is_empty() {
            PathBuf::from("index.html")
        } else {
            PathBuf::from(&self.slug).join("index.html")
        }
    }

    /// Human-readable title derived from the file or directory name.
    pub fn fallback_title(&self) -> String {
        let name = self.slug.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return "Home".to_string();
        }

        let spaced = name.replace(['-', '_'], " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => spaced,
        }
    }
}

/// Join a relative path's components with `/`, resolving `.` and `..`.
///
/// Returns `None` when the path is absolute or climbs above its root.
pub fn normalize_key(path: &Path) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// A markdown source file: path, parsed frontmatter and raw body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Location within the content tree.
    pub path: DocumentPath,

    /// Parsed frontmatter metadata.
    pub frontmatter: Frontmatter,

    /// Markdown body after the frontmatter block.
    pub body: String,
}

impl Document {
    /// Parse a document's text. `source` is used in error messages.
    pub fn parse(path: DocumentPath, content: &str, source: &Path) -> Result<Self> {
        let (frontmatter, body) = parse_frontmatter(content, source)?;
        Ok(Self {
            path,
            frontmatter,
            body,
        })
    }

    /// Display title: frontmatter `title`, first `#` heading, then the file name.
    pub fn title(&self) -> String {
        let title = self.frontmatter.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }

        first_heading(&self.body).unwrap_or_else(|| self.path.fallback_title())
    }
}

/// Text of the first ATX level-1 heading outside fenced code.
fn first_heading(body: &str) -> Option<String> {
    let mut fence: Option<&str> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();

        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        if let Some(text) = trimmed.strip_prefix("# ") {
            let text = text.trim().trim_end_matches('#').trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }

    None
}

/// Rendered markdown body with the metadata collected while rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedContent {
    /// Rendered HTML content.
    pub html: String,

    /// Table of contents extracted from headings.
    pub toc: Vec<TocEntry>,

    /// Fence language tags with no highlighter, in order of first use.
    pub unknown_languages: Vec<String>,

    /// Content keys of markdown documents this body links to.
    pub links: Vec<String>,

    /// Non-fatal markup problems, such as unclosed containers.
    pub warnings: Vec<String>,
}

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,

    /// Heading text.
    pub text: String,

    /// Anchor ID for linking.
    pub id: String,
}

/// A fully processed page ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Content key of the source document.
    pub key: String,

    /// URL path for this page, relative to the base path.
    pub url: String,

    /// Page title.
    pub title: String,

    /// Page description for meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Layout template name.
    pub layout: String,

    /// Sort weight for ordering.
    #[serde(default)]
    pub weight: i32,

    /// Last updated date.
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,

    /// Rendered HTML content.
    pub content: String,

    /// Table of contents.
    #[serde(default)]
    pub toc: Vec<TocEntry>,

    /// Heading range for the outline; `None` hides it.
    #[serde(default)]
    pub outline: Option<(u8, u8)>,

    /// Output file relative to the output directory.
    pub output_path: PathBuf,

    /// Fence languages that rendered as plain text.
    #[serde(default)]
    pub unknown_languages: Vec<String>,

    /// Content keys of linked documents.
    #[serde(default)]
    pub links: Vec<String>,

    /// Non-fatal markup problems found while rendering.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Page {
    /// Create a new page from a document and its rendered body.
    pub fn from_parsed(document: &Document, content: ParsedContent) -> Self {
        let fm = &document.frontmatter;

        Self {
            key: document.path.key.clone(),
            url: document.path.url_path(),
            title: document.title(),
            description: fm.description.clone(),
            layout: fm.layout.clone().unwrap_or_else(|| "doc".to_string()),
            weight: fm.weight,
            updated: fm.updated,
            content: content.html,
            toc: content.toc,
            outline: fm.outline_levels(),
            output_path: document.path.output_path(),
            unknown_languages: content.unknown_languages,
            links: content.links,
            warnings: content.warnings,
        }
    }

    /// Outline entries within the page's configured heading range.
    pub fn outline_entries(&self) -> Vec<&TocEntry> {
        match self.outline {
            Some((min, max)) => self
                .toc
                .iter()
                .filter(|entry| (min..=max).contains(&entry.level))
                .collect(),
            None => Vec::new(),
        }
    }
}
