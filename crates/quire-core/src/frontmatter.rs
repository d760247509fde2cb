//! Frontmatter parsing for content files.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Heading levels shown in the page outline when a document does not say otherwise.
pub const DEFAULT_OUTLINE: (u8, u8) = (2, 3);

/// Frontmatter metadata for content files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    /// Page title. Falls back to the first `#` heading, then the file stem.
    pub title: String,

    /// Page description for meta tags.
    pub description: Option<String>,

    /// Layout template (`doc` when unset).
    pub layout: Option<String>,

    /// Sort weight for inferred navigation. Lower sorts first.
    pub weight: i32,

    /// Which headings appear in the page outline.
    pub outline: Option<Outline>,

    /// Last updated date, used for the sitemap.
    #[serde(default, deserialize_with = "date::deserialize")]
    pub updated: Option<DateTime<Utc>>,

    /// Unrecognised keys, kept for custom templates.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Outline setting: `false`, a single level, a `[min, max]` range, or `"deep"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outline {
    Enabled(bool),
    Level(u8),
    Range([u8; 2]),
    Named(String),
}

impl Outline {
    /// Inclusive heading range to show, or `None` when the outline is disabled.
    pub fn levels(&self) -> Option<(u8, u8)> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some(DEFAULT_OUTLINE),
            Self::Level(level) => Some((*level, *level)),
            Self::Range([min, max]) => Some((*min, *max)),
            Self::Named(name) if name == "deep" => Some((2, 6)),
            Self::Named(_) => Some(DEFAULT_OUTLINE),
        }
    }
}

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// A frontmatter block split from the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontmatterBlock<'a> {
    pub format: FrontmatterFormat,
    /// Text between the delimiter lines.
    pub raw: &'a str,
    /// 1-based line of the opening delimiter.
    pub line: usize,
    /// Everything after the closing delimiter line.
    pub body: &'a str,
}

/// An opening delimiter with no matching closing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnclosedFrontmatter {
    pub format: FrontmatterFormat,
    /// 1-based line of the opening delimiter.
    pub line: usize,
}

/// Split content into frontmatter and body.
///
/// The opening delimiter must be the first non-blank line; the block ends at
/// the next line consisting only of the same delimiter.
pub fn split_frontmatter(
    content: &str,
) -> std::result::Result<Option<FrontmatterBlock<'_>>, UnclosedFrontmatter> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut offset = 0;
    let mut line = 1;
    for l in content.split_inclusive('\n') {
        if !l.trim().is_empty() {
            break;
        }
        offset += l.len();
        line += 1;
    }

    let rest = &content[offset..];
    let first_end = rest.find('\n').map_or(rest.len(), |i| i + 1);
    let format = match rest[..first_end].trim_end() {
        "---" => FrontmatterFormat::Yaml,
        "+++" => FrontmatterFormat::Toml,
        _ => return Ok(None),
    };

    let after_first = &rest[first_end..];
    let mut pos = 0;
    for l in after_first.split_inclusive('\n') {
        if l.trim_end() == format.delimiter() {
            return Ok(Some(FrontmatterBlock {
                format,
                raw: &after_first[..pos],
                line,
                body: after_first[pos + l.len()..].trim_start(),
            }));
        }
        pos += l.len();
    }

    Err(UnclosedFrontmatter { format, line })
}

/// Parse frontmatter from a string, returning the metadata and the body.
///
/// Content without a frontmatter block yields default metadata and the full text.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Frontmatter, String)> {
    let block = match split_frontmatter(content) {
        Ok(Some(block)) => block,
        Ok(None) => return Ok((Frontmatter::default(), content.to_string())),
        Err(unclosed) => {
            return Err(CoreError::frontmatter(
                path,
                unclosed.line,
                format!(
                    "missing closing `{}` delimiter",
                    unclosed.format.delimiter()
                ),
            ));
        }
    };

    let frontmatter: Frontmatter = if block.raw.trim().is_empty() {
        Frontmatter::default()
    } else {
        match block.format {
            FrontmatterFormat::Yaml => serde_yaml::from_str(block.raw).map_err(|e| {
                let line = block.line + e.location().map_or(0, |loc| loc.line());
                CoreError::frontmatter(path, line, yaml_message(&e))
            })?,
            FrontmatterFormat::Toml => toml::from_str(block.raw).map_err(|e| {
                let line = block.line + e.span().map_or(0, |span| line_of(block.raw, span.start));
                CoreError::frontmatter(path, line, e.message().to_string())
            })?,
        }
    };

    frontmatter.validate(path, block.line)?;
    Ok((frontmatter, block.body.to_string()))
}

impl Frontmatter {
    /// Validate field values that deserialize fine but make no sense.
    pub fn validate(&self, path: &Path, line: usize) -> Result<()> {
        if let Some((min, max)) = self.outline.as_ref().and_then(Outline::levels) {
            let valid = (1..=6).contains(&min) && (1..=6).contains(&max) && min <= max;
            if !valid {
                return Err(CoreError::frontmatter(
                    path,
                    line,
                    format!(
                        "outline levels must be within 1..=6 and ordered, got [{min}, {max}]"
                    ),
                ));
            }
        }

        if self.layout.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(CoreError::frontmatter(path, line, "layout cannot be empty"));
        }

        Ok(())
    }

    /// Heading range for the outline, honouring the document's setting.
    pub fn outline_levels(&self) -> Option<(u8, u8)> {
        match &self.outline {
            Some(outline) => outline.levels(),
            None => Some(DEFAULT_OUTLINE),
        }
    }
}

/// 1-based line of a byte offset within `text`.
fn line_of(text: &str, offset: usize) -> usize {
    text.get(..offset)
        .map_or(1, |prefix| prefix.matches('\n').count() + 1)
}

/// serde_yaml's message without its block-relative location suffix.
fn yaml_message(err: &serde_yaml::Error) -> String {
    let message = err.to_string();
    match message.find(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        })
}

mod date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            super::parse_date(&s).ok_or_else(|| {
                D::Error::custom(format!(
                    "invalid date `{s}`, expected RFC 3339 or YYYY-MM-DD"
                ))
            })
        })
        .transpose()
    }
}
