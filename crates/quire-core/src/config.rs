//! Site configuration management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Quire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Sidebar navigation. Inferred from the content tree when empty.
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Site-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site title.
    pub title: String,

    /// Site description for meta tags.
    #[serde(default)]
    pub description: Option<String>,

    /// Language code for the `lang` attribute.
    #[serde(default = "default_language")]
    pub language: String,

    /// URL prefix the site is served under, e.g. `/docs/`.
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Public origin (e.g. `https://example.com`). Enables `sitemap.xml`.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Build configuration. Directories are relative to the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Markdown source directory.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Output directory for the generated site.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Static files copied verbatim into the output.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Template overrides (`<name>.html`).
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Syntax highlighting theme name.
    #[serde(default = "default_syntax_theme")]
    pub syntax_theme: String,

    /// Whether to add content hashes to static asset file names.
    #[serde(default)]
    pub fingerprint_assets: bool,
}

/// Declared sidebar navigation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Top-level entries in declaration order.
    #[serde(default)]
    pub entries: Vec<NavEntryConfig>,
}

/// One declared navigation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavEntryConfig {
    /// Content path of the target document (`guide/intro.md`, `guide/intro`, `guide/`).
    pub path: String,

    /// Label shown in the sidebar. Defaults to the target page title.
    #[serde(default)]
    pub label: Option<String>,

    /// Explicit sibling position. Entries without one follow in declaration order.
    #[serde(default)]
    pub order: Option<u32>,

    /// Nested entries.
    #[serde(default)]
    pub children: Vec<NavEntryConfig>,
}

/// Absolute locations of the site's directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub root: PathBuf,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
}

// Default value functions
fn default_language() -> String {
    "en".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_content_dir() -> String {
    "docs".to_string()
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_static_dir() -> String {
    "public".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

/// Default syntax theme; one of syntect's bundled themes.
pub fn default_syntax_theme() -> String {
    "InspiredGitHub".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            output_dir: default_output_dir(),
            static_dir: default_static_dir(),
            templates_dir: default_templates_dir(),
            syntax_theme: default_syntax_theme(),
            fingerprint_assets: false,
        }
    }
}

impl Config {
    /// Create a configuration with defaults for everything but the title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                title: title.into(),
                description: None,
                language: default_language(),
                base_path: default_base_path(),
                base_url: None,
            },
            build: BuildConfig::default(),
            navigation: NavigationConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.finish()
    }

    /// Load configuration with `QUIRE__SECTION__KEY` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        Self::load_layered(path, env_source())
    }

    /// Load `path`, then apply overrides from `env` on top of it.
    fn load_layered(path: &Path, env: config::Environment) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(env)
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.finish()
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| CoreError::config_with_source("Failed to parse config", e))?;
        config.finish()
    }

    /// Normalize and validate a freshly deserialized configuration.
    fn finish(mut self) -> Result<Self> {
        self.site.base_path = normalize_base_path(&self.site.base_path);
        if let Some(url) = self.site.base_url.as_mut() {
            if url.ends_with('/') {
                tracing::warn!("site.base_url should not have a trailing slash");
            }
            *url = url.trim_end_matches('/').to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.site.title.trim().is_empty() {
            return Err(CoreError::config("site.title cannot be empty"));
        }

        if self
            .site
            .base_url
            .as_deref()
            .is_some_and(|url| !url.starts_with("http://") && !url.starts_with("https://"))
        {
            return Err(CoreError::config(
                "site.base_url must start with http:// or https://",
            ));
        }

        for dir in [&self.build.content_dir, &self.build.output_dir] {
            if dir.trim().is_empty() {
                return Err(CoreError::config("build directories cannot be empty"));
            }
        }

        validate_entries(&self.navigation.entries)
    }

    /// Site-relative URL with the base path applied: `url_for("/guide/")` → `/docs/guide/`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.site.base_path, path.trim_start_matches('/'))
    }

    /// Absolute URL for a site path, when `base_url` is configured.
    pub fn absolute_url(&self, path: &str) -> Option<String> {
        self.site
            .base_url
            .as_deref()
            .map(|base| format!("{base}{}", self.url_for(path)))
    }

    /// Resolve configured directories against the site root.
    pub fn paths(&self, root: &Path) -> SitePaths {
        SitePaths {
            root: root.to_path_buf(),
            content_dir: root.join(&self.build.content_dir),
            output_dir: root.join(&self.build.output_dir),
            static_dir: root.join(&self.build.static_dir),
            templates_dir: root.join(&self.build.templates_dir),
        }
    }
}

/// Environment variables such as `QUIRE__BUILD__OUTPUT_DIR`.
fn env_source() -> config::Environment {
    config::Environment::with_prefix("QUIRE").separator("__")
}

/// Normalize a base path to `/`, or `/segment/.../` with both slashes present.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

fn validate_entries(entries: &[NavEntryConfig]) -> Result<()> {
    for entry in entries {
        if entry.path.trim().is_empty() {
            let label = entry.label.as_deref().unwrap_or("(unlabelled)");
            return Err(CoreError::config(format!(
                "navigation entry `{label}` has an empty path"
            )));
        }
        validate_entries(&entry.children)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn create_test_config() -> String {
        r#"
[site]
title = "Tutorials"
description = "Vue, React and Python notes"
language = "zh-CN"
base_path = "docs"
base_url = "https://example.com/"

[build]
content_dir = "src"
output_dir = "site"
syntax_theme = "base16-ocean.dark"
fingerprint_assets = true

[[navigation.entries]]
path = "vue/index.md"
label = "Vue"

[[navigation.entries.children]]
path = "vue/reactivity"
order = 1

[[navigation.entries]]
path = "react/"
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("quire.toml");
        let mut file = std::fs::File::create(&config_path).expect("create file");
        file.write_all(create_test_config().as_bytes())
            .expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert_eq!(config.site.title, "Tutorials");
        assert_eq!(config.site.language, "zh-CN");
        assert_eq!(config.site.base_path, "/docs/");
        assert_eq!(config.site.base_url.as_deref(), Some("https://example.com"));
        assert_eq!(config.build.content_dir, "src");
        assert_eq!(config.build.output_dir, "site");
        assert_eq!(config.build.syntax_theme, "base16-ocean.dark");
        assert!(config.build.fingerprint_assets);

        let entries = &config.navigation.entries;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label.as_deref(), Some("Vue"));
        assert_eq!(entries[0].children[0].path, "vue/reactivity");
        assert_eq!(entries[0].children[0].order, Some(1));
        assert!(entries[1].label.is_none());
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml_str("[site]\ntitle = \"Minimal\"\n").expect("parse");

        assert_eq!(config.site.language, "en");
        assert_eq!(config.site.base_path, "/");
        assert!(config.site.base_url.is_none());
        assert_eq!(config.build, BuildConfig::default());
        assert_eq!(config.build.content_dir, "docs");
        assert_eq!(config.build.output_dir, "dist");
        assert!(config.navigation.entries.is_empty());
        assert_eq!(config, Config::new("Minimal"));
    }

    #[test]
    fn test_load_with_env_reads_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("quire.toml");
        std::fs::write(&config_path, create_test_config()).expect("write");

        let config = Config::load_with_env(&config_path).expect("load config");
        assert_eq!(config.site.title, "Tutorials");
        assert_eq!(config.navigation.entries.len(), 2);
    }

    #[test]
    fn test_env_overrides_file_values() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("quire.toml");
        std::fs::write(&config_path, create_test_config()).expect("write");

        let vars = config::Map::from([
            ("QUIRE__BUILD__OUTPUT_DIR".to_string(), "public".to_string()),
            ("QUIRE__SITE__LANGUAGE".to_string(), "fr".to_string()),
            ("OTHER__BUILD__OUTPUT_DIR".to_string(), "ignored".to_string()),
        ]);
        let config = Config::load_layered(&config_path, env_source().source(Some(vars)))
            .expect("load config");

        assert_eq!(config.build.output_dir, "public");
        assert_eq!(config.site.language, "fr");
        assert_eq!(config.site.title, "Tutorials");
        assert_eq!(config.navigation.entries.len(), 2);
    }

    #[test]
    fn test_url_helpers() {
        let mut config = Config::new("Test");
        assert_eq!(config.url_for("/guide/intro/"), "/guide/intro/");
        assert_eq!(config.url_for("/"), "/");
        assert!(config.absolute_url("/").is_none());

        config.site.base_path = normalize_base_path("/docs");
        config.site.base_url = Some("https://example.com".to_string());
        assert_eq!(config.url_for("/guide/"), "/docs/guide/");
        assert_eq!(
            config.absolute_url("guide/").as_deref(),
            Some("https://example.com/docs/guide/")
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("docs"), "/docs/");
        assert_eq!(normalize_base_path("/a/b/"), "/a/b/");
    }

    #[test]
    fn test_paths_resolve_against_root() {
        let config = Config::new("Test");
        let paths = config.paths(Path::new("/site"));
        assert_eq!(paths.content_dir, PathBuf::from("/site/docs"));
        assert_eq!(paths.output_dir, PathBuf::from("/site/dist"));
        assert_eq!(paths.static_dir, PathBuf::from("/site/public"));
        assert_eq!(paths.templates_dir, PathBuf::from("/site/templates"));
    }

    #[test]
    fn test_config_validation_empty_title() {
        let result = Config::from_toml_str("[site]\ntitle = \"\"\n");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("title cannot be empty")
        );
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let result = Config::from_toml_str("[site]\ntitle = \"x\"\nbase_url = \"example.com\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_empty_nav_path() {
        let content = "[site]\ntitle = \"x\"\n[[navigation.entries]]\npath = \"\"\nlabel = \"Broken\"\n";
        let err = Config::from_toml_str(content).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/quire.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
