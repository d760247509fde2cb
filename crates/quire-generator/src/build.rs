//! Build orchestration.
//!
//! A build is planned entirely in memory (templates, content, navigation,
//! rendering) and the output directory is only replaced once planning has
//! succeeded.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use quire_core::{Config, Page, config::SitePaths};
use quire_parser::MarkdownParser;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetError, AssetPlan, AssetProcessor, THEME_CSS, fingerprinted_name},
    html::{HtmlError, HtmlGenerator},
    navigation::{Navigation, NavigationError},
    sitemap::{SitemapError, SitemapGenerator},
    store::{ContentStore, StoreError},
    template::{TemplateError, TemplateRegistry},
};

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error while writing output.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Navigation could not be derived.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// Templates could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// HTML generation error.
    #[error(transparent)]
    Html(#[from] HtmlError),

    /// Sitemap generation error.
    #[error("sitemap error: {0}")]
    Sitemap(#[from] SitemapError),

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Cleaning the output directory would delete sources.
    #[error("output directory {output} must not contain {protected}")]
    UnsafeOutputDir { output: PathBuf, protected: PathBuf },
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Markdown documents loaded.
    pub documents: usize,

    /// HTML pages generated, excluding `404.html`.
    pub pages: usize,

    /// Navigation entries, at every depth.
    pub nav_entries: usize,

    /// Documents not referenced by navigation.
    pub orphans: usize,

    /// Static and content assets copied.
    pub assets: usize,

    /// Non-fatal diagnostics.
    pub warnings: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// A non-fatal problem found while planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Content key of the document concerned.
    pub key: String,
    /// What is wrong.
    pub message: String,
}

/// A fully rendered site, ready to be written.
#[derive(Debug)]
pub struct SitePlan {
    /// Rendered pages in key order.
    pub pages: Vec<Page>,
    /// Generated files by output-relative path.
    pub files: BTreeMap<PathBuf, String>,
    /// Static directory assets.
    pub static_assets: AssetPlan,
    /// Non-markdown files from the content directory.
    pub content_assets: AssetPlan,
    /// Non-fatal diagnostics, sorted by key.
    pub diagnostics: Vec<Diagnostic>,
    /// Statistics gathered while planning.
    pub stats: BuildStats,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    paths: SitePaths,
}

impl Builder {
    /// Create a builder for a site rooted at `root`.
    #[must_use]
    pub fn new(config: Config, root: &Path) -> Self {
        let paths = config.paths(root);
        Self { config, paths }
    }

    /// Write output somewhere other than the configured directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths.output_dir = dir.into();
        self
    }

    /// Resolved site directories.
    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        info!(
            content = %self.paths.content_dir.display(),
            output = %self.paths.output_dir.display(),
            "starting build"
        );

        self.check_output_dir()?;
        let plan = self.plan()?;
        let mut stats = plan.stats.clone();

        self.clean_output()?;
        stats.assets = plan.static_assets.write(&self.paths.output_dir)?
            + plan.content_assets.write(&self.paths.output_dir)?;

        if !plan.static_assets.manifest().is_empty() {
            let json = plan.static_assets.manifest().to_json();
            self.write_file(Path::new("asset-manifest.json"), &json)?;
        }
        for (path, content) in &plan.files {
            self.write_file(path, content)?;
        }

        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            documents = stats.documents,
            pages = stats.pages,
            nav_entries = stats.nav_entries,
            orphans = stats.orphans,
            assets = stats.assets,
            warnings = stats.warnings,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Load, derive and render everything without touching the output directory.
    pub fn plan(&self) -> Result<SitePlan> {
        let mut templates = TemplateRegistry::new();
        let custom = templates.load_dir(&self.paths.templates_dir)?;
        debug!(custom, "templates loaded");

        let store =
            ContentStore::load_excluding(&self.paths.content_dir, &self.nested_output_dir())?;
        let navigation = Navigation::derive(&self.config.navigation.entries, &store)?;

        let pages = self.render_pages(&store);
        let diagnostics = collect_diagnostics(&pages, &store);
        for diagnostic in &diagnostics {
            warn!(key = %diagnostic.key, "{}", diagnostic.message);
        }

        let processor = AssetProcessor::new(self.config.build.fingerprint_assets);
        let static_assets = processor.plan(&self.paths.static_dir)?;
        let mut content_assets = AssetPlan::default();
        for key in store.assets() {
            content_assets.push(self.paths.content_dir.join(key), key.clone());
        }

        let stylesheet = if processor.fingerprints() {
            fingerprinted_name("assets/theme.css", THEME_CSS.as_bytes())
        } else {
            "assets/theme.css".to_string()
        };
        let generator = HtmlGenerator::new(&self.config, &templates, &navigation)
            .with_stylesheet(self.config.url_for(&stylesheet));

        let mut files = BTreeMap::new();
        for (path, html) in generate_html(&generator, &pages)? {
            files.insert(path, html);
        }
        files.insert(PathBuf::from("404.html"), generator.generate_not_found()?);
        files.insert(PathBuf::from(&stylesheet), THEME_CSS.to_string());

        let sitemap = SitemapGenerator::new(&self.config);
        if sitemap.enabled() {
            let refs: Vec<&Page> = pages.iter().collect();
            files.insert(PathBuf::from("sitemap.xml"), sitemap.generate(&refs)?);
        }

        let stats = BuildStats {
            documents: store.len(),
            pages: pages.len(),
            nav_entries: navigation.flatten().len(),
            orphans: navigation.orphans(&store).len(),
            assets: static_assets.files().len() + content_assets.files().len(),
            warnings: diagnostics.len(),
            duration_ms: 0,
        };

        Ok(SitePlan {
            pages,
            files,
            static_assets,
            content_assets,
            diagnostics,
            stats,
        })
    }

    /// Render every document in parallel; the result is in key order.
    fn render_pages(&self, store: &ContentStore) -> Vec<Page> {
        let parser = MarkdownParser::with_theme(&self.config.build.syntax_theme)
            .with_base_path(&self.config.site.base_path);

        let documents: Vec<_> = store.documents().collect();
        info!(count = documents.len(), "rendering pages");

        documents
            .par_iter()
            .map(|document| Page::from_parsed(document, parser.render(document)))
            .collect()
    }

    /// Refuse output directories that would swallow the sources when cleaned.
    fn check_output_dir(&self) -> Result<()> {
        let output = resolved(&self.paths.output_dir);
        for protected in [&self.paths.content_dir, &self.paths.root] {
            let protected = resolved(protected);
            if protected.starts_with(&output) {
                return Err(BuildError::UnsafeOutputDir { output, protected });
            }
        }
        Ok(())
    }

    /// The output directory as the content walk would see it, when it lies
    /// inside the content directory.
    fn nested_output_dir(&self) -> Vec<PathBuf> {
        let output = resolved(&self.paths.output_dir);
        let content = resolved(&self.paths.content_dir);
        match output.strip_prefix(&content) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                vec![self.paths.content_dir.join(relative)]
            }
            _ => Vec::new(),
        }
    }

    /// Clean the output directory.
    fn clean_output(&self) -> Result<()> {
        let dir = &self.paths.output_dir;
        if dir.exists() {
            debug!(dir = %dir.display(), "cleaning output directory");
            fs::remove_dir_all(dir).map_err(|source| BuildError::Io {
                path: dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(dir).map_err(|source| BuildError::Io {
            path: dir.clone(),
            source,
        })
    }

    fn write_file(&self, relative: &Path, content: &str) -> Result<()> {
        let path = self.paths.output_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| BuildError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote file");
        Ok(())
    }
}

/// Generate HTML for all pages, reporting the first failure in key order.
fn generate_html(generator: &HtmlGenerator<'_>, pages: &[Page]) -> Result<Vec<(PathBuf, String)>> {
    let results: Vec<_> = pages
        .par_iter()
        .map(|page| {
            generator
                .generate_page(page)
                .map(|html| (page.output_path.clone(), html))
        })
        .collect();

    Ok(results.into_iter().collect::<std::result::Result<Vec<_>, _>>()?)
}

fn collect_diagnostics(pages: &[Page], store: &ContentStore) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for page in pages {
        let mut push = |message: String| {
            diagnostics.push(Diagnostic {
                key: page.key.clone(),
                message,
            });
        };

        for lang in &page.unknown_languages {
            push(format!(
                "no syntax highlighting for `{lang}`, rendered as plain text"
            ));
        }
        for link in &page.links {
            if store.get(link).is_none() {
                push(format!("links to missing document `{link}`"));
            }
        }
        for warning in &page.warnings {
            push(warning.clone());
        }
    }
    diagnostics
}

/// Best-effort absolute form of a path for overlap checks.
fn resolved(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
