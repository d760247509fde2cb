//! Asset processing and management.
//!
//! Static files are planned first (walked, hashed, mapped to output paths) and
//! copied only once the rest of the build has succeeded.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Mapping from original asset paths to their published paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    assets: BTreeMap<String, String>,
}

impl AssetManifest {
    /// Create a new empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset to the manifest.
    pub fn add(&mut self, original: impl Into<String>, published: impl Into<String>) {
        self.assets.insert(original.into(), published.into());
    }

    /// Get the published path for an asset.
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&str> {
        self.assets.get(original).map(String::as_str)
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Serialize manifest to JSON in key order.
    pub fn to_json(&self) -> String {
        let mut json = String::from("{\n");
        let count = self.assets.len();
        for (i, (orig, published)) in self.assets.iter().enumerate() {
            json.push_str(&format!(
                "  \"{}\": \"{}\"",
                json_escape(orig),
                json_escape(published)
            ));
            if i + 1 < count {
                json.push(',');
            }
            json.push('\n');
        }
        json.push_str("}\n");
        json
    }
}

fn json_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A file to copy into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAsset {
    /// Source file on disk.
    pub source: PathBuf,
    /// Destination relative to the output directory, `/`-separated.
    pub dest: String,
}

/// Assets scheduled for copying.
#[derive(Debug, Clone, Default)]
pub struct AssetPlan {
    files: Vec<PlannedAsset>,
    manifest: AssetManifest,
}

impl AssetPlan {
    /// Schedule a verbatim copy.
    pub fn push(&mut self, source: impl Into<PathBuf>, dest: impl Into<String>) {
        let dest = dest.into();
        self.manifest.add(format!("/{dest}"), format!("/{dest}"));
        self.files.push(PlannedAsset {
            source: source.into(),
            dest,
        });
    }

    /// Planned files in order.
    pub fn files(&self) -> &[PlannedAsset] {
        &self.files
    }

    /// Manifest of original to published paths.
    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Copy every planned file below `dest_dir`.
    pub fn write(&self, dest_dir: &Path) -> Result<usize> {
        for asset in &self.files {
            let dest_path = dest_dir.join(&asset.dest);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            fs::copy(&asset.source, &dest_path).map_err(io_error(&asset.source))?;
            debug!(
                src = %asset.source.display(),
                dest = %dest_path.display(),
                "copied asset"
            );
        }
        Ok(self.files.len())
    }
}

/// Asset processor for copying and optionally fingerprinting static files.
#[derive(Debug)]
pub struct AssetProcessor {
    fingerprint: bool,
    fingerprint_extensions: Vec<String>,
}

impl AssetProcessor {
    /// Create a new asset processor.
    #[must_use]
    pub fn new(fingerprint: bool) -> Self {
        Self {
            fingerprint,
            fingerprint_extensions: ["css", "js", "woff", "woff2", "png", "jpg", "jpeg", "gif", "svg", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Whether fingerprinting is enabled.
    pub fn fingerprints(&self) -> bool {
        self.fingerprint
    }

    /// Plan copies for every non-hidden file under `source_dir`.
    ///
    /// A missing directory yields an empty plan.
    pub fn plan(&self, source_dir: &Path) -> Result<AssetPlan> {
        let mut plan = AssetPlan::default();

        if !source_dir.is_dir() {
            debug!(dir = %source_dir.display(), "static directory does not exist, skipping");
            return Ok(plan);
        }

        let walker = WalkDir::new(source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            });

        for entry in walker {
            let entry = entry.map_err(|e| AssetError::Walk {
                path: source_dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                continue;
            };
            let original = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let published = if self.should_fingerprint(relative) {
                let bytes = fs::read(entry.path()).map_err(io_error(entry.path()))?;
                fingerprinted_name(&original, &bytes)
            } else {
                original.clone()
            };

            plan.manifest
                .add(format!("/{original}"), format!("/{published}"));
            plan.files.push(PlannedAsset {
                source: entry.path().to_path_buf(),
                dest: published,
            });
        }

        info!(
            dir = %source_dir.display(),
            count = plan.files.len(),
            "static assets planned"
        );
        Ok(plan)
    }

    fn should_fingerprint(&self, path: &Path) -> bool {
        self.fingerprint
            && path.extension().is_some_and(|ext| {
                self.fingerprint_extensions
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            })
    }
}

/// Short FNV-1a hash of some bytes, as 8 hex characters.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{hash:016x}")[..8].to_string()
}

/// Insert a content hash before the extension: `css/app.css` → `css/app.1a2b3c4d.css`.
pub fn fingerprinted_name(path: &str, bytes: &[u8]) -> String {
    let hash = content_hash(bytes);
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{hash}.{ext}"),
        _ => format!("{file}.{hash}"),
    };
    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

/// Built-in stylesheet written to `assets/theme.css`.
pub const THEME_CSS: &str = r#":root {
    --q-c-brand: #3451b2;
    --q-c-brand-soft: rgba(52, 81, 178, 0.12);
    --q-c-bg: #ffffff;
    --q-c-bg-soft: #f6f6f7;
    --q-c-text: #213547;
    --q-c-text-muted: #67676c;
    --q-c-divider: #e2e2e3;
    --q-c-tip: #3451b2;
    --q-c-info: #67676c;
    --q-c-warning: #a16207;
    --q-c-danger: #b42318;
    --q-sidebar-width: 272px;
    --q-outline-width: 224px;
    --q-font: "Inter", system-ui, -apple-system, "Segoe UI", sans-serif;
    --q-font-mono: ui-monospace, "SF Mono", Menlo, Consolas, monospace;
}

@media (prefers-color-scheme: dark) {
    :root {
        --q-c-brand: #a8b1ff;
        --q-c-brand-soft: rgba(168, 177, 255, 0.16);
        --q-c-bg: #1b1b1f;
        --q-c-bg-soft: #202127;
        --q-c-text: #dfdfd6;
        --q-c-text-muted: #98989f;
        --q-c-divider: #2e2e32;
    }
}

*, *::before, *::after { box-sizing: border-box; }

body {
    margin: 0;
    font-family: var(--q-font);
    line-height: 1.7;
    color: var(--q-c-text);
    background: var(--q-c-bg);
}

a { color: var(--q-c-brand); text-decoration: none; }
a:hover { text-decoration: underline; }

.navbar {
    position: sticky;
    top: 0;
    z-index: 10;
    display: flex;
    align-items: center;
    height: 64px;
    padding: 0 24px;
    background: var(--q-c-bg);
    border-bottom: 1px solid var(--q-c-divider);
}

.site-title { font-weight: 600; color: var(--q-c-text); }

.layout-doc {
    display: grid;
    grid-template-columns: var(--q-sidebar-width) minmax(0, 1fr) var(--q-outline-width);
    gap: 32px;
    max-width: 1440px;
    margin: 0 auto;
}

.sidebar {
    position: sticky;
    top: 64px;
    height: calc(100vh - 64px);
    overflow-y: auto;
    padding: 24px 16px;
    border-right: 1px solid var(--q-c-divider);
    background: var(--q-c-bg-soft);
}

.sidebar ul { list-style: none; margin: 0; padding: 0; }
.sidebar ul ul { padding-left: 16px; }
.sidebar-item > a { display: block; padding: 4px 0; color: var(--q-c-text-muted); }
.sidebar-item.is-active > a { color: var(--q-c-brand); font-weight: 600; }
.sidebar-item.has-active > a { color: var(--q-c-text); }

.doc { padding: 32px 0 96px; min-width: 0; }
.page { max-width: 960px; margin: 0 auto; padding: 32px 24px; }

.doc-content h1, .doc-content h2, .doc-content h3 { position: relative; line-height: 1.3; }
.doc-content h2 { margin-top: 48px; padding-top: 24px; border-top: 1px solid var(--q-c-divider); }

.header-anchor {
    margin-left: 8px;
    opacity: 0;
    color: var(--q-c-brand);
}
h1:hover .header-anchor, h2:hover .header-anchor, h3:hover .header-anchor,
h4:hover .header-anchor, h5:hover .header-anchor, h6:hover .header-anchor { opacity: 1; }

code {
    font-family: var(--q-font-mono);
    font-size: 0.875em;
    padding: 2px 6px;
    border-radius: 4px;
    background: var(--q-c-bg-soft);
}

pre {
    overflow-x: auto;
    padding: 16px 20px;
    border-radius: 8px;
    background: var(--q-c-bg-soft);
    line-height: 1.6;
}

pre code { padding: 0; background: none; font-size: 0.875rem; }
.code-block pre { margin: 16px 0; }

table { border-collapse: collapse; display: block; overflow-x: auto; margin: 20px 0; }
th, td { border: 1px solid var(--q-c-divider); padding: 8px 16px; }
th { background: var(--q-c-bg-soft); }

blockquote {
    margin: 16px 0;
    padding-left: 16px;
    border-left: 2px solid var(--q-c-divider);
    color: var(--q-c-text-muted);
}

.custom-block {
    margin: 16px 0;
    padding: 16px 16px 8px;
    border: 1px solid transparent;
    border-radius: 8px;
    background: var(--q-c-bg-soft);
}

.custom-block-title { margin: 0 0 8px; font-weight: 600; }
.custom-block.tip, .custom-block.note, .custom-block.important { border-color: var(--q-c-tip); }
.custom-block.info { border-color: var(--q-c-info); }
.custom-block.warning { border-color: var(--q-c-warning); }
.custom-block.danger { border-color: var(--q-c-danger); }
.custom-block.details summary { cursor: pointer; font-weight: 600; margin-bottom: 8px; }

.outline {
    position: sticky;
    top: 64px;
    align-self: start;
    padding: 32px 16px;
    font-size: 13px;
}

.outline-title { margin: 0 0 8px; font-weight: 600; }
.outline ul { list-style: none; margin: 0; padding: 0; }
.outline a { color: var(--q-c-text-muted); }
.outline-level-3 { padding-left: 12px; }
.outline-level-4 { padding-left: 24px; }
.outline-level-5 { padding-left: 36px; }
.outline-level-6 { padding-left: 48px; }

.last-updated { margin-top: 48px; font-size: 14px; color: var(--q-c-text-muted); }

.prev-next {
    display: grid;
    grid-template-columns: 1fr 1fr;
    gap: 16px;
    margin-top: 32px;
    padding-top: 24px;
    border-top: 1px solid var(--q-c-divider);
}

.pager-link {
    display: block;
    padding: 12px 16px;
    border: 1px solid var(--q-c-divider);
    border-radius: 8px;
}
.pager-link.next { grid-column: 2; text-align: right; }
.pager-link .desc { display: block; font-size: 12px; color: var(--q-c-text-muted); }

.not-found { padding: 96px 24px; text-align: center; }
.not-found .code { font-size: 64px; font-weight: 600; margin: 0; }

@media (max-width: 960px) {
    .layout-doc { grid-template-columns: minmax(0, 1fr); padding: 0 24px; }
    .sidebar, .outline { display: none; }
}
"#;
