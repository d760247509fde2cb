//! Content store.
//!
//! Walks the content directory, parses every markdown file and holds the
//! resulting documents keyed by their content-relative path.

use std::{
    collections::{BTreeMap, btree_map::Entry},
    fs,
    path::{Path, PathBuf},
};

use quire_core::{
    CoreError, Document, DocumentPath,
    content::{is_markdown_extension, normalize_key},
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Content store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Content directory does not exist.
    #[error("content directory not found: {0}")]
    MissingDir(PathBuf),

    /// Directory traversal failed.
    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid UTF-8.
    #[error("{path} is not valid UTF-8 (byte {offset})")]
    Encoding { path: PathBuf, offset: usize },

    /// Frontmatter could not be parsed.
    #[error(transparent)]
    Document(#[from] CoreError),

    /// Two documents would be written to the same page.
    #[error("{first} and {second} both map to the URL {url}")]
    DuplicateUrl {
        url: String,
        first: String,
        second: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// All documents of a site, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    root: PathBuf,
    documents: BTreeMap<String, Document>,
    assets: Vec<String>,
}

impl ContentStore {
    /// Load every markdown document under `content_dir`.
    ///
    /// Hidden files and directories are skipped. When several files fail, the
    /// error of the first one in path order is returned.
    pub fn load(content_dir: &Path) -> Result<Self> {
        Self::load_excluding(content_dir, &[])
    }

    /// Like [`ContentStore::load`], but also skips the given directories,
    /// which are joined onto `content_dir` the same way walked paths are.
    pub fn load_excluding(content_dir: &Path, excluded: &[PathBuf]) -> Result<Self> {
        if !content_dir.is_dir() {
            return Err(StoreError::MissingDir(content_dir.to_path_buf()));
        }

        info!(dir = %content_dir.display(), "loading content");

        let mut sources = Vec::new();
        let mut assets = Vec::new();

        let walker = WalkDir::new(content_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !(is_hidden(e) || excluded.iter().any(|dir| e.path() == dir))
            });

        for entry in walker {
            let entry = entry.map_err(|e| StoreError::Walk {
                path: e
                    .path()
                    .map_or_else(|| content_dir.to_path_buf(), Path::to_path_buf),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(content_dir) else {
                continue;
            };
            let is_markdown = relative
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(is_markdown_extension);

            match (is_markdown, DocumentPath::from_path(relative)) {
                (true, Some(doc_path)) => sources.push((doc_path, entry.path().to_path_buf())),
                _ => {
                    if let Some(key) = normalize_key(relative) {
                        assets.push(key);
                    }
                }
            }
        }

        check_unique_urls(sources.iter().map(|(doc_path, _)| doc_path))?;

        let results: Vec<Result<Document>> = sources
            .par_iter()
            .map(|(doc_path, path)| load_document(doc_path.clone(), path))
            .collect();
        let documents = results.into_iter().collect::<Result<Vec<_>>>()?;

        info!(
            documents = documents.len(),
            assets = assets.len(),
            "content loaded"
        );

        Ok(Self::from_documents(content_dir, documents).with_assets(assets))
    }

    /// Build a store from already parsed documents.
    pub fn from_documents(root: impl Into<PathBuf>, documents: Vec<Document>) -> Self {
        Self {
            root: root.into(),
            documents: documents
                .into_iter()
                .map(|doc| (doc.path.key.clone(), doc))
                .collect(),
            assets: Vec::new(),
        }
    }

    fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    /// Content directory the documents were loaded from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a document by content key.
    pub fn get(&self, key: &str) -> Option<&Document> {
        self.documents.get(key)
    }

    /// All documents in key order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Non-markdown files in the content tree, by content key.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Resolve a navigation or link reference to a document key.
    ///
    /// Accepts `a.md`, `a`, `/a`, `./a.md`, `guide/` and `guide/#section`.
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        let reference = reference.trim();
        let reference = reference.split_once('#').map_or(reference, |(path, _)| path);
        let path = reference.trim_start_matches('/');

        let candidates: Vec<String> = if path.is_empty() || path == "." || path == "./" {
            vec!["index.md".to_string(), "index.markdown".to_string()]
        } else if let Some(dir) = path.strip_suffix('/') {
            vec![
                format!("{dir}/index.md"),
                format!("{dir}/index.markdown"),
                format!("{dir}.md"),
            ]
        } else if Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_markdown_extension)
        {
            vec![path.to_string()]
        } else {
            vec![
                format!("{path}.md"),
                format!("{path}.markdown"),
                format!("{path}/index.md"),
                format!("{path}/index.markdown"),
            ]
        };

        candidates
            .iter()
            .filter_map(|candidate| normalize_key(Path::new(candidate)))
            .find_map(|key| self.documents.get_key_value(&key).map(|(k, _)| k.as_str()))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Fail when two documents share a URL, e.g. `guide.md` and `guide/index.md`.
fn check_unique_urls<'a>(paths: impl Iterator<Item = &'a DocumentPath>) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

    for path in paths {
        match seen.entry(path.slug.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(path.key.as_str());
            }
            Entry::Occupied(slot) => {
                let (first, second) = if *slot.get() < path.key.as_str() {
                    (*slot.get(), path.key.as_str())
                } else {
                    (path.key.as_str(), *slot.get())
                };
                return Err(StoreError::DuplicateUrl {
                    url: path.url_path(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn load_document(doc_path: DocumentPath, path: &Path) -> Result<Document> {
    debug!(path = %path.display(), "loading document");

    let bytes = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|e| StoreError::Encoding {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })?;

    Ok(Document::parse(doc_path, &content, path)?)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "# Home\n");
        write(dir.path(), "a.md", "---\ntitle: A\n---\nalpha");
        write(dir.path(), "guide/index.md", "---\ntitle: Guide\n---\n");
        write(dir.path(), "guide/intro.md", "+++\ntitle = \"Intro\"\n+++\nhello");
        write(dir.path(), "guide/diagram.png", "png");
        write(dir.path(), ".vitepress/config.md", "ignored");
        write(dir.path(), "guide/.draft.md", "ignored");
        dir
    }

    #[test]
    fn test_load_skips_hidden_and_collects_assets() {
        let dir = fixture();
        let store = ContentStore::load(dir.path()).unwrap();

        let keys: Vec<_> = store.documents().map(|d| d.path.key.as_str()).collect();
        assert_eq!(keys, vec!["a.md", "guide/index.md", "guide/intro.md", "index.md"]);
        assert_eq!(store.assets(), ["guide/diagram.png"]);
        assert_eq!(store.get("guide/intro.md").unwrap().frontmatter.title, "Intro");
        assert_eq!(store.get("a.md").unwrap().body, "alpha");
    }

    #[test]
    fn test_resolve_reference_forms() {
        let dir = fixture();
        let store = ContentStore::load(dir.path()).unwrap();

        assert_eq!(store.resolve("a.md"), Some("a.md"));
        assert_eq!(store.resolve("a"), Some("a.md"));
        assert_eq!(store.resolve("/a"), Some("a.md"));
        assert_eq!(store.resolve("./a.md"), Some("a.md"));
        assert_eq!(store.resolve("guide/"), Some("guide/index.md"));
        assert_eq!(store.resolve("guide"), Some("guide/index.md"));
        assert_eq!(store.resolve("/guide/intro#setup"), Some("guide/intro.md"));
        assert_eq!(store.resolve("/"), Some("index.md"));
        assert_eq!(store.resolve("missing.md"), None);
        assert_eq!(store.resolve("../a.md"), None);
    }

    #[test]
    fn test_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = ContentStore::load(&dir.path().join("nope"));
        assert!(matches!(result, Err(StoreError::MissingDir(_))));
    }

    #[test]
    fn test_first_error_in_path_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "ok");
        write(dir.path(), "b.md", "---\ntitle: broken\n");
        write(dir.path(), "c.md", "---\ntitle: [unterminated\n---\n");

        for _ in 0..5 {
            let err = ContentStore::load(dir.path()).unwrap_err();
            let message = err.to_string();
            assert!(message.contains("b.md"), "{message}");
            assert!(message.contains(":1:"), "{message}");
        }
    }

    #[test]
    fn test_duplicate_urls_fail() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "guide.md", "# Guide page\n");
        write(dir.path(), "guide/index.md", "# Guide index\n");

        let err = ContentStore::load(dir.path()).unwrap_err();
        match err {
            StoreError::DuplicateUrl { url, first, second } => {
                assert_eq!(url, "/guide/");
                assert_eq!(first, "guide.md");
                assert_eq!(second, "guide/index.md");
            }
            other => panic!("unexpected error: {other}"),
        }

        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.md", "one");
        write(dir.path(), "a.markdown", "two");
        let err = ContentStore::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("a.markdown and a.md"), "{err}");
    }

    #[test]
    fn test_load_excluding_skips_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "# Home\n");
        write(dir.path(), "site/index.html", "<html></html>");
        write(dir.path(), "site/notes.md", "# Old output\n");

        let store = ContentStore::load_excluding(dir.path(), &[dir.path().join("site")]).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.assets().is_empty());
    }

    #[test]
    fn test_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.md"), [0x66, 0x6f, 0xff, 0x6f]).unwrap();

        let err = ContentStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Encoding { offset: 2, .. }));
    }
}
