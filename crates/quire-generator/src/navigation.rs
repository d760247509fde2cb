//! Navigation tree derivation.
//!
//! The sidebar tree comes either from `[[navigation.entries]]` in the site
//! configuration or, when none are declared, from the layout of the content
//! directory.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use quire_core::{Document, config::NavEntryConfig};
use thiserror::Error;
use tracing::{debug, info};

use crate::store::ContentStore;

/// Navigation errors.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A configured entry does not match any document.
    #[error("navigation entry `{reference}` ({location}) does not match any document")]
    BrokenReference { reference: String, location: String },
}

/// Result type for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// One sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    /// Display label.
    pub label: String,

    /// Content key of the target document.
    pub target: String,

    /// Target URL relative to the base path.
    pub url: String,

    /// Position among siblings, starting at 0.
    pub order: usize,

    /// Nested entries.
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    /// Whether this entry or one of its descendants targets `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.target == key || self.children.iter().any(|child| child.contains(key))
    }
}

/// Where the navigation tree came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSource {
    /// Declared in the site configuration.
    Explicit,
    /// Inferred from the content directory layout.
    Inferred,
}

/// The derived sidebar tree.
#[derive(Debug, Clone)]
pub struct Navigation {
    entries: Vec<NavEntry>,
    source: NavigationSource,
}

impl Navigation {
    /// Derive navigation for a store.
    ///
    /// Declared entries win; an empty declaration falls back to the directory
    /// layout.
    pub fn derive(declared: &[NavEntryConfig], store: &ContentStore) -> Result<Self> {
        let navigation = if declared.is_empty() {
            Self {
                entries: inferred_level(store, ""),
                source: NavigationSource::Inferred,
            }
        } else {
            Self {
                entries: explicit_level(declared, store, "top level")?,
                source: NavigationSource::Explicit,
            }
        };

        let orphans = navigation.orphans(store);
        for key in &orphans {
            debug!(key, "document not referenced by navigation");
        }
        info!(
            source = ?navigation.source,
            entries = navigation.flatten().len(),
            orphans = orphans.len(),
            "navigation derived"
        );

        Ok(navigation)
    }

    /// Top-level entries.
    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    /// Where the tree came from.
    pub fn source(&self) -> NavigationSource {
        self.source
    }

    /// All entries in depth-first order.
    pub fn flatten(&self) -> Vec<&NavEntry> {
        fn walk<'a>(entries: &'a [NavEntry], out: &mut Vec<&'a NavEntry>) {
            for entry in entries {
                out.push(entry);
                walk(&entry.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.entries, &mut out);
        out
    }

    /// Whether any entry targets `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| entry.contains(key))
    }

    /// Previous and next entries around `key` in depth-first order.
    ///
    /// Entries targeting the same document as `key`, or an already visited
    /// document, are skipped.
    pub fn neighbors(&self, key: &str) -> (Option<&NavEntry>, Option<&NavEntry>) {
        let mut seen = HashSet::new();
        let order: Vec<&NavEntry> = self
            .flatten()
            .into_iter()
            .filter(|entry| seen.insert(entry.target.as_str()))
            .collect();

        match order.iter().position(|entry| entry.target == key) {
            Some(idx) => (
                idx.checked_sub(1).and_then(|i| order.get(i)).copied(),
                order.get(idx + 1).copied(),
            ),
            None => (None, None),
        }
    }

    /// Keys of documents no entry points to, excluding the home page.
    pub fn orphans<'a>(&self, store: &'a ContentStore) -> Vec<&'a str> {
        let referenced: HashSet<&str> = self
            .flatten()
            .into_iter()
            .map(|entry| entry.target.as_str())
            .collect();

        store
            .documents()
            .filter(|doc| !doc.path.is_root())
            .map(|doc| doc.path.key.as_str())
            .filter(|key| !referenced.contains(key))
            .collect()
    }
}

/// Build one level of declared entries.
///
/// Entries with an explicit `order` come first, ascending; the rest keep
/// their declaration order.
fn explicit_level(
    declared: &[NavEntryConfig],
    store: &ContentStore,
    location: &str,
) -> Result<Vec<NavEntry>> {
    let mut indexed: Vec<(usize, &NavEntryConfig)> = declared.iter().enumerate().collect();
    indexed.sort_by_key(|(idx, entry)| (entry.order.is_none(), entry.order, *idx));

    indexed
        .into_iter()
        .enumerate()
        .map(|(position, (_, entry))| {
            let document = store
                .resolve(&entry.path)
                .and_then(|key| store.get(key))
                .ok_or_else(|| NavigationError::BrokenReference {
                    reference: entry.path.clone(),
                    location: location.to_string(),
                })?;

            let children = explicit_level(
                &entry.children,
                store,
                &format!("under `{}`", entry.path),
            )?;

            Ok(NavEntry {
                label: entry.label.clone().unwrap_or_else(|| document.title()),
                target: document.path.key.clone(),
                url: document.path.url_path(),
                order: position,
                children,
            })
        })
        .collect()
}

/// Build the entries for one content directory (`""` is the root).
///
/// A subdirectory with an index document becomes a single entry holding the
/// directory's contents; one without has its contents hoisted into this
/// level. Siblings are ordered by weight, then title, then key.
fn inferred_level(store: &ContentStore, dir: &str) -> Vec<NavEntry> {
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };

    let mut items: Vec<(i32, NavEntry)> = Vec::new();
    let mut subdirs = BTreeSet::new();
    let mut index_of: BTreeMap<String, &Document> = BTreeMap::new();

    for document in store.documents() {
        let Some(rest) = document.path.key.strip_prefix(&prefix) else {
            continue;
        };

        match rest.split_once('/') {
            Some((subdir, remainder)) => {
                let subdir = format!("{prefix}{subdir}");
                if !remainder.contains('/') && document.path.is_index() {
                    index_of.insert(subdir.clone(), document);
                }
                subdirs.insert(subdir);
            }
            None if document.path.is_index() => {}
            None => items.push((document.frontmatter.weight, leaf(document))),
        }
    }

    for subdir in subdirs {
        match index_of.get(&subdir) {
            Some(index) => {
                let mut entry = leaf(index);
                entry.children = inferred_level(store, &subdir);
                items.push((index.frontmatter.weight, entry));
            }
            None => items.extend(
                inferred_level(store, &subdir)
                    .into_iter()
                    .map(|entry| (weight_of(store, &entry), entry)),
            ),
        }
    }

    items.sort_by(|(wa, a), (wb, b)| {
        wa.cmp(wb)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.target.cmp(&b.target))
    });

    items
        .into_iter()
        .enumerate()
        .map(|(order, (_, entry))| NavEntry { order, ..entry })
        .collect()
}

fn leaf(document: &Document) -> NavEntry {
    NavEntry {
        label: document.title(),
        target: document.path.key.clone(),
        url: document.path.url_path(),
        order: 0,
        children: Vec::new(),
    }
}

fn weight_of(store: &ContentStore, entry: &NavEntry) -> i32 {
    store
        .get(&entry.target)
        .map_or(0, |doc| doc.frontmatter.weight)
}
