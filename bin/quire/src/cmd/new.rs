//! New command - scaffold a document

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr, bail};
use quire_core::{Config, content::normalize_key};

use super::load_config;

/// Run the new command.
///
/// Creates `<content_dir>/<path>.md` with starter frontmatter. Existing files
/// are never overwritten.
pub fn run(config_path: &Path, path: &Path, title: Option<&str>) -> Result<()> {
    tracing::info!(?path, ?title, "Creating new document");

    let (config, root) = load_config(config_path)?;
    let file_path = create(&config, &root, path, title)?;

    println!("Created: {}", file_path.display());
    Ok(())
}

/// Write the new document and return its location.
pub fn create(config: &Config, root: &Path, path: &Path, title: Option<&str>) -> Result<PathBuf> {
    let Some(key) = normalize_key(path) else {
        bail!(
            "{} must be a relative path inside the content directory",
            path.display()
        );
    };
    let mut file_path = config.paths(root).content_dir.join(key);
    if file_path.extension().is_none_or(|ext| ext != "md") {
        file_path.as_mut_os_string().push(".md");
    }

    if file_path.exists() {
        bail!("{} already exists", file_path.display());
    }

    let title = title.map_or_else(|| title_from_path(path), str::to_string);

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).wrap_err("Failed to create directories")?;
    }
    fs::write(&file_path, scaffold(&title)).wrap_err("Failed to write file")?;

    tracing::info!(?file_path, "Created new document");
    Ok(file_path)
}

/// `getting-started` → `Getting started`.
fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .replace(['-', '_'], " ");

    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Untitled".to_string(),
    }
}

fn scaffold(title: &str) -> String {
    let quoted = title.replace('\\', "\\\\").replace('"', "\\\"");
    let date = Utc::now().format("%Y-%m-%d");

    format!(
        r#"---
title: "{quoted}"
description: ""
updated: {date}
---

# {title}

Write your content here.
"#
    )
}
