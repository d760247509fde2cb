//! Command implementations.

pub mod build;
pub mod check;
pub mod dev;
pub mod new;
pub mod preview;

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use quire_core::Config;
use quire_generator::{BuildStats, Diagnostic};

/// Load the configuration and the site root it applies to.
///
/// Relative directories in the configuration resolve against the directory
/// holding the configuration file.
pub fn load_config(config_path: &Path) -> Result<(Config, PathBuf)> {
    let config = Config::load_with_env(config_path).wrap_err_with(|| {
        format!("Failed to load configuration from {}", config_path.display())
    })?;
    let root = site_root(config_path);
    tracing::debug!(root = %root.display(), "loaded configuration");
    Ok((config, root))
}

/// Directory containing the configuration file.
pub fn site_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print build statistics in a user-friendly format.
pub(crate) fn print_build_stats(stats: &BuildStats) {
    println!();
    println!("  Build Statistics:");
    println!("  ─────────────────────────────────");
    println!("  Documents:    {:>6}", stats.documents);
    println!("  Pages:        {:>6}", stats.pages);
    println!("  Nav entries:  {:>6}", stats.nav_entries);
    println!("  Orphans:      {:>6}", stats.orphans);
    println!("  Assets:       {:>6}", stats.assets);
    println!("  Warnings:     {:>6}", stats.warnings);
    println!("  ─────────────────────────────────");
    println!("  Duration:     {:>6}ms", stats.duration_ms);
    println!();
}

pub(crate) fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("  Warnings:");
    for diagnostic in diagnostics {
        println!("  ⚠ {}: {}", diagnostic.key, diagnostic.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_root() {
        assert_eq!(site_root(Path::new("quire.toml")), PathBuf::from("."));
        assert_eq!(site_root(Path::new("site/quire.toml")), PathBuf::from("site"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_config(&dir.path().join("quire.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
