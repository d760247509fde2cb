//! Build command - generates the static site

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use quire_core::config::normalize_base_path;
use quire_generator::{BuildStats, Builder};

use super::{load_config, print_build_stats};

/// Run the build command.
///
/// `out` is taken relative to the working directory; the configured output
/// directory is relative to the configuration file.
pub fn run(config_path: &Path, out: Option<&Path>, base_path: Option<&str>) -> Result<()> {
    tracing::info!(?config_path, ?out, ?base_path, "Starting build");

    let stats = build(config_path, out, base_path)?;
    print_build_stats(&stats);

    println!("  ✓ Build completed in {}ms", stats.duration_ms);
    Ok(())
}

/// Load configuration, apply overrides and build.
pub fn build(config_path: &Path, out: Option<&Path>, base_path: Option<&str>) -> Result<BuildStats> {
    let (mut config, root) = load_config(config_path)?;

    if let Some(bp) = base_path {
        tracing::info!(base_path = bp, "Overriding site base_path from CLI");
        config.site.base_path = normalize_base_path(bp);
    }

    let mut builder = Builder::new(config, &root);
    if let Some(out) = out {
        builder = builder.with_output_dir(out);
    }

    builder.build().wrap_err("Build failed")
}
