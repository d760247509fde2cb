//! Preview command - serve the built site

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use quire_generator::Builder;

use super::load_config;
use crate::server::{serve, static_router};

/// Run the preview command.
///
/// Serves the existing output directory as-is; nothing is rebuilt.
pub async fn run(config_path: &Path, port: u16, open_browser: bool) -> Result<()> {
    let (config, root) = load_config(config_path)?;
    let builder = Builder::new(config, &root);
    let output_dir = &builder.paths().output_dir;

    if !output_dir.join("index.html").exists() && !output_dir.join("404.html").exists() {
        bail!(
            "No built site in {}; run `quire build` first",
            output_dir.display()
        );
    }

    let base_path = builder.config().site.base_path.clone();
    tracing::info!(output = %output_dir.display(), port, "Starting preview server");

    let app = static_router(output_dir, &base_path);
    serve(app, port, open_browser, &base_path).await
}
