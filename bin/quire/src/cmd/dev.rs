//! Dev command - development server with live reload

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use color_eyre::eyre::{Result, WrapErr};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use quire_generator::{BuildStats, Builder};
use tokio::sync::mpsc;

use super::{load_config, print_build_stats};
use crate::server::{ServerState, create_router, inject_livereload, serve};

/// Quiet period after a file event before rebuilding.
const DEBOUNCE_MS: u64 = 200;

/// Run the dev command.
///
/// Builds once, then serves the output with live reload and rebuilds whenever
/// content, templates, static files or the configuration change. A failed
/// rebuild is reported and the previous output keeps being served.
pub async fn run(config_path: &Path, port: u16, open_browser: bool) -> Result<()> {
    tracing::info!(?config_path, port, "Starting dev server");

    let (config, root) = load_config(config_path)?;
    let base_path = config.site.base_path.clone();
    let builder = Builder::new(config, &root);
    let paths = builder.paths().clone();

    tracing::info!("Running initial build...");
    let stats = build_and_inject(&builder)?;
    print_build_stats(&stats);

    let state = Arc::new(ServerState::new());
    let (tx, rx) = mpsc::channel::<()>(16);

    let ignored = vec![
        paths.output_dir.clone(),
        paths
            .output_dir
            .canonicalize()
            .unwrap_or_else(|_| paths.output_dir.clone()),
    ];
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res
                && is_relevant(&event, &ignored)
            {
                // A full channel already has a rebuild queued.
                let _ = tx.try_send(());
            }
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    for dir in [&paths.content_dir, &paths.templates_dir, &paths.static_dir] {
        if dir.is_dir() {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .wrap_err_with(|| format!("Failed to watch {}", dir.display()))?;
            tracing::debug!(dir = %dir.display(), "watching");
        }
    }
    watcher
        .watch(config_path, RecursiveMode::NonRecursive)
        .wrap_err("Failed to watch configuration file")?;

    tokio::spawn(rebuild_loop(rx, config_path.to_path_buf(), state.clone()));

    let app = create_router(&paths.output_dir, &base_path, state);

    // Keep watcher alive
    let _watcher = watcher;

    serve(app, port, open_browser, &base_path).await
}

/// Rebuild after each burst of file events and tell clients to reload.
async fn rebuild_loop(mut rx: mpsc::Receiver<()>, config_path: PathBuf, state: Arc<ServerState>) {
    while rx.recv().await.is_some() {
        tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)).await;
        while rx.try_recv().is_ok() {}

        println!();
        println!("  File change detected, rebuilding...");

        let path = config_path.clone();
        match tokio::task::spawn_blocking(move || rebuild(&path)).await {
            Ok(Ok(stats)) => {
                println!(
                    "  ✓ Rebuilt {} pages in {}ms",
                    stats.pages, stats.duration_ms
                );
                state.notify_reload();
            }
            Ok(Err(e)) => {
                tracing::error!("Rebuild failed: {e:#}");
                eprintln!("  ✗ Rebuild failed: {e:#}");
            }
            Err(e) => tracing::error!(error = %e, "rebuild task failed"),
        }
    }
}

/// Reload the configuration and build again.
fn rebuild(config_path: &Path) -> Result<BuildStats> {
    let (config, root) = load_config(config_path)?;
    build_and_inject(&Builder::new(config, &root))
}

/// Build and inject the live reload script into the HTML output.
fn build_and_inject(builder: &Builder) -> Result<BuildStats> {
    let stats = builder.build().wrap_err("Build failed")?;
    inject_livereload(&builder.paths().output_dir)?;

    tracing::debug!(?stats, "Build completed");
    Ok(stats)
}

/// Whether a file event should trigger a rebuild.
fn is_relevant(event: &notify::Event, ignored: &[PathBuf]) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );

    kind_matches
        && event
            .paths
            .iter()
            .any(|path| !ignored.iter().any(|dir| path.starts_with(dir)))
}
