//! Local HTTP server for built sites, with live reload support

use std::{fs, path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use color_eyre::eyre::{Result, WrapErr};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
use tower_http::{
    services::{ServeDir, ServeFile},
    set_status::SetStatus,
};

/// Path of the live reload event stream.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Live reload message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Full page reload.
    Reload,
}

/// Server state containing the reload broadcaster.
#[derive(Clone)]
pub struct ServerState {
    /// Broadcast channel for live reload events.
    pub reload_tx: broadcast::Sender<ReloadMessage>,
}

impl ServerState {
    /// Create a new server state.
    pub fn new() -> Self {
        let (reload_tx, _) = broadcast::channel(16);
        Self { reload_tx }
    }

    /// Send a reload notification to all connected clients.
    pub fn notify_reload(&self) {
        let receivers = self.reload_tx.send(ReloadMessage::Reload).unwrap_or(0);
        tracing::debug!(receivers, "sent reload");
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Router serving `output_dir` under `base_path`, with `404.html` as the
/// not-found response.
pub fn static_router(output_dir: &Path, base_path: &str) -> Router {
    let not_found = ServeFile::new(output_dir.join("404.html"));
    let files = ServeDir::new(output_dir).not_found_service(not_found.clone());

    let mount = base_path.trim_end_matches('/');
    if mount.is_empty() {
        Router::new().fallback_service(files)
    } else {
        Router::new()
            .nest_service(mount, files)
            .fallback_service(SetStatus::new(not_found, StatusCode::NOT_FOUND))
    }
}

/// Create the development server router.
pub fn create_router(output_dir: &Path, base_path: &str, state: Arc<ServerState>) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_handler))
        .with_state(state)
        .merge(static_router(output_dir, base_path))
}

/// Server-Sent Events handler for live reload.
async fn livereload_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let rx = state.reload_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(ReloadMessage::Reload) => Some(Ok(Event::default().data("reload"))),
        // Lagged
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Bind to localhost and serve `app` until the process is stopped.
pub async fn serve(app: Router, port: u16, open_browser: bool, base_path: &str) -> Result<()> {
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    let url = format!("http://{addr}{base_path}");
    println!();
    println!("  Serving at {url}");
    println!("  Press Ctrl+C to stop");
    println!();

    if open_browser && let Err(e) = open::that(&url) {
        tracing::warn!(error = %e, "could not open browser");
    }

    axum::serve(listener, app).await.wrap_err("Server error")
}

/// JavaScript snippet to inject for live reload.
pub const LIVERELOAD_SCRIPT: &str = r#"
<script>
(function() {
    const source = new EventSource('/__livereload');
    source.onmessage = function(event) {
        if (event.data === 'reload') {
            window.location.reload();
        }
    };
    source.onerror = function() {
        console.log('[livereload] Connection lost, retrying...');
    };
})();
</script>
"#;

/// Add the live reload script to every HTML file under `output_dir`.
///
/// Returns the number of files changed.
pub fn inject_livereload(output_dir: &Path) -> Result<usize> {
    let mut injected = 0;

    for entry in walkdir::WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
    {
        let path = entry.path();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

        if content.contains(LIVERELOAD_PATH) {
            continue;
        }
        let Some(pos) = content.rfind("</body>") else {
            continue;
        };

        let mut modified = String::with_capacity(content.len() + LIVERELOAD_SCRIPT.len());
        modified.push_str(&content[..pos]);
        modified.push_str(LIVERELOAD_SCRIPT);
        modified.push_str(&content[pos..]);
        fs::write(path, modified).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        injected += 1;
    }

    tracing::debug!(injected, "injected live reload script");
    Ok(injected)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_inject_livereload_once() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("guide")).unwrap();
        fs::write(dir.path().join("index.html"), "<html><body><p>hi</p></body></html>").unwrap();
        fs::write(dir.path().join("guide/index.html"), "<body></body>").unwrap();
        fs::write(dir.path().join("theme.css"), "body {}").unwrap();

        assert_eq!(inject_livereload(dir.path()).unwrap(), 2);
        assert_eq!(inject_livereload(dir.path()).unwrap(), 0);

        let html = fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert_eq!(html.matches("EventSource").count(), 1);
        assert!(html.ends_with("</script>\n</body></html>"));
        assert_eq!(fs::read_to_string(dir.path().join("theme.css")).unwrap(), "body {}");
    }

    #[tokio::test]
    async fn test_notify_without_clients() {
        let state = ServerState::new();
        let mut rx = state.reload_tx.subscribe();
        state.notify_reload();
        assert_eq!(rx.recv().await.unwrap(), ReloadMessage::Reload);

        drop(rx);
        state.notify_reload();
    }
}
