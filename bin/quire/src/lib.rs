//! Quire CLI Library
//!
//! Command implementations and the local HTTP server behind the `quire`
//! binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, dev, preview, check, new)
//! - [`server`] - Static file server with live reload
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use quire::cmd;
//!
//! cmd::build::run(Path::new("quire.toml"), None, None).unwrap();
//! ```

pub mod cmd;
pub mod server;

pub use quire_core::{Config, Page};
pub use quire_generator::{BuildStats, Builder};

/// Initialize tracing with the specified verbosity level.
///
/// `0` logs warnings only; each further level adds INFO, DEBUG and TRACE.
/// `RUST_LOG` directives still apply on top.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
