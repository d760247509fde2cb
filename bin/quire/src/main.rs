//! Quire CLI
//!
//! Single binary documentation site generator for Markdown.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Quire.
#[derive(Parser)]
#[command(
    name = "quire",
    version,
    about = "A static documentation site generator"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "quire.toml")]
    config: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Build the static site for production
    Build {
        /// Output directory, overriding build.output_dir
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Override site base path (e.g., /docs/)
        #[arg(long)]
        base_path: Option<String>,
    },
    /// Start development server with live reload
    Dev {
        /// Port to listen on
        #[arg(short, long, default_value_t = 5173)]
        port: u16,
        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },
    /// Serve the built site locally
    Preview {
        /// Port to listen on
        #[arg(short, long, default_value_t = 4173)]
        port: u16,
        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },
    /// Validate configuration, content, navigation and links
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
    /// Create a new document
    New {
        /// Path of the document inside the content directory (e.g., guide/setup)
        path: PathBuf,
        /// Document title, derived from the file name when omitted
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    quire::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { out, base_path } => {
            quire::cmd::build::run(&cli.config, out.as_deref(), base_path.as_deref())?;
        }
        Commands::Dev { port, open } => {
            quire::cmd::dev::run(&cli.config, port, open).await?;
        }
        Commands::Preview { port, open } => {
            quire::cmd::preview::run(&cli.config, port, open).await?;
        }
        Commands::Check { strict } => {
            quire::cmd::check::run(&cli.config, strict)?;
        }
        Commands::New { path, title } => {
            quire::cmd::new::run(&cli.config, &path, title.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["quire", "build", "--out", "site"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, PathBuf::from("quire.toml"));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build { out, base_path } => {
                assert_eq!(out, Some(PathBuf::from("site")));
                assert!(base_path.is_none());
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_with_base_path() {
        let args = ["quire", "build", "--base-path", "/tutorials/"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Build { out, base_path } => {
                assert!(out.is_none());
                assert_eq!(base_path.as_deref(), Some("/tutorials/"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_dev_defaults() {
        let cli = Cli::parse_from(["quire", "dev"]);

        match cli.command {
            Commands::Dev { port, open } => {
                assert_eq!(port, 5173);
                assert!(!open);
            }
            _ => panic!("Expected Dev command"),
        }
    }

    #[test]
    fn test_cli_dev_command_parsing() {
        let cli = Cli::parse_from(["quire", "dev", "--port", "8080", "--open"]);

        match cli.command {
            Commands::Dev { port, open } => {
                assert_eq!(port, 8080);
                assert!(open);
            }
            _ => panic!("Expected Dev command"),
        }
    }

    #[test]
    fn test_cli_preview_defaults() {
        let cli = Cli::parse_from(["quire", "preview"]);

        match cli.command {
            Commands::Preview { port, open } => {
                assert_eq!(port, 4173);
                assert!(!open);
            }
            _ => panic!("Expected Preview command"),
        }
    }

    #[test]
    fn test_cli_new_command_parsing() {
        let args = ["quire", "new", "guide/setup", "--title", "Setup"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::New { path, title } => {
                assert_eq!(path, PathBuf::from("guide/setup"));
                assert_eq!(title.as_deref(), Some("Setup"));
            }
            _ => panic!("Expected New command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let cli = Cli::parse_from(["quire", "check", "--strict"]);

        match cli.command {
            Commands::Check { strict } => assert!(strict),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_and_config() {
        let cli = Cli::parse_from(["quire", "-vv", "--config", "site/quire.toml", "build"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("site/quire.toml"));
    }
}
