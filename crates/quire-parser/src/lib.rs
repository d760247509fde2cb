//! Quire Parser Library
//!
//! Markdown rendering with syntax highlighting, heading anchors and custom
//! containers.

pub mod container;
pub mod markdown;
pub mod syntax;

pub use markdown::MarkdownParser;
pub use syntax::SyntaxHighlighter;
use thiserror::Error;

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Syntax highlighting setup error.
    #[error("syntax error: {0}")]
    Syntax(#[from] syntax::SyntaxError),
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

impl MarkdownParser {
    /// Create a parser, failing if the syntax theme is not bundled.
    pub fn try_with_theme(theme: &str) -> Result<Self> {
        Ok(Self::with_highlighter(SyntaxHighlighter::new(theme)?))
    }
}
