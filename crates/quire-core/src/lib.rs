//! Quire Core Library
//!
//! Core types, configuration, and error handling for the Quire documentation
//! site generator.

pub mod config;
pub mod content;
pub mod error;
pub mod frontmatter;

pub use config::Config;
pub use content::{Document, DocumentPath, Page, ParsedContent, TocEntry};
pub use error::{CoreError, Result};
pub use frontmatter::{Frontmatter, Outline};
