//! Quire Generator Library
//!
//! Static site assembly for Quire.
//!
//! # Modules
//!
//! - [`store`] - Content discovery and frontmatter parsing
//! - [`navigation`] - Sidebar tree from configuration or directory layout
//! - [`template`] - HTML template system with variable interpolation
//! - [`html`] - Page markup: layouts, sidebar, outline, prev/next links
//! - [`assets`] - Static asset copying with optional fingerprinting
//! - [`sitemap`] - XML sitemap generation
//! - [`build`] - Build orchestration

pub mod assets;
pub mod build;
pub mod html;
pub mod navigation;
pub mod sitemap;
pub mod store;
pub mod template;

pub use assets::{AssetManifest, AssetProcessor};
pub use build::{BuildError, BuildStats, Builder, Diagnostic, SitePlan};
pub use html::HtmlGenerator;
pub use navigation::{NavEntry, Navigation, NavigationSource};
pub use sitemap::SitemapGenerator;
pub use store::ContentStore;
pub use template::{Template, TemplateContext, TemplateRegistry};
