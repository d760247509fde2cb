//! Check command - validate configuration and content

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use quire_generator::{Builder, SitePlan};
use quire_parser::MarkdownParser;

use super::{load_config, print_diagnostics};

/// Run the check command.
///
/// Plans a full build without writing anything. Fatal problems (bad
/// frontmatter, broken navigation, unknown layouts) fail the check; with
/// `strict`, warnings and an unknown syntax theme fail it too.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_path, strict, "Checking configuration and content");

    let plan = check(config_path, strict)?;

    println!();
    println!("Summary:");
    println!("  Documents:   {}", plan.stats.documents);
    println!("  Nav entries: {}", plan.stats.nav_entries);
    println!("  Orphans:     {}", plan.stats.orphans);
    println!("  Warnings:    {}", plan.stats.warnings);
    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Validate a site, returning the plan a build would write.
pub fn check(config_path: &Path, strict: bool) -> Result<SitePlan> {
    println!("Checking configuration...");
    let (config, root) = load_config(config_path)?;
    println!("  ✓ Configuration valid");

    if strict {
        MarkdownParser::try_with_theme(&config.build.syntax_theme)
            .wrap_err("Invalid build.syntax_theme")?;
    }

    println!("Checking content...");
    let plan = Builder::new(config, &root)
        .plan()
        .wrap_err("Content check failed")?;
    println!("  ✓ {} documents parsed and rendered", plan.stats.documents);

    print_diagnostics(&plan.diagnostics);

    if strict && !plan.diagnostics.is_empty() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            plan.diagnostics.len()
        );
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn site(page: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("quire.toml"), "[site]\ntitle = \"T\"\n").unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.md"), page).unwrap();
        dir
    }

    #[test]
    fn test_check_does_not_write_output() {
        let dir = site("# Home\n");
        let plan = check(&dir.path().join("quire.toml"), true).unwrap();

        assert_eq!(plan.stats.documents, 1);
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_strict_fails_on_warnings() {
        let dir = site("# Home\n\n[gone](./missing.md)\n");
        let config = dir.path().join("quire.toml");

        assert_eq!(check(&config, false).unwrap().diagnostics.len(), 1);
        let err = check(&config, true).unwrap_err();
        assert!(err.to_string().contains("strict mode"));
    }

    #[test]
    fn test_strict_rejects_unknown_theme() {
        let dir = site("# Home\n");
        fs::write(
            dir.path().join("quire.toml"),
            "[site]\ntitle = \"T\"\n\n[build]\nsyntax_theme = \"nope\"\n",
        )
        .unwrap();
        let config = dir.path().join("quire.toml");

        assert!(check(&config, false).is_ok());
        assert!(check(&config, true).is_err());
    }
}
