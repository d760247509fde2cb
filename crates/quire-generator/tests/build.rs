//! End-to-end build tests.
//!
//! Each test lays out a small site in a temporary directory and builds it.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use quire_core::Config;
use quire_generator::{BuildError, Builder, Navigation, build::SitePlan, store::ContentStore};
use tempfile::TempDir;
use walkdir::WalkDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
    fs::write(path, content).expect("write file");
}

fn config(toml: &str) -> Config {
    Config::from_toml_str(toml).expect("config")
}

/// Every file in a directory with its bytes, keyed by relative path.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(dir).expect("prefix").to_path_buf();
            (rel, fs::read(e.path()).expect("read"))
        })
        .collect()
}

fn abc_site() -> (TempDir, Config) {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/a.md", "---\ntitle: A\n---\n# A\n\nFirst.\n");
    write(dir.path(), "docs/b.md", "---\ntitle: B\n---\n# B\n\nNot in the sidebar.\n");
    write(dir.path(), "docs/c.md", "---\ntitle: C\n---\n# C\n\nBack to [A](./a.md).\n");

    let config = config(
        r#"
[site]
title = "ABC"

[[navigation.entries]]
path = "a.md"

[[navigation.entries]]
path = "c.md"
"#,
    );
    (dir, config)
}

#[test]
fn test_explicit_navigation_subset() {
    let (dir, config) = abc_site();
    let builder = Builder::new(config.clone(), dir.path());

    let stats = builder.build().expect("build");
    assert_eq!(stats.pages, 3);
    assert_eq!(stats.nav_entries, 2);
    assert_eq!(stats.orphans, 1);

    let store = ContentStore::load(&dir.path().join("docs")).expect("store");
    let nav = Navigation::derive(&config.navigation.entries, &store).expect("nav");
    let targets: Vec<_> = nav.entries().iter().map(|e| e.target.as_str()).collect();
    assert_eq!(targets, vec!["a.md", "c.md"]);

    let out = dir.path().join("dist");
    for page in ["a", "b", "c"] {
        assert!(out.join(page).join("index.html").exists(), "{page} missing");
    }

    let b = fs::read_to_string(out.join("b/index.html")).expect("read b");
    assert!(b.contains("Not in the sidebar."));
    assert!(!b.contains("is-active"));

    let c = fs::read_to_string(out.join("c/index.html")).expect("read c");
    assert!(c.contains("<a href=\"/a/\">A</a>"));
    assert!(c.contains("class=\"pager-link prev\" href=\"/a/\""));
}

#[test]
fn test_build_is_idempotent() {
    let (dir, config) = abc_site();
    write(dir.path(), "docs/guide/code.md", "# Code\n\n```rust\nfn main() {}\n```\n");
    write(dir.path(), "public/favicon.svg", "<svg/>");

    let builder = Builder::new(config, dir.path());
    builder.build().expect("first build");
    let first = snapshot(&dir.path().join("dist"));

    builder.build().expect("second build");
    let second = snapshot(&dir.path().join("dist"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_unclosed_frontmatter_names_file_and_line() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/ok.md", "# Fine\n");
    write(dir.path(), "docs/guide/broken.md", "\n---\ntitle: Broken\n\n# Body\n");

    let err = Builder::new(Config::new("T"), dir.path())
        .build()
        .expect_err("build should fail");

    let message = err.to_string();
    assert!(message.contains("broken.md"), "{message}");
    assert!(message.contains(":2:"), "{message}");
    assert!(message.contains("missing closing `---`"), "{message}");
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_unknown_fence_language_builds() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "docs/index.md",
        "# Home\n\n```foobar\nsome <weird> code\n```\n",
    );

    let builder = Builder::new(Config::new("T"), dir.path());
    let stats = builder.build().expect("build");
    assert_eq!(stats.warnings, 1);

    let html = fs::read_to_string(dir.path().join("dist/index.html")).expect("read");
    assert!(html.contains(
        "<pre><code class=\"language-foobar\">some &lt;weird&gt; code\n</code></pre>"
    ));
}

#[test]
fn test_broken_navigation_reference_fails() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/a.md", "# A\n");
    let config = config(
        r#"
[site]
title = "T"

[[navigation.entries]]
path = "a.md"

[[navigation.entries]]
path = "nowhere.md"
"#,
    );

    let err = Builder::new(config, dir.path()).build().expect_err("should fail");
    assert!(matches!(err, BuildError::Navigation(_)));
    assert!(err.to_string().contains("nowhere.md"));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_documents_sharing_a_url_fail() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/guide.md", "# From guide.md\n");
    write(dir.path(), "docs/guide/index.md", "# From guide/index.md\n");

    let err = Builder::new(Config::new("T"), dir.path())
        .build()
        .expect_err("should fail");

    assert!(matches!(err, BuildError::Store(_)));
    let message = err.to_string();
    assert!(message.contains("guide.md"), "{message}");
    assert!(message.contains("guide/index.md"), "{message}");
    assert!(message.contains("/guide/"), "{message}");
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_rebuild_with_output_inside_content() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/index.md", "# Home\n");
    write(dir.path(), "docs/guide/intro.md", "# Intro\n");
    let config = config("[site]\ntitle = \"T\"\n\n[build]\noutput_dir = \"docs/site\"\n");

    let builder = Builder::new(config, dir.path());
    builder.build().expect("first build");
    let first = snapshot(&dir.path().join("docs/site"));

    let stats = builder.build().expect("second build");
    assert_eq!(stats.documents, 2);
    assert_eq!(snapshot(&dir.path().join("docs/site")), first);
}

#[test]
fn test_unknown_layout_fails() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/a.md", "---\nlayout: hero\n---\n# A\n");

    let err = Builder::new(Config::new("T"), dir.path())
        .build()
        .expect_err("should fail");
    assert!(err.to_string().contains("unknown layout `hero`"));

    write(dir.path(), "templates/hero.html", "<div class=\"hero\">{{ content }}</div>");
    Builder::new(Config::new("T"), dir.path())
        .build()
        .expect("custom layout");
    let html = fs::read_to_string(dir.path().join("dist/a/index.html")).expect("read");
    assert!(html.contains("<div class=\"hero\">"));
}

#[test]
fn test_inferred_navigation_and_base_path() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "docs/index.md", "---\nlayout: page\n---\n# Welcome\n");
    write(dir.path(), "docs/vue/index.md", "---\ntitle: Vue\nweight: 1\n---\n");
    write(dir.path(), "docs/vue/basics.md", "# Basics\n\n![logo](logo.png)\n");
    write(dir.path(), "docs/vue/logo.png", "png");
    write(dir.path(), "docs/react/hooks.md", "---\nweight: 2\n---\n# Hooks\n");

    let config = config(
        "[site]\ntitle = \"Tutorials\"\nbase_path = \"/tutorials\"\nbase_url = \"https://example.com\"\n",
    );
    let plan: SitePlan = Builder::new(config.clone(), dir.path()).plan().expect("plan");
    assert_eq!(plan.stats.nav_entries, 3);
    assert_eq!(plan.stats.orphans, 0);

    Builder::new(config, dir.path()).build().expect("build");
    let out = dir.path().join("dist");

    let basics = fs::read_to_string(out.join("vue/basics/index.html")).expect("read");
    assert!(basics.contains("href=\"/tutorials/vue/\">Vue</a>"));
    assert!(basics.contains("href=\"/tutorials/react/hooks/\">Hooks</a>"));
    assert!(basics.contains("src=\"/tutorials/vue/logo.png\""));
    assert!(basics.contains("<link rel=\"canonical\" href=\"https://example.com/tutorials/vue/basics/\">"));
    assert!(out.join("vue/logo.png").exists());

    let sitemap = fs::read_to_string(out.join("sitemap.xml")).expect("sitemap");
    assert_eq!(sitemap.matches("<loc>").count(), 4);
}

#[test]
fn test_build_with_output_override() {
    let (dir, config) = abc_site();
    let target = TempDir::new().expect("tempdir");

    Builder::new(config, dir.path())
        .with_output_dir(target.path().join("site"))
        .build()
        .expect("build");

    assert!(target.path().join("site/a/index.html").exists());
    assert!(!dir.path().join("dist").exists());
}
