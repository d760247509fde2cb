//! Syntax highlighting for code blocks.

use syntect::{
    highlighting::ThemeSet,
    html::highlighted_html_for_string,
    parsing::{SyntaxReference, SyntaxSet},
};
use thiserror::Error;
use tracing::warn;

/// Syntax highlighting errors.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The requested theme is not bundled.
    #[error("unknown syntax theme `{name}` (available: {available})")]
    UnknownTheme { name: String, available: String },
}

/// Fence tags that mean "no highlighting" and are never reported as unknown.
const PLAIN_TAGS: &[&str] = &["text", "txt", "plain", "plaintext"];

/// Common tutorial fence tags mapped onto the nearest bundled syntax.
const ALIASES: &[(&str, &str)] = &[
    ("ts", "js"),
    ("typescript", "js"),
    ("tsx", "js"),
    ("jsx", "js"),
    ("mjs", "js"),
    ("cjs", "js"),
    ("vue", "html"),
    ("vue-html", "html"),
    ("svelte", "html"),
    ("shell", "sh"),
    ("console", "sh"),
    ("zsh", "sh"),
    ("yml", "yaml"),
    ("json5", "json"),
    ("jsonc", "json"),
    ("py", "python"),
];

/// Syntax highlighter using syntect.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: String,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme: "InspiredGitHub".to_string(),
        }
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the specified theme.
    pub fn new(theme: &str) -> Result<Self, SyntaxError> {
        let mut highlighter = Self::default();
        if !highlighter.set_theme(theme) {
            return Err(SyntaxError::UnknownTheme {
                name: theme.to_string(),
                available: highlighter.available_themes().join(", "),
            });
        }
        Ok(highlighter)
    }

    /// Get available theme names, sorted.
    pub fn available_themes(&self) -> Vec<&str> {
        let mut themes: Vec<_> = self.theme_set.themes.keys().map(String::as_str).collect();
        themes.sort_unstable();
        themes
    }

    /// Name of the active theme.
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Set the theme. Returns `false` and keeps the current one if it is unknown.
    pub fn set_theme(&mut self, theme: &str) -> bool {
        if self.theme_set.themes.contains_key(theme) {
            self.theme = theme.to_string();
            true
        } else {
            warn!(theme, current = %self.theme, "unknown syntax theme, keeping current");
            false
        }
    }

    /// Whether a fence tag is understood: highlightable, or explicitly plain.
    pub fn is_known(&self, lang: &str) -> bool {
        is_plain(lang) || self.find_syntax(lang).is_some()
    }

    fn find_syntax(&self, lang: &str) -> Option<&SyntaxReference> {
        let lower = lang.to_ascii_lowercase();
        let token = ALIASES
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map_or(lower.as_str(), |(_, target)| target);

        self.syntax_set.find_syntax_by_token(token)
    }

    /// Highlight code with the given language.
    ///
    /// Unknown or missing languages produce an unstyled `<pre><code>` block.
    pub fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let Some(lang) = lang.filter(|l| !is_plain(l)) else {
            return plain_block(code, lang);
        };

        let (Some(syntax), Some(theme)) = (self.find_syntax(lang), self.theme_set.themes.get(&self.theme))
        else {
            return plain_block(code, Some(lang));
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => format!(
                "<div class=\"code-block language-{}\">{html}</div>\n",
                escape_attr(lang)
            ),
            Err(e) => {
                warn!(lang, error = %e, "highlighting failed, rendering plain text");
                plain_block(code, Some(lang))
            }
        }
    }
}

fn is_plain(lang: &str) -> bool {
    PLAIN_TAGS.iter().any(|tag| lang.eq_ignore_ascii_case(tag))
}

/// Preformatted block without any styling.
fn plain_block(code: &str, lang: Option<&str>) -> String {
    let lang_class = lang
        .map(|l| format!(" class=\"language-{}\"", escape_attr(l)))
        .unwrap_or_default();
    format!("<pre><code{lang_class}>{}</code></pre>\n", html_escape(code))
}

fn escape_attr(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect()
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_rust() {
        let highlighter = SyntaxHighlighter::default();
        let code = "fn main() {\n    println!(\"Hello\");\n}\n";
        let html = highlighter.highlight(code, Some("rust"));

        assert!(html.starts_with("<div class=\"code-block language-rust\">"));
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_aliases_resolve() {
        let highlighter = SyntaxHighlighter::default();
        assert!(highlighter.is_known("ts"));
        assert!(highlighter.is_known("vue"));
        assert!(highlighter.is_known("Python"));
        assert!(highlighter.is_known("text"));
        assert!(!highlighter.is_known("foobar"));
    }

    #[test]
    fn test_highlight_unknown_language_is_plain() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("a < b", Some("foobar"));

        assert_eq!(
            html,
            "<pre><code class=\"language-foobar\">a &lt; b</code></pre>\n"
        );
        assert!(!html.contains("style="));
    }

    #[test]
    fn test_highlight_no_language() {
        let highlighter = SyntaxHighlighter::default();
        let html = highlighter.highlight("plain text", None);

        assert_eq!(html, "<pre><code>plain text</code></pre>\n");
    }

    #[test]
    fn test_highlight_is_deterministic() {
        let highlighter = SyntaxHighlighter::default();
        let code = "const x = { a: 1 };\n";
        assert_eq!(
            highlighter.highlight(code, Some("js")),
            highlighter.highlight(code, Some("js"))
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
    }

    #[test]
    fn test_themes() {
        let highlighter = SyntaxHighlighter::default();
        let themes = highlighter.available_themes();
        assert!(themes.contains(&"base16-ocean.dark"));
        assert!(themes.contains(&"InspiredGitHub"));

        assert_eq!(
            SyntaxHighlighter::new("base16-ocean.dark").unwrap().theme(),
            "base16-ocean.dark"
        );
        assert!(matches!(
            SyntaxHighlighter::new("no-such-theme"),
            Err(SyntaxError::UnknownTheme { .. })
        ));
    }
}
