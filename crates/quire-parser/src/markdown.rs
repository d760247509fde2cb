//! Markdown renderer using pulldown-cmark.

use std::{collections::HashSet, path::Path};

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag,
    TagEnd,
};
use quire_core::{
    Document,
    content::{DocumentPath, ParsedContent, TocEntry, normalize_key},
};
use tracing::debug;

use crate::{
    container,
    syntax::{SyntaxHighlighter, html_escape},
};

/// Markdown renderer with syntax highlighting support.
#[derive(Debug)]
pub struct MarkdownParser {
    highlighter: SyntaxHighlighter,
    options: Options,
    base_path: String,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a new markdown parser with default options.
    pub fn new() -> Self {
        Self::with_highlighter(SyntaxHighlighter::default())
    }

    /// Create a parser around an already configured highlighter.
    pub fn with_highlighter(highlighter: SyntaxHighlighter) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        options.insert(Options::ENABLE_GFM);

        Self {
            highlighter,
            options,
            base_path: "/".to_string(),
        }
    }

    /// Create a parser with a custom syntax theme.
    ///
    /// An unknown theme keeps the default and logs a warning.
    pub fn with_theme(theme: &str) -> Self {
        let mut parser = Self::new();
        parser.highlighter.set_theme(theme);
        parser
    }

    /// Prefix rewritten links with a site base path such as `/docs/`.
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = base_path.to_string();
        self
    }

    /// The syntax highlighter in use.
    pub fn highlighter(&self) -> &SyntaxHighlighter {
        &self.highlighter
    }

    /// Render a document's body.
    pub fn render(&self, document: &Document) -> ParsedContent {
        debug!(key = %document.path.key, "rendering document");
        self.render_body(&document.body, document.path.parent_dir())
    }

    /// Render a markdown body; `source_dir` is the content-relative directory
    /// used to resolve relative links.
    pub fn render_body(&self, body: &str, source_dir: &str) -> ParsedContent {
        let pre = container::preprocess(body);
        let parser = Parser::new_ext(&pre.markdown, self.options);

        let mut renderer = Renderer::new(self, source_dir);
        for event in parser {
            renderer.event(event);
        }

        let mut content = renderer.finish();
        content.warnings = pre.warnings;
        content
    }
}

#[derive(Debug)]
struct HeadingState {
    level: u8,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    html: String,
}

#[derive(Debug)]
struct ImageState {
    src: String,
    title: String,
    alt: String,
}

#[derive(Debug, Default)]
struct TableState {
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

/// Event-driven HTML writer for one markdown body.
struct Renderer<'a> {
    parser: &'a MarkdownParser,
    source_dir: &'a str,
    html: String,
    toc: Vec<TocEntry>,
    used_ids: HashSet<String>,
    heading: Option<HeadingState>,
    code: Option<(Option<String>, String)>,
    image: Option<ImageState>,
    table: TableState,
    unknown_languages: Vec<String>,
    links: Vec<String>,
}

impl<'a> Renderer<'a> {
    fn new(parser: &'a MarkdownParser, source_dir: &'a str) -> Self {
        Self {
            parser,
            source_dir,
            html: String::new(),
            toc: Vec::new(),
            used_ids: HashSet::new(),
            heading: None,
            code: None,
            image: None,
            table: TableState::default(),
            unknown_languages: Vec::new(),
            links: Vec::new(),
        }
    }

    fn finish(self) -> ParsedContent {
        ParsedContent {
            html: self.html,
            toc: self.toc,
            unknown_languages: self.unknown_languages,
            links: self.links,
            warnings: Vec::new(),
        }
    }

    /// Output buffer; heading content is buffered until its id is known.
    fn out(&mut self) -> &mut String {
        match self.heading.as_mut() {
            Some(heading) => &mut heading.html,
            None => &mut self.html,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        if let Some((_, code)) = self.code.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => self.end_code_block(),
                _ => {}
            }
            return;
        }

        if let Some(image) = self.image.as_mut() {
            match event {
                Event::Text(text) | Event::Code(text) => image.alt.push_str(&text),
                Event::SoftBreak | Event::HardBreak => image.alt.push(' '),
                Event::End(TagEnd::Image) => self.end_image(),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if let Some(heading) = self.heading.as_mut() {
                    heading.text.push_str(&text);
                }
                self.out().push_str(&html_escape(&text));
            }
            Event::Code(code) => {
                if let Some(heading) = self.heading.as_mut() {
                    heading.text.push_str(&code);
                }
                let html = format!("<code>{}</code>", html_escape(&code));
                self.out().push_str(&html);
            }
            Event::Html(raw) | Event::InlineHtml(raw) => self.out().push_str(&raw),
            Event::SoftBreak => self.out().push('\n'),
            Event::HardBreak => self.out().push_str("<br />\n"),
            Event::Rule => self.out().push_str("<hr />\n"),
            Event::FootnoteReference(name) => {
                let name = html_escape(&name);
                let html = format!(
                    "<sup class=\"footnote-ref\"><a href=\"#fn-{name}\">[{name}]</a></sup>"
                );
                self.out().push_str(&html);
            }
            Event::TaskListMarker(checked) => {
                let checkbox = if checked {
                    "<input type=\"checkbox\" checked disabled />"
                } else {
                    "<input type=\"checkbox\" disabled />"
                };
                self.out().push_str(checkbox);
            }
            Event::InlineMath(math) => {
                let html = format!("<span class=\"math inline\">{}</span>", html_escape(&math));
                self.out().push_str(&html);
            }
            Event::DisplayMath(math) => {
                let html = format!("<div class=\"math display\">{}</div>", html_escape(&math));
                self.out().push_str(&html);
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading {
                level, id, classes, ..
            } => {
                self.heading = Some(HeadingState {
                    level: heading_level(level),
                    id: id.map(|i| i.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    text: String::new(),
                    html: String::new(),
                });
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let src = self.rewrite_asset(&dest_url);
                self.image = Some(ImageState {
                    src,
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Link {
                dest_url, title, ..
            } => {
                let href = self.rewrite_link(&dest_url);
                let external = is_external(&dest_url);
                let mut html = format!("<a href=\"{}\"", html_escape(&href));
                if !title.is_empty() {
                    html.push_str(&format!(" title=\"{}\"", html_escape(&title)));
                }
                if external {
                    html.push_str(" target=\"_blank\" rel=\"noreferrer\"");
                }
                html.push('>');
                self.out().push_str(&html);
            }
            Tag::BlockQuote(Some(kind)) => {
                let (class, title) = alert(kind);
                let html = format!(
                    "<div class=\"custom-block {class}\">\n<p class=\"custom-block-title\">{title}</p>\n"
                );
                self.out().push_str(&html);
            }
            Tag::Table(alignments) => {
                self.table = TableState {
                    alignments,
                    ..TableState::default()
                };
                self.out().push_str("<table>\n");
            }
            Tag::TableHead => {
                self.table.in_head = true;
                self.table.cell = 0;
                self.out().push_str("<thead>\n<tr>");
            }
            Tag::TableRow => {
                self.table.cell = 0;
                self.out().push_str("<tr>");
            }
            Tag::TableCell => {
                let cell = if self.table.in_head { "th" } else { "td" };
                let style = match self.table.alignments.get(self.table.cell) {
                    Some(Alignment::Left) => " style=\"text-align: left\"",
                    Some(Alignment::Center) => " style=\"text-align: center\"",
                    Some(Alignment::Right) => " style=\"text-align: right\"",
                    _ => "",
                };
                let html = format!("<{cell}{style}>");
                self.out().push_str(&html);
            }
            other => {
                let html = tag_to_html_start(&other);
                self.out().push_str(&html);
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => self.end_heading(),
            TagEnd::BlockQuote(Some(_)) => self.out().push_str("</div>\n"),
            TagEnd::TableHead => {
                self.table.in_head = false;
                self.out().push_str("</tr>\n</thead>\n<tbody>\n");
            }
            TagEnd::TableCell => {
                let cell = if self.table.in_head { "th" } else { "td" };
                self.table.cell += 1;
                let html = format!("</{cell}>");
                self.out().push_str(&html);
            }
            TagEnd::Table => self.out().push_str("</tbody>\n</table>\n"),
            other => {
                let html = tag_to_html_end(&other);
                self.out().push_str(html);
            }
        }
    }

    fn end_heading(&mut self) {
        let Some(heading) = self.heading.take() else {
            return;
        };

        let text = heading.text.trim().to_string();
        let base = heading.id.clone().unwrap_or_else(|| slugify(&text));
        let id = self.unique_id(&base);
        let class_attr = if heading.classes.is_empty() {
            String::new()
        } else {
            format!(" class=\"{}\"", html_escape(&heading.classes.join(" ")))
        };

        let level = heading.level;
        let escaped = html_escape(&id);
        self.html.push_str(&format!(
            "<h{level} id=\"{escaped}\"{class_attr}>{}<a class=\"header-anchor\" href=\"#{escaped}\" aria-hidden=\"true\">#</a></h{level}>\n",
            heading.html
        ));

        self.toc.push(TocEntry { level, text, id });
    }

    fn end_code_block(&mut self) {
        let Some((lang, code)) = self.code.take() else {
            return;
        };

        if let Some(lang) = lang.as_deref()
            && !self.parser.highlighter.is_known(lang)
            && !self.unknown_languages.iter().any(|l| l == lang)
        {
            self.unknown_languages.push(lang.to_string());
        }

        let html = self.parser.highlighter.highlight(&code, lang.as_deref());
        self.out().push_str(&html);
    }

    fn end_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };

        let title_attr = if image.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", html_escape(&image.title))
        };
        let html = format!(
            "<img src=\"{}\" alt=\"{}\"{title_attr} />",
            html_escape(&image.src),
            html_escape(&image.alt)
        );
        self.out().push_str(&html);
    }

    /// Reserve a heading id, suffixing `-1`, `-2`, ... on collisions.
    fn unique_id(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "section" } else { base };
        let mut id = base.to_string();
        let mut n = 1;
        while !self.used_ids.insert(id.clone()) {
            id = format!("{base}-{n}");
            n += 1;
        }
        id
    }

    /// Rewrite a link destination.
    ///
    /// Markdown targets become page URLs and are recorded; other relative
    /// targets become absolute site paths.
    fn rewrite_link(&mut self, dest: &str) -> String {
        if is_external(dest) || dest.starts_with('#') || dest.is_empty() {
            return dest.to_string();
        }

        let (path, fragment) = match dest.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (dest, None),
        };

        let Some(key) = self.resolve(path) else {
            return dest.to_string();
        };

        let url = match DocumentPath::from_path(Path::new(&key)) {
            Some(doc_path) => {
                if !self.links.contains(&key) {
                    self.links.push(key);
                }
                doc_path.url_path()
            }
            None if path.ends_with('/') => format!("/{key}/"),
            None => format!("/{key}"),
        };

        let mut href = self.with_base(&url);
        if let Some(fragment) = fragment {
            href.push('#');
            href.push_str(fragment);
        }
        href
    }

    fn rewrite_asset(&self, dest: &str) -> String {
        if is_external(dest) || dest.starts_with('#') || dest.is_empty() {
            return dest.to_string();
        }
        match self.resolve(dest) {
            Some(key) => self.with_base(&format!("/{key}")),
            None => dest.to_string(),
        }
    }

    /// Resolve a site-relative or document-relative path to a content key.
    fn resolve(&self, path: &str) -> Option<String> {
        if let Some(absolute) = path.strip_prefix('/') {
            return normalize_key(Path::new(absolute));
        }
        normalize_key(&Path::new(self.source_dir).join(path))
    }

    fn with_base(&self, url: &str) -> String {
        format!(
            "{}{}",
            self.parser.base_path,
            url.trim_start_matches('/')
        )
    }
}

/// Language tag from a fence info string: `ts{1,3} title` → `ts`.
fn fence_language(info: &CowStr<'_>) -> Option<String> {
    let first = info.split_whitespace().next()?;
    let lang = first.split(['{', ':']).next()?.trim();
    (!lang.is_empty()).then(|| lang.to_string())
}

fn is_external(dest: &str) -> bool {
    dest.contains("://")
        || dest.starts_with("//")
        || dest.starts_with("mailto:")
        || dest.starts_with("tel:")
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn alert(kind: BlockQuoteKind) -> (&'static str, &'static str) {
    match kind {
        BlockQuoteKind::Note => ("note", "NOTE"),
        BlockQuoteKind::Tip => ("tip", "TIP"),
        BlockQuoteKind::Important => ("important", "IMPORTANT"),
        BlockQuoteKind::Warning => ("warning", "WARNING"),
        BlockQuoteKind::Caution => ("danger", "CAUTION"),
    }
}

/// Convert a pulldown-cmark tag to an HTML opening tag.
fn tag_to_html_start(tag: &Tag) -> String {
    match tag {
        Tag::Paragraph => "<p>".to_string(),
        Tag::BlockQuote(_) => "<blockquote>\n".to_string(),
        Tag::List(Some(1)) => "<ol>\n".to_string(),
        Tag::List(Some(start)) => format!("<ol start=\"{start}\">\n"),
        Tag::List(None) => "<ul>\n".to_string(),
        Tag::Item => "<li>".to_string(),
        Tag::FootnoteDefinition(name) => {
            format!("<div class=\"footnote\" id=\"fn-{}\">", html_escape(name))
        }
        Tag::Emphasis => "<em>".to_string(),
        Tag::Strong => "<strong>".to_string(),
        Tag::Strikethrough => "<del>".to_string(),
        Tag::DefinitionList => "<dl>\n".to_string(),
        Tag::DefinitionListTitle => "<dt>".to_string(),
        Tag::DefinitionListDefinition => "<dd>".to_string(),
        Tag::Superscript => "<sup>".to_string(),
        Tag::Subscript => "<sub>".to_string(),
        // Handled by the renderer, or produce no markup.
        Tag::Heading { .. }
        | Tag::CodeBlock(_)
        | Tag::Table(_)
        | Tag::TableHead
        | Tag::TableRow
        | Tag::TableCell
        | Tag::Link { .. }
        | Tag::Image { .. }
        | Tag::HtmlBlock
        | Tag::MetadataBlock(_) => String::new(),
    }
}

/// Convert a pulldown-cmark tag end to an HTML closing tag.
fn tag_to_html_end(tag: &TagEnd) -> &'static str {
    match tag {
        TagEnd::Paragraph => "</p>\n",
        TagEnd::BlockQuote(_) => "</blockquote>\n",
        TagEnd::List(true) => "</ol>\n",
        TagEnd::List(false) => "</ul>\n",
        TagEnd::Item => "</li>\n",
        TagEnd::FootnoteDefinition => "</div>\n",
        TagEnd::TableRow => "</tr>\n",
        TagEnd::Emphasis => "</em>",
        TagEnd::Strong => "</strong>",
        TagEnd::Strikethrough => "</del>",
        TagEnd::Link => "</a>",
        TagEnd::DefinitionList => "</dl>\n",
        TagEnd::DefinitionListTitle => "</dt>\n",
        TagEnd::DefinitionListDefinition => "</dd>\n",
        TagEnd::Superscript => "</sup>",
        TagEnd::Subscript => "</sub>",
        TagEnd::Heading(_)
        | TagEnd::CodeBlock
        | TagEnd::Table
        | TagEnd::TableHead
        | TagEnd::TableCell
        | TagEnd::Image
        | TagEnd::HtmlBlock
        | TagEnd::MetadataBlock(_) => "",
    }
}

/// Convert heading text to an anchor id.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(body: &str) -> ParsedContent {
        MarkdownParser::new().render_body(body, "")
    }

    #[test]
    fn test_render_document() {
        let parser = MarkdownParser::new();
        let document = Document::parse(
            DocumentPath::from_path(Path::new("guide/intro.md")).unwrap(),
            "---\ntitle: Intro\n---\n\n# Hello World\n\nThis is a test.",
            Path::new("guide/intro.md"),
        )
        .unwrap();

        let result = parser.render(&document);

        assert!(result.html.contains("<h1 id=\"hello-world\">Hello World"));
        assert!(result.html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_code_block_highlighted() {
        let result = render("```rust\nfn main() {\n    println!(\"Hello\");\n}\n```");

        assert!(result.html.contains("language-rust"));
        assert!(result.html.contains("main"));
        assert!(result.unknown_languages.is_empty());
    }

    #[test]
    fn test_unknown_language_plain() {
        let result = render("```foobar\nlet <x> = 1\n```\n");

        assert_eq!(
            result.html,
            "<pre><code class=\"language-foobar\">let &lt;x&gt; = 1\n</code></pre>\n"
        );
        assert_eq!(result.unknown_languages, vec!["foobar"]);
    }

    #[test]
    fn test_untagged_and_indented_blocks() {
        let fenced = render("```\n<b>raw</b>\n```\n");
        assert_eq!(fenced.html, "<pre><code>&lt;b&gt;raw&lt;/b&gt;\n</code></pre>\n");

        let indented = render("para\n\n    indented code\n");
        assert!(indented.html.contains("<pre><code>indented code\n</code></pre>"));
        assert!(indented.unknown_languages.is_empty());
    }

    #[test]
    fn test_fence_info_attributes() {
        assert_eq!(fence_language(&"ts{1,3}".into()).as_deref(), Some("ts"));
        assert_eq!(fence_language(&"js:line-numbers".into()).as_deref(), Some("js"));
        assert_eq!(fence_language(&"vue title=App.vue".into()).as_deref(), Some("vue"));
        assert_eq!(fence_language(&"".into()), None);
    }

    #[test]
    fn test_toc_extraction() {
        let result = render("# Heading 1\n## Heading 2\n### Heading `3`");

        assert_eq!(result.toc.len(), 3);
        assert_eq!(result.toc[0].level, 1);
        assert_eq!(result.toc[0].text, "Heading 1");
        assert_eq!(result.toc[1].id, "heading-2");
        assert_eq!(result.toc[2].text, "Heading 3");
        assert!(result.html.contains("<code>3</code>"));
    }

    #[test]
    fn test_heading_ids_unique_and_explicit() {
        let result = render("## Setup\n## Setup\n## Other {#custom}\n");

        let ids: Vec<_> = result.toc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-1", "custom"]);
        assert!(result.html.contains("href=\"#setup-1\""));
        assert!(result.html.contains("class=\"header-anchor\""));
    }

    #[test]
    fn test_markdown_links_rewritten() {
        let parser = MarkdownParser::new().with_base_path("/docs/");
        let result = parser.render_body(
            "[next](./setup.md#install) [up](../index.md) [root](/api/ref.md) [ext](https://vuejs.org) [here](#x)",
            "guide",
        );

        assert!(result.html.contains("<a href=\"/docs/guide/setup/#install\">next</a>"));
        assert!(result.html.contains("<a href=\"/docs/\">up</a>"));
        assert!(result.html.contains("<a href=\"/docs/api/ref/\">root</a>"));
        assert!(result.html.contains(
            "<a href=\"https://vuejs.org\" target=\"_blank\" rel=\"noreferrer\">ext</a>"
        ));
        assert!(result.html.contains("<a href=\"#x\">here</a>"));
        assert_eq!(result.links, vec!["guide/setup.md", "index.md", "api/ref.md"]);
    }

    #[test]
    fn test_image_alt_and_path() {
        let result = MarkdownParser::new().render_body("![A *diagram*](img/flow.png \"Flow\")", "guide");

        assert!(result.html.contains(
            "<img src=\"/guide/img/flow.png\" alt=\"A diagram\" title=\"Flow\" />"
        ));
    }

    #[test]
    fn test_table_header_cells() {
        let result = render("| Name | Size |\n|:-----|-----:|\n| a | 1 |\n");

        assert!(result.html.contains("<th style=\"text-align: left\">Name</th>"));
        assert!(result.html.contains("<th style=\"text-align: right\">Size</th>"));
        assert!(result.html.contains("<td style=\"text-align: left\">a</td>"));
        assert!(result.html.contains("<tbody>"));
    }

    #[test]
    fn test_containers_and_alerts() {
        let result = render("::: warning\nCareful **now**.\n:::\n\n> [!TIP]\n> Use it.\n");

        assert!(result.html.contains("<div class=\"custom-block warning\">"));
        assert!(result.html.contains("<strong>now</strong>"));
        assert!(result.html.contains("<div class=\"custom-block tip\">"));
        assert!(result.warnings.is_empty());

        let unclosed = render("::: tip\nno end\n");
        assert_eq!(unclosed.warnings.len(), 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let body = "# T\n\n```js\nconst a = 1\n```\n\n## T\n";
        assert_eq!(render(body), render(body));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's new in 3.0?"), "whats-new-in-30");
        assert_eq!(slugify("  spaced  out  "), "spaced-out");
    }
}
