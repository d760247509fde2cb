//! `::: kind [title]` custom containers.
//!
//! Containers are rewritten to raw HTML blocks before markdown parsing. The
//! opening and closing tags are surrounded by blank lines so the content in
//! between is still parsed as markdown.

use crate::syntax::html_escape;

/// Recognised container kinds and their default titles.
const KINDS: &[(&str, &str)] = &[
    ("tip", "TIP"),
    ("info", "INFO"),
    ("warning", "WARNING"),
    ("danger", "DANGER"),
    ("details", "Details"),
];

/// Result of container preprocessing.
#[derive(Debug, Default)]
pub struct Preprocessed {
    /// Markdown with containers replaced by HTML blocks.
    pub markdown: String,
    /// Unclosed or stray container markers, with 1-based line numbers.
    pub warnings: Vec<String>,
}

/// Tracks whether the current line is inside a fenced code block.
#[derive(Debug, Default)]
struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Feed a line; returns `true` if the line belongs to a fence.
    fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~');
        let run = marker.map_or(0, |m| trimmed.chars().take_while(|c| *c == m).count());

        match (self.open, marker) {
            (Some((ch, len)), Some(m)) if m == ch && run >= len && trimmed[run..].trim().is_empty() => {
                self.open = None;
                true
            }
            (Some(_), _) => true,
            (None, Some(m)) if run >= 3 => {
                self.open = Some((m, run));
                true
            }
            (None, _) => false,
        }
    }
}

impl FenceTracker {
    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Tracks indented (4-space) code blocks, which cannot start inside a list
/// or interrupt a paragraph.
#[derive(Debug)]
struct IndentTracker {
    in_code: bool,
    in_list: bool,
    after_blank: bool,
}

impl Default for IndentTracker {
    fn default() -> Self {
        Self {
            in_code: false,
            in_list: false,
            after_blank: true,
        }
    }
}

impl IndentTracker {
    /// Feed a line; returns `true` if the line is indented code.
    fn update(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            self.after_blank = true;
            return self.in_code;
        }

        let indent = indent_width(line);
        if indent >= 4 && (self.in_code || (self.after_blank && !self.in_list)) {
            self.in_code = true;
            self.after_blank = false;
            return true;
        }

        self.in_code = false;
        if is_list_item(line.trim_start()) {
            self.in_list = true;
        } else if self.after_blank && indent == 0 {
            self.in_list = false;
        }
        self.after_blank = false;
        false
    }
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4 - width % 4,
            _ => break,
        }
    }
    width
}

fn is_list_item(trimmed: &str) -> bool {
    let bullet = trimmed
        .strip_prefix(['-', '*', '+'])
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']));
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    let ordered = (1..=9).contains(&digits)
        && trimmed[digits..]
            .strip_prefix(['.', ')'])
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']));
    bullet || ordered
}

/// Rewrite custom containers outside code blocks into HTML blocks.
pub fn preprocess(markdown: &str) -> Preprocessed {
    let mut out = Preprocessed {
        markdown: String::with_capacity(markdown.len()),
        warnings: Vec::new(),
    };
    let mut fence = FenceTracker::default();
    let mut indented = IndentTracker::default();
    let mut stack: Vec<(&'static str, usize)> = Vec::new();

    for (idx, line) in markdown.lines().enumerate() {
        let line_no = idx + 1;

        if !fence.is_open() && indented.update(line) {
            out.markdown.push_str(line);
            out.markdown.push('\n');
            continue;
        }

        if fence.update(line) {
            out.markdown.push_str(line);
            out.markdown.push('\n');
            continue;
        }

        match parse_marker(line) {
            Some(Marker::Open { kind, title }) => {
                out.markdown.push_str(&open_tag(kind, title));
                stack.push((kind, line_no));
            }
            Some(Marker::Close) => match stack.pop() {
                Some((kind, _)) => out.markdown.push_str(close_tag(kind)),
                None => {
                    out.warnings
                        .push(format!("line {line_no}: stray `:::` without an open container"));
                    out.markdown.push_str(line);
                    out.markdown.push('\n');
                }
            },
            None => {
                out.markdown.push_str(line);
                out.markdown.push('\n');
            }
        }
    }

    while let Some((kind, line_no)) = stack.pop() {
        out.warnings
            .push(format!("line {line_no}: unclosed `::: {kind}` container"));
        out.markdown.push_str(close_tag(kind));
    }

    out
}

enum Marker<'a> {
    Open { kind: &'static str, title: &'a str },
    Close,
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    let rest = line.trim().strip_prefix(":::")?;
    if rest.starts_with(':') {
        return None;
    }

    let rest = rest.trim();
    if rest.is_empty() {
        return Some(Marker::Close);
    }

    let (name, title) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let kind = KINDS
        .iter()
        .map(|(kind, _)| *kind)
        .find(|kind| name.eq_ignore_ascii_case(kind))?;

    Some(Marker::Open {
        kind,
        title: title.trim(),
    })
}

fn open_tag(kind: &str, title: &str) -> String {
    let title = if title.is_empty() {
        KINDS
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(kind, |(_, default)| default)
            .to_string()
    } else {
        html_escape(title)
    };

    if kind == "details" {
        format!("\n<details class=\"custom-block details\">\n<summary>{title}</summary>\n\n")
    } else {
        format!(
            "\n<div class=\"custom-block {kind}\">\n<p class=\"custom-block-title\">{title}</p>\n\n"
        )
    }
}

fn close_tag(kind: &str) -> &'static str {
    if kind == "details" {
        "\n</details>\n\n"
    } else {
        "\n</div>\n\n"
    }
}
