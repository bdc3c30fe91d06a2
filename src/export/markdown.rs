use super::{Context, Converter, Phase};
use crate::config::MarkdownConfig;
use crate::error::ExportError;
use crate::node::{
    Heading, Link, List, ListItem, ListType, NodeKind, Paragraph, Quote, Tab, Text, TextStyle,
};

/// Renders CommonMark with GFM strikethrough and task lists.
///
/// Top-level blocks are separated by a blank line. Underline, subscript,
/// superscript and highlight have no Markdown spelling and are dropped.
pub struct MarkdownConverter {
    indent_unit: String,
    blocks: Vec<String>,
    /// Finished lines of the top-level block being rendered
    lines: Vec<String>,
    /// Inline content of the current line block
    line: String,
}

impl MarkdownConverter {
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            indent_unit: config.indent_unit.clone(),
            blocks: Vec::new(),
            lines: Vec::new(),
            line: String::new(),
        }
    }

    /// Move the collected inline content into `lines`, prefixing the first
    /// line with `first` and every continuation line with `rest`.
    fn flush(&mut self, first: &str, rest: &str) {
        let content = std::mem::take(&mut self.line);
        for (index, part) in content.split('\n').enumerate() {
            if index == 0 {
                self.lines.push(format!("{first}{}", protect_line_start(part)));
            } else {
                self.lines.push(format!("{rest}{part}"));
            }
        }
    }

    /// Close the top-level block once its last line is in.
    fn end_block(&mut self, cx: &Context<'_>) {
        if cx.is_top_level() {
            let block = std::mem::take(&mut self.lines).join("\n");
            if !block.trim().is_empty() {
                self.blocks.push(block);
            }
        }
    }

    /// Add one quoted paragraph, separated from the previous one by an empty quoted line.
    fn quoted_paragraph(&mut self) {
        if !self.lines.is_empty() {
            self.lines.push(">".to_string());
        }
        self.flush("> ", "> ");
    }
}

/// Escape characters that would otherwise read as Markdown syntax.
fn escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '~' | '|' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

/// Keep a line from being read as a list marker, setext underline or rule.
fn protect_line_start(line: &str) -> String {
    if line.starts_with(['-', '+', '=']) {
        return format!("\\{line}");
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=9).contains(&digits) && line[digits..].starts_with(['.', ')']) {
        return format!("{}\\{}", &line[..digits], &line[digits..]);
    }
    line.to_string()
}

fn code_span(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn delimiter(style: TextStyle) -> Option<&'static str> {
    match style {
        TextStyle::Bold => Some("**"),
        TextStyle::Italic => Some("*"),
        TextStyle::Strikethrough => Some("~~"),
        _ => None,
    }
}

fn render_text(node: &Text, out: &mut String) {
    let delimiters: Vec<&str> = node.format.styles().filter_map(delimiter).collect();
    let code = node.format.is_code();

    if delimiters.is_empty() && !code {
        escape(&node.text, out);
        return;
    }

    // Emphasis cannot start or end on whitespace, so keep it outside the delimiters
    let core = node.text.trim();
    if core.is_empty() {
        escape(&node.text, out);
        return;
    }
    let start = node.text.len() - node.text.trim_start().len();
    let end = start + core.len();

    let mut inner = if code {
        code_span(core)
    } else {
        let mut escaped = String::new();
        escape(core, &mut escaped);
        escaped
    };
    for delim in delimiters {
        inner = format!("{delim}{inner}{delim}");
    }

    out.push_str(&node.text[..start]);
    out.push_str(&inner);
    out.push_str(&node.text[end..]);
}

impl Converter for MarkdownConverter {
    fn finish(&mut self) -> String {
        std::mem::take(&mut self.blocks).join("\n\n")
    }

    fn heading(&mut self, node: &Heading, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            let marker = format!("{} ", "#".repeat(usize::from(node.tag.level())));
            self.flush(&marker, "");
            self.end_block(cx);
        }
        Ok(())
    }

    fn quote(&mut self, node: &Quote, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            if node.children.last().is_none_or(|c| c.kind().is_inline()) {
                self.quoted_paragraph();
            }
            self.end_block(cx);
        }
        Ok(())
    }

    fn paragraph(&mut self, _node: &Paragraph, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if !cx.inside(NodeKind::Quote) {
            if phase == Phase::Leave {
                self.flush("", "");
                self.end_block(cx);
            }
        } else if phase == Phase::Leave || !self.line.is_empty() {
            // Inline content ahead of a quoted paragraph is a paragraph of its own
            self.quoted_paragraph();
        }
        Ok(())
    }

    fn list(&mut self, _node: &List, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            self.end_block(cx);
        }
        Ok(())
    }

    fn list_item(&mut self, node: &ListItem, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter || node.nested_list().is_some() {
            return Ok(());
        }
        let indent = self.indent_unit.repeat(node.attrs.indent as usize);
        let marker = match cx.parent_list().map(|l| l.list_type) {
            Some(ListType::Number) => format!("{}. ", node.value),
            Some(ListType::Check) if node.checked == Some(true) => "- [x] ".to_string(),
            Some(ListType::Check) => "- [ ] ".to_string(),
            _ => "- ".to_string(),
        };
        let first = format!("{indent}{marker}");
        let rest = format!("{indent}{}", " ".repeat(marker.len()));
        self.flush(&first, &rest);
        Ok(())
    }

    fn link(&mut self, node: &Link, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        match phase {
            Phase::Enter => self.line.push('['),
            Phase::Leave => {
                self.line.push_str("](");
                if node.url.contains([' ', '(', ')']) {
                    self.line.push('<');
                    self.line.push_str(&node.url);
                    self.line.push('>');
                } else {
                    self.line.push_str(&node.url);
                }
                if let Some(title) = &node.title {
                    self.line.push_str(" \"");
                    self.line.push_str(&title.replace('"', "\\\""));
                    self.line.push('"');
                }
                self.line.push(')');
            }
        }
        Ok(())
    }

    fn text(&mut self, node: &Text, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            render_text(node, &mut self.line);
        }
        Ok(())
    }

    fn tab(&mut self, _node: &Tab, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.line.push('\t');
        }
        Ok(())
    }

    fn line_break(&mut self, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            // ATX headings end at the line end
            if cx.inside(NodeKind::Heading) {
                self.line.push(' ');
            } else {
                self.line.push_str("\\\n");
            }
        }
        Ok(())
    }
}
