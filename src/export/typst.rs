use super::{Context, Converter, Phase};
use crate::config::TypstConfig;
use crate::error::ExportError;
use crate::node::{
    Heading, Link, List, ListItem, ListType, NodeKind, Paragraph, Quote, Tab, Text, TextStyle,
};

const PREAMBLE: &str = "#set par(linebreaks: \"optimized\")\n\n";

/// One rendered top-level block.
struct Block {
    heading: bool,
    body: String,
}

/// Renders Typst markup, ready to be compiled to PDF.
pub struct TypstConverter {
    keep_headings_with_next: bool,
    unbreakable_list_items: usize,
    blocks: Vec<Block>,
    /// Inline markup of the current line block
    line: String,
    /// Paragraphs of the quote being rendered
    quoted: Vec<String>,
    /// Lines of the top-level list being rendered
    list: String,
}

impl TypstConverter {
    pub fn new(config: &TypstConfig) -> Self {
        Self {
            keep_headings_with_next: config.keep_headings_with_next,
            unbreakable_list_items: config.unbreakable_list_items,
            blocks: Vec::new(),
            line: String::new(),
            quoted: Vec::new(),
            list: String::new(),
        }
    }

    fn push_block(&mut self, heading: bool, body: String) {
        self.blocks.push(Block { heading, body });
    }
}

/// Items carrying content, nested lists included.
fn count_list_items(list: &List) -> usize {
    list.items()
        .map(|item| item.nested_list().map_or(1, count_list_items))
        .sum()
}

fn escape(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
}

fn escape_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Inline raw text. Raw blocks take no escapes, so the fence outgrows any backtick run.
fn raw(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    if longest == 0 {
        return format!("`{text}`");
    }
    // A fence of three or more backticks would open a raw block with a language tag
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence} {text} {fence}")
}

fn render_text(node: &Text, out: &mut String) {
    let core = node.text.trim();
    if node.format.is_empty() || core.is_empty() {
        escape(&node.text, out);
        return;
    }
    let start = node.text.len() - node.text.trim_start().len();
    let end = start + core.len();

    let mut inner = if node.format.is_code() {
        raw(core)
    } else {
        let mut escaped = String::new();
        escape(core, &mut escaped);
        escaped
    };
    for style in node.format.styles() {
        inner = match style {
            TextStyle::Bold => format!("*{inner}*"),
            TextStyle::Italic => format!("_{inner}_"),
            TextStyle::Strikethrough => format!("#strike[{inner}]"),
            TextStyle::Underline => format!("#underline[{inner}]"),
            TextStyle::Subscript => format!("#sub[{inner}]"),
            TextStyle::Superscript => format!("#super[{inner}]"),
            TextStyle::Highlight => format!("#highlight[{inner}]"),
            TextStyle::Code => continue,
        };
    }

    out.push_str(&node.text[..start]);
    out.push_str(&inner);
    out.push_str(&node.text[end..]);
}

impl Converter for TypstConverter {
    fn finish(&mut self) -> String {
        let mut out = String::from(PREAMBLE);
        let mut blocks = std::mem::take(&mut self.blocks).into_iter();
        while let Some(block) = blocks.next() {
            if block.heading && self.keep_headings_with_next {
                // Keep a heading on the same page as the content it introduces
                out.push_str("#block(breakable: false)[\n");
                out.push_str(&block.body);
                if let Some(next) = blocks.next() {
                    out.push_str(&next.body);
                }
                out.push_str("]\n\n");
            } else {
                out.push_str(&block.body);
            }
        }
        out
    }

    fn heading(&mut self, node: &Heading, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            let marks = "=".repeat(usize::from(node.tag.level()));
            let body = format!("{marks} {}\n\n", std::mem::take(&mut self.line));
            self.push_block(true, body);
        }
        Ok(())
    }

    fn quote(&mut self, node: &Quote, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            if node.children.last().is_none_or(|c| c.kind().is_inline()) {
                let trailing = std::mem::take(&mut self.line);
                self.quoted.push(trailing);
            }
            let body = std::mem::take(&mut self.quoted).join("\n\n");
            self.push_block(false, format!("#quote(block: true)[{body}]\n\n"));
        }
        Ok(())
    }

    fn paragraph(&mut self, _node: &Paragraph, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        let quoted = cx.inside(NodeKind::Quote);
        if phase == Phase::Enter {
            // Inline content ahead of a quoted paragraph is a paragraph of its own
            if quoted && !self.line.is_empty() {
                let pending = std::mem::take(&mut self.line);
                self.quoted.push(pending);
            }
            return Ok(());
        }
        let content = std::mem::take(&mut self.line);
        if quoted {
            self.quoted.push(content);
        } else if !content.is_empty() {
            self.push_block(false, format!("{content}\n\n"));
        }
        Ok(())
    }

    fn list(&mut self, node: &List, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter || !cx.is_top_level() {
            return Ok(());
        }
        let lines = std::mem::take(&mut self.list);
        // Short lists stay together, long ones may break across pages
        let body = if count_list_items(node) <= self.unbreakable_list_items {
            format!("#block(breakable: false)[\n{lines}]\n\n")
        } else {
            format!("{lines}\n")
        };
        self.push_block(false, body);
        Ok(())
    }

    fn list_item(&mut self, node: &ListItem, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter || node.nested_list().is_some() {
            return Ok(());
        }
        self.list.push_str(&"  ".repeat(node.attrs.indent as usize));
        match cx.parent_list().map(|l| l.list_type) {
            Some(ListType::Number) => self.list.push_str("+ "),
            Some(ListType::Check) if node.checked == Some(true) => self.list.push_str("- ☑ "),
            Some(ListType::Check) => self.list.push_str("- ☐ "),
            _ => self.list.push_str("- "),
        }
        self.list.push_str(&std::mem::take(&mut self.line));
        self.list.push('\n');
        Ok(())
    }

    fn link(&mut self, node: &Link, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        match phase {
            Phase::Enter => {
                self.line.push_str("#link(\"");
                self.line.push_str(&escape_string(&node.url));
                self.line.push_str("\")[");
            }
            Phase::Leave => self.line.push(']'),
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
            self.line.push_str("#h(2em)");
        }
        Ok(())
    }

    fn line_break(&mut self, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.line.push_str(" \\\n");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PREAMBLE;
    use crate::config::TypstConfig;
    use crate::export::{Converter, ExportFormat, TypstConverter, export};
    use crate::node::*;

    fn typst(children: Vec<Node>) -> String {
        let state = EditorState::new(Root::new(children)).unwrap();
        export(&state, ExportFormat::Typst).unwrap()
    }

    fn para(children: Vec<Node>) -> Node {
        Paragraph::new(children).into()
    }

    fn heading(text: &str) -> Node {
        Heading::new(HeadingTag::H1, vec![Text::plain(text).into()]).into()
    }

    fn items(texts: &[&str]) -> Vec<ListItem> {
        texts
            .iter()
            .map(|t| ListItem::new(vec![Text::plain(*t).into()]))
            .collect()
    }

    #[test]
    fn heading_alone() {
        assert_eq!(
            typst(vec![heading("Hello")]),
            format!("{PREAMBLE}#block(breakable: false)[\n= Hello\n\n]\n\n")
        );
    }

    #[test]
    fn heading_with_following_content() {
        let result = typst(vec![heading("Title"), para(vec![Text::plain("Some text.").into()])]);
        assert_eq!(
            result,
            format!("{PREAMBLE}#block(breakable: false)[\n= Title\n\nSome text.\n\n]\n\n")
        );
    }

    #[test]
    fn heading_grouping_can_be_disabled() {
        let config = TypstConfig {
            keep_headings_with_next: false,
            ..TypstConfig::default()
        };
        let state = EditorState::new(Root::new(vec![
            heading("Title"),
            para(vec![Text::plain("x").into()]),
        ]))
        .unwrap();
        assert_eq!(
            TypstConverter::new(&config).convert(&state).unwrap(),
            format!("{PREAMBLE}= Title\n\nx\n\n")
        );
    }

    #[test]
    fn paragraph() {
        assert_eq!(
            typst(vec![para(vec![Text::plain("Hello world").into()])]),
            format!("{PREAMBLE}Hello world\n\n")
        );
    }

    #[test]
    fn bold_and_italic() {
        let bold = TextFormat::empty().with(TextStyle::Bold);
        let both = bold.with(TextStyle::Italic);
        assert_eq!(
            typst(vec![para(vec![Text::new("bold", bold).into()])]),
            format!("{PREAMBLE}*bold*\n\n")
        );
        assert_eq!(
            typst(vec![para(vec![Text::new("both", both).into()])]),
            format!("{PREAMBLE}_*both*_\n\n")
        );
    }

    #[test]
    fn inline_code_and_function_styles() {
        let code = TextFormat::empty().with(TextStyle::Code);
        let marked = TextFormat::empty()
            .with(TextStyle::Underline)
            .with(TextStyle::Highlight);
        assert_eq!(
            typst(vec![para(vec![
                Text::new("code", code).into(),
                Text::new(" hi", marked).into(),
            ])]),
            format!("{PREAMBLE}`code` #highlight[#underline[hi]]\n\n")
        );
    }

    #[test]
    fn unordered_list() {
        let list = List::build(ListType::Bullet, 1, items(&["one", "two"]));
        assert_eq!(
            typst(vec![list.into()]),
            format!("{PREAMBLE}#block(breakable: false)[\n- one\n- two\n]\n\n")
        );
    }

    #[test]
    fn ordered_nested_list() {
        let inner = List::build(ListType::Bullet, 1, items(&["b"]));
        let mut outer_items = items(&["a"]);
        outer_items.push(ListItem::nested(inner));
        let list = List::build(ListType::Number, 1, outer_items);
        assert_eq!(
            typst(vec![list.into()]),
            format!("{PREAMBLE}#block(breakable: false)[\n+ a\n  - b\n]\n\n")
        );
    }

    #[test]
    fn long_list_may_break() {
        let list = List::build(ListType::Check, 1, items(&["1", "2", "3", "4", "5", "6"]));
        assert_eq!(
            typst(vec![list.into()]),
            format!("{PREAMBLE}- ☐ 1\n- ☐ 2\n- ☐ 3\n- ☐ 4\n- ☐ 5\n- ☐ 6\n\n")
        );
    }

    #[test]
    fn quote_link_and_break() {
        let link = Link::new("https://typst.app", vec![Text::plain("typst").into()]);
        let quote = Quote::new(vec![
            Text::plain("line one").into(),
            Node::LineBreak,
            link.into(),
        ]);
        assert_eq!(
            typst(vec![quote.into()]),
            format!("{PREAMBLE}#quote(block: true)[line one \\\n#link(\"https://typst.app\")[typst]]\n\n")
        );
    }

    #[test]
    fn quote_mixing_inline_and_paragraphs() {
        let quote = Quote::new(vec![
            Text::plain("a").into(),
            para(vec![Text::plain("b").into()]),
        ]);
        assert_eq!(
            typst(vec![quote.into()]),
            format!("{PREAMBLE}#quote(block: true)[a\n\nb]\n\n")
        );
    }

    #[test]
    fn raw_text_fence_outgrows_backticks() {
        let code = TextFormat::empty().with(TextStyle::Code);
        assert_eq!(
            typst(vec![para(vec![Text::new("a`b", code).into()])]),
            format!("{PREAMBLE}``` a`b ```\n\n")
        );
        assert_eq!(
            typst(vec![para(vec![Text::new("x```y", code).into()])]),
            format!("{PREAMBLE}```` x```y ````\n\n")
        );
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(
            typst(vec![para(vec![Text::plain("a * b # c_d").into()])]),
            format!("{PREAMBLE}a \\* b \\# c\\_d\n\n")
        );
    }
}
