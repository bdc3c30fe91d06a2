//! Building editor states from Markdown.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::error::DocumentError;
use crate::node::{
    EditorState, Heading, HeadingTag, Link, List, ListItem, ListType, Node, Paragraph, Quote,
    Root, Text, TextFormat, TextStyle,
};

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    if !markdown.starts_with("---") {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches('\n')
    } else {
        markdown
    }
}

/// Parse Markdown into a validated editor state.
///
/// Constructs without a node type (tables, rules, raw HTML) are dropped.
pub fn from_markdown(markdown: &str) -> Result<EditorState, DocumentError> {
    let markdown = strip_frontmatter(markdown);
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut blocks = Vec::new();
    let mut state = ParseState::default();

    for event in parser {
        process_event(event, &mut state, &mut blocks);
    }

    tracing::debug!(blocks = blocks.len(), "Imported markdown");
    EditorState::new(Root::new(blocks))
}

#[derive(Default)]
struct ParseState {
    // Inline content of the current leaf block
    inline: Vec<Node>,
    // Active character styles
    format_stack: Vec<TextStyle>,
    // Enclosing inline buffers while inside a link
    span_stack: Vec<(Vec<Node>, Link)>,

    heading: Option<HeadingTag>,

    in_code_block: bool,
    code_content: String,

    // Nesting depth of block quotes, and the paragraphs collected so far
    quote_depth: usize,
    quoted: Vec<Node>,

    list_stack: Vec<ListBuilder>,

    in_table: bool,
}

impl ParseState {
    fn format(&self) -> TextFormat {
        self.format_stack.iter().copied().collect()
    }

    fn push_text(&mut self, text: &str) {
        let format = self.format();
        push_run(&mut self.inline, text, format);
    }

    fn start_style(&mut self, style: TextStyle) {
        self.format_stack.push(style);
    }

    fn end_style(&mut self, style: TextStyle) {
        if let Some(pos) = self.format_stack.iter().rposition(|s| *s == style) {
            self.format_stack.remove(pos);
        }
    }

    /// Hand inline text of a tight list item to the item before a nested block starts.
    fn flush_pending(&mut self) {
        if let Some(list) = self.list_stack.last_mut() {
            list.append(std::mem::take(&mut self.inline));
        }
    }

    /// Route a finished leaf block to the list item, quote or document it belongs to.
    fn finish_leaf(&mut self, blocks: &mut Vec<Node>, children: Vec<Node>) {
        let heading = self.heading.take();
        if let Some(list) = self.list_stack.last_mut() {
            list.append(children);
        } else if self.quote_depth > 0 {
            self.quoted.push(Paragraph::new(children).into());
        } else if let Some(tag) = heading {
            blocks.push(Heading::new(tag, children).into());
        } else {
            blocks.push(Paragraph::new(children).into());
        }
    }
}

/// Append a text run, merging it into the previous run when the styling matches.
fn push_run(nodes: &mut Vec<Node>, text: &str, format: TextFormat) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut()
        && last.format == format
        && last.is_simple()
        && last.style.is_empty()
    {
        last.text.push_str(text);
        return;
    }
    nodes.push(Text::new(text, format).into());
}

struct ListBuilder {
    ordered: bool,
    start: u32,
    task: bool,
    items: Vec<ListItem>,
    content: Vec<Node>,
    checked: Option<bool>,
    // Whether the open item already produced a list item
    flushed: bool,
}

impl ListBuilder {
    fn new(first_number: Option<u64>) -> Self {
        Self {
            ordered: first_number.is_some(),
            start: first_number
                .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX))
                .max(1),
            task: false,
            items: Vec::new(),
            content: Vec::new(),
            checked: None,
            flushed: false,
        }
    }

    /// Add content to the open item; separate paragraphs with a line break.
    fn append(&mut self, children: Vec<Node>) {
        if children.is_empty() {
            return;
        }
        if !self.content.is_empty() {
            self.content.push(Node::LineBreak);
        }
        self.content.extend(children);
    }

    fn flush_item(&mut self) {
        let mut item = ListItem::new(std::mem::take(&mut self.content));
        item.checked = self.checked.take();
        self.items.push(item);
        self.flushed = true;
    }

    fn build(self) -> List {
        let list_type = if self.task {
            ListType::Check
        } else if self.ordered {
            ListType::Number
        } else {
            ListType::Bullet
        };
        List::build(list_type, self.start, self.items)
    }
}

/// Turn a list into quote paragraphs, one per item, for lists inside quotes.
fn flatten_list(list: List, out: &mut Vec<Node>) {
    for child in list.children {
        if let Node::ListItem(mut item) = child {
            if item.nested_list().is_none() {
                out.push(Paragraph::new(item.children).into());
            } else if let Some(Node::List(nested)) = item.children.pop() {
                flatten_list(nested, out);
            }
        }
    }
}

fn process_event(event: Event, state: &mut ParseState, blocks: &mut Vec<Node>) {
    if state.in_table {
        if let Event::End(TagEnd::Table) = event {
            state.in_table = false;
            state.inline.clear();
            tracing::debug!("Skipped markdown table");
        }
        return;
    }

    match event {
        // Headings
        Event::Start(Tag::Heading { level, .. }) => {
            state.heading = Some(heading_level_to_tag(level));
        }
        Event::End(TagEnd::Heading(_)) => {
            let content = std::mem::take(&mut state.inline);
            state.finish_leaf(blocks, content);
        }

        // Paragraphs
        Event::Start(Tag::Paragraph) => {}
        Event::End(TagEnd::Paragraph) => {
            let content = std::mem::take(&mut state.inline);
            if !content.is_empty() {
                state.finish_leaf(blocks, content);
            }
        }

        // Block quotes
        Event::Start(Tag::BlockQuote(_)) => {
            state.flush_pending();
            state.quote_depth += 1;
        }
        Event::End(TagEnd::BlockQuote(_)) => {
            state.quote_depth = state.quote_depth.saturating_sub(1);
            if state.quote_depth > 0 {
                return;
            }
            let paragraphs = std::mem::take(&mut state.quoted);
            if paragraphs.is_empty() {
                return;
            }
            if let Some(list) = state.list_stack.last_mut() {
                for paragraph in paragraphs {
                    list.append(paragraph.children().to_vec());
                }
                return;
            }
            // A single paragraph is held by the quote directly
            let quote = match <[Node; 1]>::try_from(paragraphs) {
                Ok([Node::Paragraph(only)]) => Quote::new(only.children),
                Ok([other]) => Quote::new(vec![other]),
                Err(paragraphs) => Quote::new(paragraphs),
            };
            blocks.push(quote.into());
        }

        // Text content
        Event::Text(text) => {
            if state.in_code_block {
                state.code_content.push_str(&text);
            } else {
                state.push_text(&text);
            }
        }

        // Inline code
        Event::Code(code) => {
            let format = state.format().with(TextStyle::Code);
            push_run(&mut state.inline, &code, format);
        }

        Event::Start(Tag::Strong) => state.start_style(TextStyle::Bold),
        Event::End(TagEnd::Strong) => state.end_style(TextStyle::Bold),
        Event::Start(Tag::Emphasis) => state.start_style(TextStyle::Italic),
        Event::End(TagEnd::Emphasis) => state.end_style(TextStyle::Italic),
        Event::Start(Tag::Strikethrough) => state.start_style(TextStyle::Strikethrough),
        Event::End(TagEnd::Strikethrough) => state.end_style(TextStyle::Strikethrough),

        // Links
        Event::Start(Tag::Link {
            dest_url, title, ..
        }) => {
            let mut link = Link::new(dest_url.into_string(), Vec::new());
            if !title.is_empty() {
                link.title = Some(title.into_string());
            }
            state
                .span_stack
                .push((std::mem::take(&mut state.inline), link));
        }
        Event::End(TagEnd::Link) => {
            if let Some((parent, mut link)) = state.span_stack.pop() {
                link.children = std::mem::replace(&mut state.inline, parent);
                state.inline.push(link.into());
            }
        }

        // Code blocks
        Event::Start(Tag::CodeBlock(kind)) => {
            if let CodeBlockKind::Fenced(lang) = kind
                && !lang.is_empty()
            {
                tracing::debug!(language = %lang, "Dropped code block language");
            }
            state.flush_pending();
            state.in_code_block = true;
            state.code_content.clear();
        }
        Event::End(TagEnd::CodeBlock) => {
            state.in_code_block = false;
            let content = std::mem::take(&mut state.code_content);
            let code = TextFormat::empty().with(TextStyle::Code);
            let mut children = Vec::new();
            for (i, line) in content.trim_end_matches('\n').split('\n').enumerate() {
                if i > 0 {
                    children.push(Node::LineBreak);
                }
                push_run(&mut children, line, code);
            }
            state.finish_leaf(blocks, children);
        }

        // Lists
        Event::Start(Tag::List(first_number)) => {
            // Text before a nested list belongs to the enclosing item
            state.flush_pending();
            state.list_stack.push(ListBuilder::new(first_number));
        }
        Event::End(TagEnd::List(_)) => {
            if let Some(builder) = state.list_stack.pop() {
                let list = builder.build();
                if let Some(parent) = state.list_stack.last_mut() {
                    if !parent.content.is_empty() {
                        parent.flush_item();
                    }
                    parent.items.push(ListItem::nested(list));
                    parent.flushed = true;
                } else if state.quote_depth > 0 {
                    flatten_list(list, &mut state.quoted);
                } else {
                    blocks.push(list.into());
                }
            }
        }

        Event::Start(Tag::Item) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.content.clear();
                list.checked = None;
                list.flushed = false;
            }
        }
        Event::End(TagEnd::Item) => {
            let remaining = std::mem::take(&mut state.inline);
            if let Some(list) = state.list_stack.last_mut() {
                list.append(remaining);
                if !list.content.is_empty() || !list.flushed {
                    list.flush_item();
                }
            }
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            if let Some(list) = state.list_stack.last_mut() {
                list.task = true;
                list.checked = Some(checked);
            }
        }

        Event::Start(Tag::Table(_)) => {
            state.in_table = true;
        }

        Event::Rule => {
            tracing::debug!("Skipped markdown rule");
        }
        Event::Html(_) | Event::InlineHtml(_) => {
            tracing::debug!("Skipped raw HTML");
        }

        // Soft/hard breaks
        Event::SoftBreak => {
            state.push_text(" ");
        }
        Event::HardBreak => {
            state.inline.push(Node::LineBreak);
        }

        // Ignore other events
        _ => {}
    }
}

fn heading_level_to_tag(level: HeadingLevel) -> HeadingTag {
    match level {
        HeadingLevel::H1 => HeadingTag::H1,
        HeadingLevel::H2 => HeadingTag::H2,
        HeadingLevel::H3 => HeadingTag::H3,
        HeadingLevel::H4 => HeadingTag::H4,
        HeadingLevel::H5 => HeadingTag::H5,
        HeadingLevel::H6 => HeadingTag::H6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(markdown: &str) -> Vec<Node> {
        from_markdown(markdown).unwrap().root().children.clone()
    }

    fn text(text: &str) -> Node {
        Text::plain(text).into()
    }

    #[test]
    fn frontmatter_is_stripped() {
        assert_eq!(strip_frontmatter("---\ntitle: x\n---\n\n# Hi"), "# Hi");
        assert_eq!(strip_frontmatter("# Hi"), "# Hi");
    }

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(
            import("## Title\n\nfirst\nsecond"),
            vec![
                Heading::new(HeadingTag::H2, vec![text("Title")]).into(),
                Paragraph::new(vec![text("first second")]).into(),
            ]
        );
    }

    #[test]
    fn inline_formats_merge_into_runs() {
        let bold = TextFormat::empty().with(TextStyle::Bold);
        let bold_italic = bold.with(TextStyle::Italic);
        assert_eq!(
            import("a **b *c*** ~~d~~ `e`"),
            vec![
                Paragraph::new(vec![
                    text("a "),
                    Text::new("b ", bold).into(),
                    Text::new("c", bold_italic).into(),
                    text(" "),
                    Text::new("d", TextFormat::empty().with(TextStyle::Strikethrough)).into(),
                    text(" "),
                    Text::new("e", TextFormat::empty().with(TextStyle::Code)).into(),
                ])
                .into()
            ]
        );
    }

    #[test]
    fn links_and_hard_breaks() {
        let mut link = Link::new("https://e.com", vec![text("site")]);
        link.title = Some("T".to_string());
        assert_eq!(
            import("one  \ntwo [site](https://e.com \"T\")"),
            vec![
                Paragraph::new(vec![text("one"), Node::LineBreak, text("two "), link.into()])
                    .into()
            ]
        );
    }

    #[test]
    fn nested_and_task_lists() {
        let nested = List::build(ListType::Bullet, 1, vec![ListItem::new(vec![text("b")])]);
        let outer = List::build(
            ListType::Number,
            3,
            vec![ListItem::new(vec![text("a")]), ListItem::nested(nested)],
        );
        assert_eq!(import("3. a\n   - b"), vec![outer.into()]);

        let tasks = List::build(
            ListType::Check,
            1,
            vec![
                ListItem::new(vec![text("done")]).with_checked(true),
                ListItem::new(vec![text("todo")]).with_checked(false),
            ],
        );
        assert_eq!(import("- [x] done\n- [ ] todo"), vec![tasks.into()]);
    }

    #[test]
    fn quotes() {
        assert_eq!(
            import("> quoted"),
            vec![Quote::new(vec![text("quoted")]).into()]
        );
        assert_eq!(
            import("> one\n>\n> two"),
            vec![
                Quote::new(vec![
                    Paragraph::new(vec![text("one")]).into(),
                    Paragraph::new(vec![text("two")]).into(),
                ])
                .into()
            ]
        );
    }

    #[test]
    fn code_block_becomes_code_runs() {
        let code = TextFormat::empty().with(TextStyle::Code);
        assert_eq!(
            import("```rust\nlet x = 1;\nx\n```"),
            vec![
                Paragraph::new(vec![
                    Text::new("let x = 1;", code).into(),
                    Node::LineBreak,
                    Text::new("x", code).into(),
                ])
                .into()
            ]
        );
    }

    #[test]
    fn tight_item_text_comes_before_nested_blocks() {
        let code = TextFormat::empty().with(TextStyle::Code);
        let with_code = List::build(
            ListType::Bullet,
            1,
            vec![ListItem::new(vec![
                text("a"),
                Node::LineBreak,
                Text::new("code", code).into(),
            ])],
        );
        assert_eq!(import("- a\n  ```\n  code\n  ```"), vec![with_code.into()]);

        let with_quote = List::build(
            ListType::Bullet,
            1,
            vec![ListItem::new(vec![text("a"), Node::LineBreak, text("b")])],
        );
        assert_eq!(import("- a\n  > b"), vec![with_quote.into()]);
    }

    #[test]
    fn tables_and_rules_are_skipped() {
        assert_eq!(
            import("before\n\n| A | B |\n|---|---|\n| 1 | 2 |\n\n---\n\nafter"),
            vec![
                Paragraph::new(vec![text("before")]).into(),
                Paragraph::new(vec![text("after")]).into(),
            ]
        );
    }
}
