//! Rendering editor states into other formats.
//!
//! A [`Converter`] is a fold over the tree: the pipeline walks the snapshot in
//! document order and calls one hook per node on the way in and on the way
//! out. Any hook a converter does not override fails with
//! [`ExportError::UnsupportedNode`], so nothing is ever skipped silently.

mod html;
mod json;
mod markdown;
mod text;
mod typst;

pub use html::HtmlConverter;
pub use json::JsonConverter;
pub use markdown::MarkdownConverter;
pub use text::PlainTextConverter;
pub use typst::TypstConverter;

use std::collections::HashMap;

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::node::{
    EditorState, Heading, Link, List, ListItem, Node, NodeKind, NodeRef, Paragraph, Quote, Root,
    Tab, Text,
};
use crate::traverse::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ExportFormat {
    Html,
    Markdown,
    PlainText,
    Json,
    Typst,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Html,
        ExportFormat::Markdown,
        ExportFormat::PlainText,
        ExportFormat::Json,
        ExportFormat::Typst,
    ];

    /// Display title, as shown in an "Export as…" menu.
    pub fn title(self) -> &'static str {
        match self {
            ExportFormat::Html => "HTML",
            ExportFormat::Markdown => "Markdown",
            ExportFormat::PlainText => "Plain Text",
            ExportFormat::Json => "JSON",
            ExportFormat::Typst => "Typst",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "md",
            ExportFormat::PlainText => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Typst => "typ",
        }
    }
}

/// Whether a hook runs before or after the node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Leave,
}

/// Where the walk currently is: the chain of open ancestors.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    ancestors: &'a [NodeRef<'a>],
}

impl<'a> Context<'a> {
    pub fn ancestors(&self) -> &'a [NodeRef<'a>] {
        self.ancestors
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.ancestors.last().copied()
    }

    /// The closest enclosing list, if any.
    pub fn parent_list(&self) -> Option<&'a List> {
        self.ancestors.iter().rev().find_map(|a| match a {
            NodeRef::Node(Node::List(list)) => Some(list),
            _ => None,
        })
    }

    /// True for blocks sitting directly under the root.
    pub fn is_top_level(&self) -> bool {
        self.ancestors.len() == 1
    }

    pub fn inside(&self, kind: NodeKind) -> bool {
        self.ancestors.iter().any(|a| a.kind() == kind)
    }
}

fn unsupported(kind: NodeKind) -> Result<(), ExportError> {
    Err(ExportError::UnsupportedNode(kind))
}

pub trait Converter {
    /// Take the rendered output once the walk is over.
    fn finish(&mut self) -> String;

    /// Render a whole snapshot. Converters that are not folds override this.
    fn convert(&mut self, state: &EditorState) -> Result<String, ExportError> {
        let mut walk = state.walk();
        while let Some(event) = walk.next() {
            let (node, phase) = match event {
                Event::Enter(node) => (node, Phase::Enter),
                Event::Leave(node) => (node, Phase::Leave),
            };
            let cx = Context {
                ancestors: walk.ancestors(),
            };
            dispatch(self, node, phase, &cx)?;
        }
        Ok(self.finish())
    }

    fn root(&mut self, _node: &Root, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        Ok(())
    }

    fn heading(&mut self, _node: &Heading, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Heading)
    }

    fn quote(&mut self, _node: &Quote, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Quote)
    }

    fn paragraph(&mut self, _node: &Paragraph, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Paragraph)
    }

    fn list(&mut self, _node: &List, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::List)
    }

    fn list_item(&mut self, _node: &ListItem, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::ListItem)
    }

    fn link(&mut self, _node: &Link, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Link)
    }

    fn text(&mut self, _node: &Text, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Text)
    }

    fn tab(&mut self, _node: &Tab, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::Tab)
    }

    fn line_break(&mut self, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        unsupported(NodeKind::LineBreak)
    }
}

fn dispatch<C: Converter + ?Sized>(
    converter: &mut C,
    node: NodeRef<'_>,
    phase: Phase,
    cx: &Context<'_>,
) -> Result<(), ExportError> {
    let node = match node {
        NodeRef::Root(root) => return converter.root(root, phase, cx),
        NodeRef::Node(node) => node,
    };
    match node {
        Node::Heading(n) => converter.heading(n, phase, cx),
        Node::Quote(n) => converter.quote(n, phase, cx),
        Node::Paragraph(n) => converter.paragraph(n, phase, cx),
        Node::List(n) => converter.list(n, phase, cx),
        Node::ListItem(n) => converter.list_item(n, phase, cx),
        Node::Link(n) => converter.link(n, phase, cx),
        Node::Text(n) => converter.text(n, phase, cx),
        Node::Tab(n) => converter.tab(n, phase, cx),
        Node::LineBreak => converter.line_break(phase, cx),
    }
}

/// Builds a fresh converter for each export request.
pub type ConverterFactory = Box<dyn Fn() -> Box<dyn Converter> + Send + Sync>;

/// Registry of converters keyed by format.
pub struct Exporter {
    converters: HashMap<ExportFormat, ConverterFactory>,
}

impl Exporter {
    /// A registry holding every built-in converter.
    pub fn new(config: &ExportConfig) -> Self {
        let mut exporter = Self::empty();

        let html = config.html.clone();
        exporter.register(ExportFormat::Html, move || Box::new(HtmlConverter::new(&html)));
        let markdown = config.markdown.clone();
        exporter.register(ExportFormat::Markdown, move || {
            Box::new(MarkdownConverter::new(&markdown))
        });
        exporter.register(ExportFormat::PlainText, || Box::new(PlainTextConverter::new()));
        exporter.register(ExportFormat::Json, || Box::new(JsonConverter));
        let typst = config.typst.clone();
        exporter.register(ExportFormat::Typst, move || Box::new(TypstConverter::new(&typst)));

        exporter
    }

    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Add a converter for `format`, replacing any earlier one.
    pub fn register<F>(&mut self, format: ExportFormat, factory: F)
    where
        F: Fn() -> Box<dyn Converter> + Send + Sync + 'static,
    {
        self.converters.insert(format, Box::new(factory));
    }

    /// Registered formats, in menu order.
    pub fn formats(&self) -> impl Iterator<Item = ExportFormat> + '_ {
        ExportFormat::ALL
            .into_iter()
            .filter(|f| self.converters.contains_key(f))
    }

    pub fn export(&self, state: &EditorState, format: ExportFormat) -> Result<String, ExportError> {
        let factory = self
            .converters
            .get(&format)
            .ok_or(ExportError::Unregistered(format))?;
        let output = factory().convert(state).inspect_err(|e| {
            tracing::error!(format = format.title(), error = %e, "Export failed");
        })?;
        tracing::debug!(format = format.title(), bytes = output.len(), "Exported editor state");
        Ok(output)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(&ExportConfig::default())
    }
}

/// Export with the default settings.
pub fn export(state: &EditorState, format: ExportFormat) -> Result<String, ExportError> {
    Exporter::default().export(state, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{HeadingTag, Paragraph, Root};

    /// Knows paragraphs and text, nothing else.
    #[derive(Default)]
    struct Shouty {
        out: String,
    }

    impl Converter for Shouty {
        fn finish(&mut self) -> String {
            std::mem::take(&mut self.out)
        }

        fn paragraph(&mut self, _node: &Paragraph, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
            if phase == Phase::Leave {
                self.out.push('\n');
            }
            Ok(())
        }

        fn text(&mut self, node: &Text, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
            if phase == Phase::Enter {
                self.out.push_str(&node.text.to_uppercase());
            }
            Ok(())
        }
    }

    fn state(children: Vec<Node>) -> EditorState {
        EditorState::new(Root::new(children)).unwrap()
    }

    #[test]
    fn custom_converter_replaces_builtin() {
        let mut exporter = Exporter::default();
        exporter.register(ExportFormat::PlainText, || Box::new(Shouty::default()));
        let doc = state(vec![Paragraph::new(vec![Text::plain("hey").into()]).into()]);
        assert_eq!(exporter.export(&doc, ExportFormat::PlainText).unwrap(), "HEY\n");
    }

    #[test]
    fn missing_hook_is_an_error() {
        let mut exporter = Exporter::empty();
        exporter.register(ExportFormat::Html, || Box::new(Shouty::default()));
        let doc = state(vec![
            Heading::new(HeadingTag::H2, vec![Text::plain("t").into()]).into(),
        ]);
        assert!(matches!(
            exporter.export(&doc, ExportFormat::Html),
            Err(ExportError::UnsupportedNode(NodeKind::Heading))
        ));
    }

    #[test]
    fn unregistered_format() {
        let exporter = Exporter::empty();
        assert!(matches!(
            exporter.export(&EditorState::default(), ExportFormat::Markdown),
            Err(ExportError::Unregistered(ExportFormat::Markdown))
        ));
        assert_eq!(exporter.formats().count(), 0);
    }

    #[test]
    fn default_registry_covers_every_format() {
        let formats: Vec<_> = Exporter::default().formats().collect();
        assert_eq!(formats, ExportFormat::ALL.to_vec());
        let titles: Vec<_> = formats.iter().map(|f| f.title()).collect();
        assert_eq!(titles, ["HTML", "Markdown", "Plain Text", "JSON", "Typst"]);
    }
}
