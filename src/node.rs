//! The document tree: a root, block elements, inline elements and text leaves.
//!
//! Nodes are plain values. A tree only becomes an [`EditorState`] after it has
//! been validated, and from then on it is shared read-only behind an `Arc`.
//! Edits build a new [`Root`] and wrap it in a new state.

use std::fmt;
use std::sync::Arc;

use crate::error::DocumentError;
use crate::traverse::{Traverse, Walk};
use crate::validate;

/// Closed vocabularies that travel as strings on the wire.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident {
        $($(#[$variant_meta:meta])* $variant:ident => $wire:literal),+ $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn from_wire(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Node type discriminator, one per wire `type` string
    NodeKind {
        Root => "root",
        Heading => "heading",
        Quote => "quote",
        Paragraph => "paragraph",
        List => "list",
        ListItem => "listitem",
        Link => "link",
        Text => "text",
        Tab => "tab",
        LineBreak => "linebreak",
    }
);

impl NodeKind {
    /// Kinds that may sit directly under the root.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeKind::Heading | NodeKind::Quote | NodeKind::Paragraph | NodeKind::List
        )
    }

    /// Kinds that may appear inside a paragraph-like block.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeKind::Text | NodeKind::Tab | NodeKind::LineBreak | NodeKind::Link
        )
    }
}

wire_enum!(Direction { Ltr => "ltr", Rtl => "rtl" });

wire_enum!(
    /// Block alignment
    #[derive(Default)]
    ElementFormat {
        #[default]
        None => "",
        Left => "left",
        Start => "start",
        Center => "center",
        Right => "right",
        End => "end",
        Justify => "justify",
    }
);

impl ElementFormat {
    /// Older documents store alignment as a small integer.
    pub(crate) fn from_legacy(value: u64) -> Option<Self> {
        Some(match value {
            0 => ElementFormat::None,
            1 => ElementFormat::Left,
            2 => ElementFormat::Center,
            3 => ElementFormat::Right,
            4 => ElementFormat::Justify,
            5 => ElementFormat::Start,
            6 => ElementFormat::End,
            _ => return None,
        })
    }
}

wire_enum!(HeadingTag { H1 => "h1", H2 => "h2", H3 => "h3", H4 => "h4", H5 => "h5", H6 => "h6" });

impl HeadingTag {
    pub fn level(self) -> u8 {
        match self {
            HeadingTag::H1 => 1,
            HeadingTag::H2 => 2,
            HeadingTag::H3 => 3,
            HeadingTag::H4 => 4,
            HeadingTag::H5 => 5,
            HeadingTag::H6 => 6,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        HeadingTag::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }
}

wire_enum!(ListType { Bullet => "bullet", Number => "number", Check => "check" });

impl ListType {
    pub fn is_ordered(self) -> bool {
        self == ListType::Number
    }

    /// The rendering hint written next to the list type.
    pub fn default_tag(self) -> ListTag {
        if self.is_ordered() {
            ListTag::Ol
        } else {
            ListTag::Ul
        }
    }
}

wire_enum!(ListTag { Ul => "ul", Ol => "ol" });

wire_enum!(
    #[derive(Default)]
    TextMode {
        #[default]
        Normal => "normal",
        Token => "token",
        Segmented => "segmented",
    }
);

/// One character-level style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Bold,
    Italic,
    Strikethrough,
    Underline,
    Code,
    Subscript,
    Superscript,
    Highlight,
}

impl TextStyle {
    /// All styles, lowest bit first. Renderers nest wrappers in this order.
    pub const ALL: [TextStyle; 8] = [
        TextStyle::Bold,
        TextStyle::Italic,
        TextStyle::Strikethrough,
        TextStyle::Underline,
        TextStyle::Code,
        TextStyle::Subscript,
        TextStyle::Superscript,
        TextStyle::Highlight,
    ];

    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// The set of styles applied to one text run.
///
/// Bits outside the named styles are carried along untouched so documents
/// written by newer editors survive a decode/encode cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextFormat(u32);

impl TextFormat {
    pub const fn empty() -> Self {
        TextFormat(0)
    }

    pub fn with(self, style: TextStyle) -> Self {
        TextFormat(self.0 | style.bit())
    }

    pub fn without(self, style: TextStyle) -> Self {
        TextFormat(self.0 & !style.bit())
    }

    pub fn contains(self, style: TextStyle) -> bool {
        self.0 & style.bit() != 0
    }

    pub fn union(self, other: TextFormat) -> Self {
        TextFormat(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_bold(self) -> bool {
        self.contains(TextStyle::Bold)
    }

    pub fn is_italic(self) -> bool {
        self.contains(TextStyle::Italic)
    }

    pub fn is_code(self) -> bool {
        self.contains(TextStyle::Code)
    }

    /// Named styles present in this set, lowest bit first.
    pub fn styles(self) -> impl Iterator<Item = TextStyle> {
        TextStyle::ALL.into_iter().filter(move |s| self.contains(*s))
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        TextFormat(bits)
    }

    pub(crate) fn bits(self) -> u32 {
        self.0
    }
}

impl FromIterator<TextStyle> for TextFormat {
    fn from_iter<I: IntoIterator<Item = TextStyle>>(iter: I) -> Self {
        iter.into_iter().fold(TextFormat::empty(), TextFormat::with)
    }
}

/// Auxiliary flags on text leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextDetail(u32);

impl TextDetail {
    const DIRECTIONLESS: u32 = 1;
    const UNMERGEABLE: u32 = 1 << 1;

    pub fn is_directionless(self) -> bool {
        self.0 & Self::DIRECTIONLESS != 0
    }

    pub fn is_unmergeable(self) -> bool {
        self.0 & Self::UNMERGEABLE != 0
    }

    pub fn with_directionless(self) -> Self {
        TextDetail(self.0 | Self::DIRECTIONLESS)
    }

    pub fn with_unmergeable(self) -> Self {
        TextDetail(self.0 | Self::UNMERGEABLE)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        TextDetail(bits)
    }

    pub(crate) fn bits(self) -> u32 {
        self.0
    }
}

/// Attributes shared by every element node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementAttrs {
    pub direction: Option<Direction>,
    pub format: ElementFormat,
    /// List nesting level, not tree depth
    pub indent: u32,
}

impl ElementAttrs {
    pub fn ltr() -> Self {
        Self {
            direction: Some(Direction::Ltr),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Root {
    pub attrs: ElementAttrs,
    pub children: Vec<Node>,
}

impl Root {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub attrs: ElementAttrs,
    pub tag: HeadingTag,
    pub children: Vec<Node>,
}

impl Heading {
    pub fn new(tag: HeadingTag, children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            tag,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub attrs: ElementAttrs,
    pub children: Vec<Node>,
}

impl Quote {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub attrs: ElementAttrs,
    /// Format applied to text typed at the start of an empty paragraph
    pub text_format: TextFormat,
    pub children: Vec<Node>,
}

impl Paragraph {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            text_format: TextFormat::empty(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub attrs: ElementAttrs,
    pub list_type: ListType,
    pub start: u32,
    pub tag: ListTag,
    pub children: Vec<Node>,
}

impl List {
    /// Build a list from its items, numbering them from `start` and setting
    /// every item's indent (nested lists included) to its nesting level.
    pub fn build(list_type: ListType, start: u32, items: Vec<ListItem>) -> Self {
        let start = start.max(1);
        let children = items
            .into_iter()
            .enumerate()
            .map(|(index, mut item)| {
                // Ordinals past u32::MAX saturate; validation rejects the repeat
                item.value = u32::try_from(index)
                    .ok()
                    .and_then(|offset| start.checked_add(offset))
                    .unwrap_or(u32::MAX);
                if list_type != ListType::Check {
                    item.checked = None;
                }
                Node::ListItem(item)
            })
            .collect();

        let mut list = Self {
            attrs: ElementAttrs::default(),
            list_type,
            start,
            tag: list_type.default_tag(),
            children,
        };
        list.set_level(0);
        list
    }

    fn set_level(&mut self, level: u32) {
        for child in &mut self.children {
            if let Node::ListItem(item) = child {
                item.attrs.indent = level;
                for grandchild in &mut item.children {
                    if let Node::List(nested) = grandchild {
                        nested.set_level(level + 1);
                    }
                }
            }
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &ListItem> {
        self.children.iter().filter_map(|child| match child {
            Node::ListItem(item) => Some(item),
            _ => None,
        })
    }
}

/// A single list item: inline content, or exactly one nested list
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub attrs: ElementAttrs,
    /// Ordinal within the parent list
    pub value: u32,
    /// For check lists: None = unset, Some(false) = unchecked, Some(true) = checked
    pub checked: Option<bool>,
    pub children: Vec<Node>,
}

impl ListItem {
    /// An item with inline content. Its value is assigned by [`List::build`].
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            value: 1,
            checked: None,
            children,
        }
    }

    /// The wrapper item that carries a nested list.
    pub fn nested(list: List) -> Self {
        Self::new(vec![Node::List(list)])
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    /// The nested list, when this item is a wrapper.
    pub fn nested_list(&self) -> Option<&List> {
        match self.children.as_slice() {
            [Node::List(list)] => Some(list),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub attrs: ElementAttrs,
    pub url: String,
    pub rel: Option<String>,
    pub target: Option<String>,
    pub title: Option<String>,
    pub children: Vec<Node>,
}

impl Link {
    pub fn new(url: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            attrs: ElementAttrs::default(),
            url: url.into(),
            rel: None,
            target: None,
            title: None,
            children,
        }
    }
}

/// One maximal run of uniformly formatted text
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub format: TextFormat,
    pub mode: TextMode,
    /// Inline CSS-like declarations, e.g. `color: #f5a623;`
    pub style: String,
    pub detail: TextDetail,
}

impl Text {
    pub fn new(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            text: text.into(),
            format,
            mode: TextMode::Normal,
            style: String::new(),
            detail: TextDetail::default(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextFormat::empty())
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Whether this run may absorb a neighbouring run with the same styling.
    pub fn is_simple(&self) -> bool {
        self.mode == TextMode::Normal && self.detail.is_empty()
    }

    pub(crate) fn can_merge_with(&self, other: &Text) -> bool {
        self.is_simple()
            && other.is_simple()
            && self.format == other.format
            && self.style == other.style
    }
}

/// A literal tab stop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tab {
    pub format: TextFormat,
    pub mode: TextMode,
    pub style: String,
    pub detail: TextDetail,
}

impl Tab {
    pub fn new() -> Self {
        Self {
            detail: TextDetail::default().with_unmergeable(),
            ..Self::default()
        }
    }
}

/// Every node that can appear below the root
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Heading(Heading),
    Quote(Quote),
    Paragraph(Paragraph),
    List(List),
    ListItem(ListItem),
    Link(Link),
    Text(Text),
    Tab(Tab),
    LineBreak,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Heading(_) => NodeKind::Heading,
            Node::Quote(_) => NodeKind::Quote,
            Node::Paragraph(_) => NodeKind::Paragraph,
            Node::List(_) => NodeKind::List,
            Node::ListItem(_) => NodeKind::ListItem,
            Node::Link(_) => NodeKind::Link,
            Node::Text(_) => NodeKind::Text,
            Node::Tab(_) => NodeKind::Tab,
            Node::LineBreak => NodeKind::LineBreak,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Heading(n) => &n.children,
            Node::Quote(n) => &n.children,
            Node::Paragraph(n) => &n.children,
            Node::List(n) => &n.children,
            Node::ListItem(n) => &n.children,
            Node::Link(n) => &n.children,
            Node::Text(_) | Node::Tab(_) | Node::LineBreak => &[],
        }
    }

    /// Blocks rendered as their own line of text: headings, paragraphs, and
    /// quotes or list items that hold inline content directly.
    pub fn is_line_block(&self) -> bool {
        match self {
            Node::Heading(_) | Node::Paragraph(_) => true,
            Node::Quote(n) => !n.children.iter().any(|c| c.kind() == NodeKind::Paragraph),
            Node::ListItem(n) => n.nested_list().is_none(),
            _ => false,
        }
    }

    /// Element attributes; `None` for leaves.
    pub fn attrs(&self) -> Option<&ElementAttrs> {
        match self {
            Node::Heading(n) => Some(&n.attrs),
            Node::Quote(n) => Some(&n.attrs),
            Node::Paragraph(n) => Some(&n.attrs),
            Node::List(n) => Some(&n.attrs),
            Node::ListItem(n) => Some(&n.attrs),
            Node::Link(n) => Some(&n.attrs),
            Node::Text(_) | Node::Tab(_) | Node::LineBreak => None,
        }
    }
}

macro_rules! impl_from_node {
    ($($variant:ident),+) => {
        $(
            impl From<$variant> for Node {
                fn from(node: $variant) -> Self {
                    Node::$variant(node)
                }
            }
        )+
    };
}

impl_from_node!(Heading, Quote, Paragraph, List, ListItem, Link, Text, Tab);

/// A borrowed node of any kind, the root included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Root(&'a Root),
    Node(&'a Node),
}

impl<'a> NodeRef<'a> {
    pub fn kind(self) -> NodeKind {
        match self {
            NodeRef::Root(_) => NodeKind::Root,
            NodeRef::Node(node) => node.kind(),
        }
    }

    pub fn children(self) -> &'a [Node] {
        match self {
            NodeRef::Root(root) => &root.children,
            NodeRef::Node(node) => node.children(),
        }
    }

    pub fn attrs(self) -> Option<&'a ElementAttrs> {
        match self {
            NodeRef::Root(root) => Some(&root.attrs),
            NodeRef::Node(node) => node.attrs(),
        }
    }

    pub fn as_node(self) -> Option<&'a Node> {
        match self {
            NodeRef::Root(_) => None,
            NodeRef::Node(node) => Some(node),
        }
    }
}

/// One immutable, validated snapshot of the document.
///
/// Cloning is cheap and clones share the tree, so a snapshot can be handed to
/// an exporter or a store while the editor moves on to the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    root: Arc<Root>,
}

impl EditorState {
    /// Validate `root` and freeze it into a snapshot.
    pub fn new(root: Root) -> Result<Self, DocumentError> {
        validate::validate(&root)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// The tree as an owned value, for building the next snapshot.
    pub fn to_root(&self) -> Root {
        Root::clone(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Depth-first, pre-order iteration over every node.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse::new(&self.root)
    }

    /// Enter/leave events for every node, in document order.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.root)
    }

    /// All text in document order, blocks separated by newlines.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in self.traverse() {
            match node.as_node() {
                Some(Node::Text(text)) => out.push_str(&text.text),
                Some(Node::Tab(_)) => out.push('\t'),
                Some(Node::LineBreak) => out.push('\n'),
                Some(node) if node.is_line_block() && !out.is_empty() => out.push('\n'),
                _ => {}
            }
        }
        out
    }
}
