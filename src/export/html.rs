use std::fmt::Write;

use super::{Context, Converter, Phase};
use crate::config::HtmlConfig;
use crate::error::ExportError;
use crate::node::{
    ElementAttrs, ElementFormat, Heading, Link, List, ListItem, ListType, Paragraph, Quote, Tab,
    Text, TextStyle,
};

/// Renders an HTML fragment, blocks back to back with no separators.
pub struct HtmlConverter {
    out: String,
    indent_size: u32,
}

impl HtmlConverter {
    pub fn new(config: &HtmlConfig) -> Self {
        Self {
            out: String::new(),
            indent_size: config.indent_size,
        }
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, String)]) {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            let _ = write!(self.out, " {name}=\"");
            escape_html(value, &mut self.out);
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn close(&mut self, tag: &str) {
        let _ = write!(self.out, "</{tag}>");
    }

    /// `dir` and `style` for a block; `indent` becomes padding when `padded`.
    fn block_attrs(&self, attrs: &ElementAttrs, padded: bool) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(direction) = attrs.direction {
            out.push(("dir", direction.as_str().to_string()));
        }
        let mut style = String::new();
        if attrs.format != ElementFormat::None {
            let _ = write!(style, "text-align: {};", attrs.format.as_str());
        }
        if padded && attrs.indent > 0 {
            if !style.is_empty() {
                style.push(' ');
            }
            let _ = write!(
                style,
                "padding-inline-start: calc({} * {}px);",
                attrs.indent, self.indent_size
            );
        }
        if !style.is_empty() {
            out.push(("style", style));
        }
        out
    }

    fn element(&mut self, tag: &str, attrs: &ElementAttrs, padded: bool, phase: Phase) {
        match phase {
            Phase::Enter => {
                let attrs = self.block_attrs(attrs, padded);
                self.open(tag, &attrs);
            }
            Phase::Leave => self.close(tag),
        }
    }
}

fn style_tag(style: TextStyle) -> &'static str {
    match style {
        TextStyle::Bold => "strong",
        TextStyle::Italic => "em",
        TextStyle::Strikethrough => "s",
        TextStyle::Underline => "u",
        TextStyle::Code => "code",
        TextStyle::Subscript => "sub",
        TextStyle::Superscript => "sup",
        TextStyle::Highlight => "mark",
    }
}

fn escape_html(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

impl Converter for HtmlConverter {
    fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }

    fn heading(&mut self, node: &Heading, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        let tag = node.tag.as_str();
        self.element(tag, &node.attrs, true, phase);
        Ok(())
    }

    fn quote(&mut self, node: &Quote, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        self.element("blockquote", &node.attrs, false, phase);
        Ok(())
    }

    fn paragraph(&mut self, node: &Paragraph, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        self.element("p", &node.attrs, true, phase);
        Ok(())
    }

    fn list(&mut self, node: &List, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        let tag = if node.list_type.is_ordered() { "ol" } else { "ul" };
        match phase {
            Phase::Enter => {
                let mut attrs = self.block_attrs(&node.attrs, false);
                if node.list_type.is_ordered() && node.start != 1 {
                    attrs.push(("start", node.start.to_string()));
                }
                self.open(tag, &attrs);
            }
            Phase::Leave => self.close(tag),
        }
        Ok(())
    }

    fn list_item(&mut self, node: &ListItem, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        match phase {
            Phase::Enter => {
                let mut attrs = self.block_attrs(&node.attrs, false);
                let list_type = cx.parent_list().map(|l| l.list_type);
                if node.nested_list().is_none() {
                    match list_type {
                        Some(ListType::Number) => attrs.push(("value", node.value.to_string())),
                        Some(ListType::Check) => {
                            attrs.push(("role", "checkbox".to_string()));
                            let checked = node.checked.unwrap_or(false);
                            attrs.push(("aria-checked", checked.to_string()));
                        }
                        _ => {}
                    }
                }
                self.open("li", &attrs);
            }
            Phase::Leave => self.close("li"),
        }
        Ok(())
    }

    fn link(&mut self, node: &Link, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        match phase {
            Phase::Enter => {
                let mut attrs = vec![("href", node.url.clone())];
                if let Some(rel) = &node.rel {
                    attrs.push(("rel", rel.clone()));
                }
                if let Some(target) = &node.target {
                    attrs.push(("target", target.clone()));
                }
                if let Some(title) = &node.title {
                    attrs.push(("title", title.clone()));
                }
                self.open("a", &attrs);
            }
            Phase::Leave => self.close("a"),
        }
        Ok(())
    }

    fn text(&mut self, node: &Text, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            return Ok(());
        }
        // Lowest bit innermost: bold+italic renders as <em><strong>…</strong></em>
        let tags: Vec<&str> = node.format.styles().map(style_tag).collect();
        if !node.style.is_empty() {
            self.open("span", &[("style", node.style.clone())]);
        }
        for tag in tags.iter().rev() {
            self.open(tag, &[]);
        }
        escape_html(&node.text, &mut self.out);
        for tag in &tags {
            self.close(tag);
        }
        if !node.style.is_empty() {
            self.close("span");
        }
        Ok(())
    }

    fn tab(&mut self, _node: &Tab, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.out.push('\t');
        }
        Ok(())
    }

    fn line_break(&mut self, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.out.push_str("<br>");
        }
        Ok(())
    }
}
