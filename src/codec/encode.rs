use serde::ser::{Serialize, SerializeMap, Serializer};

use super::SCHEMA_VERSION;
use crate::error::EncodeError;
use crate::node::{EditorState, ElementAttrs, Node, NodeKind, Root, TextDetail, TextFormat, TextMode};

/// Serialize an editor state to compact JSON.
///
/// Field order is fixed, so the same state always yields the same bytes.
pub fn encode(state: &EditorState) -> Result<String, EncodeError> {
    let json = serde_json::to_string(state)?;
    tracing::debug!(bytes = json.len(), "Encoded editor state");
    Ok(json)
}

/// Like [`encode`], indented for people to read.
pub fn encode_pretty(state: &EditorState) -> Result<String, EncodeError> {
    Ok(serde_json::to_string_pretty(state)?)
}

impl Serialize for EditorState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("root", &RootJson(self.root()))?;
        map.end()
    }
}

struct RootJson<'a>(&'a Root);

impl Serialize for RootJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        element(&mut map, NodeKind::Root, &self.0.attrs, &self.0.children)?;
        map.end()
    }
}

struct NodeJson<'a>(&'a Node);

struct ChildrenJson<'a>(&'a [Node]);

impl Serialize for ChildrenJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(NodeJson))
    }
}

/// Shared element fields: `children, direction, format, indent, type, version`.
fn element<M: SerializeMap>(
    map: &mut M,
    kind: NodeKind,
    attrs: &ElementAttrs,
    children: &[Node],
) -> Result<(), M::Error> {
    map.serialize_entry("children", &ChildrenJson(children))?;
    map.serialize_entry("direction", &attrs.direction.map(|d| d.as_str()))?;
    map.serialize_entry("format", attrs.format.as_str())?;
    map.serialize_entry("indent", &attrs.indent)?;
    map.serialize_entry("type", kind.as_str())?;
    map.serialize_entry("version", &SCHEMA_VERSION)
}

/// Shared leaf fields: `detail, format, mode, style, text, type, version`.
fn leaf<M: SerializeMap>(
    map: &mut M,
    kind: NodeKind,
    detail: TextDetail,
    format: TextFormat,
    mode: TextMode,
    style: &str,
    text: &str,
) -> Result<(), M::Error> {
    map.serialize_entry("detail", &detail.bits())?;
    map.serialize_entry("format", &format.bits())?;
    map.serialize_entry("mode", mode.as_str())?;
    map.serialize_entry("style", style)?;
    map.serialize_entry("text", text)?;
    map.serialize_entry("type", kind.as_str())?;
    map.serialize_entry("version", &SCHEMA_VERSION)
}

impl Serialize for NodeJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let kind = node.kind();
        let mut map = serializer.serialize_map(None)?;
        match node {
            Node::Heading(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
                map.serialize_entry("tag", n.tag.as_str())?;
            }
            Node::Quote(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
            }
            Node::Paragraph(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
                map.serialize_entry("textFormat", &n.text_format.bits())?;
            }
            Node::List(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
                map.serialize_entry("listType", n.list_type.as_str())?;
                map.serialize_entry("start", &n.start)?;
                map.serialize_entry("tag", n.tag.as_str())?;
            }
            Node::ListItem(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
                map.serialize_entry("value", &n.value)?;
                if let Some(checked) = n.checked {
                    map.serialize_entry("checked", &checked)?;
                }
            }
            Node::Link(n) => {
                element(&mut map, kind, &n.attrs, &n.children)?;
                map.serialize_entry("rel", &n.rel)?;
                map.serialize_entry("target", &n.target)?;
                map.serialize_entry("title", &n.title)?;
                map.serialize_entry("url", &n.url)?;
            }
            Node::Text(n) => {
                leaf(&mut map, kind, n.detail, n.format, n.mode, &n.style, &n.text)?;
            }
            Node::Tab(n) => {
                leaf(&mut map, kind, n.detail, n.format, n.mode, &n.style, "\t")?;
            }
            Node::LineBreak => {
                map.serialize_entry("type", kind.as_str())?;
                map.serialize_entry("version", &SCHEMA_VERSION)?;
            }
        }
        map.end()
    }
}
