use serde::de::{Deserialize, Deserializer, Error as _};
use serde_json::{Map, Value};

use super::SCHEMA_VERSION;
use crate::error::DocumentError;
use crate::node::{
    Direction, EditorState, ElementAttrs, ElementFormat, Heading, HeadingTag, Link, List,
    ListItem, ListTag, ListType, Node, NodeKind, Paragraph, Quote, Root, Tab, Text, TextDetail,
    TextFormat, TextMode,
};

type Result<T> = std::result::Result<T, DocumentError>;

/// Parse a JSON document into a validated editor state.
///
/// Either the whole document is accepted or nothing is: on error no partial
/// tree escapes.
pub fn decode(json: &str) -> Result<EditorState> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| DocumentError::malformed("$", e.to_string()))?;
    let state = decode_value(&value)?;
    tracing::debug!(bytes = json.len(), blocks = state.root().children.len(), "Decoded editor state");
    Ok(state)
}

/// Same as [`decode`] for an already parsed JSON value.
pub fn decode_value(value: &Value) -> Result<EditorState> {
    let document = value
        .as_object()
        .ok_or_else(|| DocumentError::malformed("$", "expected an object"))?;
    let root = document
        .get("root")
        .ok_or_else(|| DocumentError::malformed("root", "missing field"))?;
    let root = decode_root(root, "root")?;
    EditorState::new(root)
}

impl<'de> Deserialize<'de> for EditorState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode_value(&value).map_err(D::Error::custom)
    }
}

/// Typed access to one node object's fields.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    fn new(value: &'a Value, path: &'a str) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| DocumentError::malformed(path, "expected a node object"))?;
        Ok(Self { map, path })
    }

    fn error(&self, key: &str, reason: &str) -> DocumentError {
        DocumentError::malformed(format!("{}.{key}", self.path), reason)
    }

    /// Absent and `null` both read as `None`.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a string")),
        }
    }

    fn required_str(&self, key: &str) -> Result<&'a str> {
        self.str(key)?.ok_or_else(|| self.error(key, "missing field"))
    }

    fn u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a non-negative integer")),
        }
    }

    fn u32(&self, key: &str) -> Result<Option<u32>> {
        match self.u64(key)? {
            None => Ok(None),
            Some(n) => u32::try_from(n)
                .map(Some)
                .map_err(|_| self.error(key, "integer out of range")),
        }
    }

    fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.error(key, "expected a boolean")),
        }
    }

    fn vocab<T>(&self, key: &str, parse: fn(&str) -> Option<T>) -> Result<Option<T>> {
        match self.str(key)? {
            None => Ok(None),
            Some(s) => parse(s)
                .map(Some)
                .ok_or_else(|| self.error(key, &format!("unknown value {s:?}"))),
        }
    }

    fn version(&self) -> Result<()> {
        let version = self
            .u64("version")?
            .ok_or_else(|| self.error("version", "missing field"))?;
        if version > u64::from(SCHEMA_VERSION) {
            return Err(DocumentError::UnsupportedVersion {
                path: self.path.to_string(),
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        if version == 0 {
            return Err(self.error("version", "version must be at least 1"));
        }
        Ok(())
    }

    fn kind(&self) -> Result<NodeKind> {
        let tag = self.required_str("type")?;
        NodeKind::from_wire(tag)
            .ok_or_else(|| self.error("type", &format!("unknown node type {tag:?}")))
    }

    fn attrs(&self) -> Result<ElementAttrs> {
        let format = match self.get("format") {
            None => ElementFormat::None,
            Some(Value::String(s)) => ElementFormat::from_wire(s)
                .ok_or_else(|| self.error("format", &format!("unknown alignment {s:?}")))?,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(ElementFormat::from_legacy)
                .ok_or_else(|| self.error("format", &format!("unknown alignment {n}")))?,
            Some(_) => return Err(self.error("format", "expected a string")),
        };
        Ok(ElementAttrs {
            direction: self.vocab("direction", Direction::from_wire)?,
            format,
            indent: self.u32("indent")?.unwrap_or(0),
        })
    }

    fn text_format(&self, key: &str) -> Result<TextFormat> {
        Ok(TextFormat::from_bits(self.u32(key)?.unwrap_or(0)))
    }

    fn children(&self) -> Result<Vec<Node>> {
        let items = match self.get("children") {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(self.error("children", "expected an array")),
        };
        items
            .iter()
            .enumerate()
            .map(|(index, child)| decode_node(child, &format!("{}.children[{index}]", self.path)))
            .collect()
    }
}

fn decode_root(value: &Value, path: &str) -> Result<Root> {
    let fields = Fields::new(value, path)?;
    fields.version()?;
    if fields.kind()? != NodeKind::Root {
        return Err(fields.error("type", "the document must start with a root node"));
    }
    Ok(Root {
        attrs: fields.attrs()?,
        children: fields.children()?,
    })
}

fn decode_node(value: &Value, path: &str) -> Result<Node> {
    let fields = Fields::new(value, path)?;
    fields.version()?;

    let node = match fields.kind()? {
        NodeKind::Root => {
            return Err(fields.error("type", "root may only appear at the top of the document"));
        }
        NodeKind::Heading => Node::Heading(Heading {
            attrs: fields.attrs()?,
            tag: fields
                .vocab("tag", HeadingTag::from_wire)?
                .ok_or_else(|| fields.error("tag", "missing field"))?,
            children: fields.children()?,
        }),
        NodeKind::Quote => Node::Quote(Quote {
            attrs: fields.attrs()?,
            children: fields.children()?,
        }),
        NodeKind::Paragraph => Node::Paragraph(Paragraph {
            attrs: fields.attrs()?,
            text_format: fields.text_format("textFormat")?,
            children: fields.children()?,
        }),
        NodeKind::List => Node::List(decode_list(&fields)?),
        NodeKind::ListItem => {
            let value = fields.u32("value")?;
            if value == Some(0) {
                return Err(fields.error("value", "value must be at least 1"));
            }
            Node::ListItem(ListItem {
                attrs: fields.attrs()?,
                // 0 marks an absent value; the enclosing list fills it in
                value: value.unwrap_or(0),
                checked: fields.bool("checked")?,
                children: fields.children()?,
            })
        }
        NodeKind::Link => Node::Link(Link {
            attrs: fields.attrs()?,
            url: fields.required_str("url")?.to_string(),
            rel: fields.str("rel")?.map(str::to_string),
            target: fields.str("target")?.map(str::to_string),
            title: fields.str("title")?.map(str::to_string),
            children: fields.children()?,
        }),
        NodeKind::Text => Node::Text(Text {
            text: fields.required_str("text")?.to_string(),
            format: fields.text_format("format")?,
            mode: fields.vocab("mode", TextMode::from_wire)?.unwrap_or_default(),
            style: fields.str("style")?.unwrap_or_default().to_string(),
            detail: TextDetail::from_bits(fields.u32("detail")?.unwrap_or(0)),
        }),
        NodeKind::Tab => {
            if let Some(text) = fields.str("text")? {
                if text != "\t" {
                    return Err(fields.error("text", "a tab node may only contain \"\\t\""));
                }
            }
            Node::Tab(Tab {
                format: fields.text_format("format")?,
                mode: fields.vocab("mode", TextMode::from_wire)?.unwrap_or_default(),
                style: fields.str("style")?.unwrap_or_default().to_string(),
                detail: TextDetail::from_bits(fields.u32("detail")?.unwrap_or(0)),
            })
        }
        NodeKind::LineBreak => Node::LineBreak,
    };
    Ok(node)
}

fn decode_list(fields: &Fields<'_>) -> Result<List> {
    let list_type = fields
        .vocab("listType", ListType::from_wire)?
        .ok_or_else(|| fields.error("listType", "missing field"))?;
    let start = fields.u32("start")?.unwrap_or(1);
    if start == 0 {
        return Err(fields.error("start", "start must be at least 1"));
    }
    let tag = fields
        .vocab("tag", ListTag::from_wire)?
        .unwrap_or_else(|| list_type.default_tag());

    let mut children = fields.children()?;
    let mut position = Some(start);
    for child in &mut children {
        if let Node::ListItem(item) = child
            && item.value == 0
        {
            item.value =
                position.ok_or_else(|| fields.error("children", "list ordinal overflows"))?;
        }
        position = position.and_then(|p| p.checked_add(1));
    }

    Ok(List {
        attrs: fields.attrs()?,
        list_type,
        start,
        tag,
        children,
    })
}
