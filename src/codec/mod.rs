//! The versioned JSON wire format for editor states.
//!
//! A document is `{"root": {...}}`. Every node object carries a `type`
//! discriminator and a schema `version`; element nodes add `children`,
//! `direction`, `format` and `indent`.

mod decode;
mod encode;

pub use decode::{decode, decode_value};
pub use encode::{encode, encode_pretty};

/// Newest node schema revision this crate reads and the one it writes.
pub const SCHEMA_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use crate::node::*;

    const HEADING_DOC: &str = r#"{"root":{"type":"root","version":1,"children":[{"type":"heading","tag":"h1","version":1,"children":[{"type":"text","text":"Hi","format":0,"mode":"normal","style":"","detail":0,"version":1}]}]}}"#;

    fn malformed(err: DocumentError) -> (String, String) {
        match err {
            DocumentError::Malformed { path, reason } => (path, reason),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn decodes_heading_document() {
        let state = decode(HEADING_DOC).unwrap();
        let root = state.root();
        assert_eq!(root.children.len(), 1);
        let Node::Heading(heading) = &root.children[0] else {
            panic!("expected heading");
        };
        assert_eq!(heading.tag, HeadingTag::H1);
        assert_eq!(heading.attrs, ElementAttrs::default());
        let Node::Text(text) = &heading.children[0] else {
            panic!("expected text");
        };
        assert_eq!(text.text, "Hi");
        assert!(text.format.is_empty());
    }

    #[test]
    fn encodes_with_fixed_field_order() {
        let state = decode(HEADING_DOC).unwrap();
        assert_eq!(
            encode(&state).unwrap(),
            concat!(
                r#"{"root":{"children":[{"children":[{"detail":0,"format":0,"mode":"normal","style":"","text":"Hi","type":"text","version":1}],"#,
                r#""direction":null,"format":"","indent":0,"type":"heading","version":1,"tag":"h1"}],"#,
                r#""direction":null,"format":"","indent":0,"type":"root","version":1}}"#
            )
        );
    }

    #[test]
    fn unknown_type_is_malformed() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"unknown_node","version":1}]}}"#;
        let (path, reason) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.children[0].type");
        assert_eq!(reason, "unknown node type \"unknown_node\"");
    }

    #[test]
    fn newer_version_is_unsupported() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"paragraph","version":2,"children":[]}]}}"#;
        assert_eq!(
            decode(doc).unwrap_err(),
            DocumentError::UnsupportedVersion {
                path: "root.children[0]".to_string(),
                found: 2,
                supported: SCHEMA_VERSION,
            }
        );
    }

    #[test]
    fn version_is_checked_before_type() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"table","version":7}]}}"#;
        assert!(matches!(
            decode(doc).unwrap_err(),
            DocumentError::UnsupportedVersion { found: 7, .. }
        ));
    }

    #[test]
    fn missing_version_is_malformed() {
        let doc = r#"{"root":{"type":"root","children":[]}}"#;
        let (path, reason) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.version");
        assert_eq!(reason, "missing field");
    }

    #[test]
    fn list_without_list_type_is_malformed() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"list","version":1,"children":[]}]}}"#;
        let (path, reason) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.children[0].listType");
        assert_eq!(reason, "missing field");
    }

    #[test]
    fn wrong_kind_field_is_malformed() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"paragraph","version":1,"indent":"two","children":[]}]}}"#;
        let (path, reason) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.children[0].indent");
        assert_eq!(reason, "expected a non-negative integer");
    }

    #[test]
    fn list_children_must_be_items() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"list","listType":"bullet","version":1,"children":[{"type":"paragraph","version":1,"children":[]}]}]}}"#;
        let (_, reason) = malformed(decode(doc).unwrap_err());
        assert_eq!(reason, "paragraph is not allowed inside list");
    }

    #[test]
    fn nested_root_is_malformed() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"root","version":1,"children":[]}]}}"#;
        let (path, _) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.children[0].type");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let (path, _) = malformed(decode("{\"root\": ").unwrap_err());
        assert_eq!(path, "$");
    }

    #[test]
    fn legacy_numeric_alignment_is_accepted() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"paragraph","version":1,"format":2,"children":[]}]}}"#;
        let state = decode(doc).unwrap();
        let Node::Paragraph(p) = &state.root().children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.attrs.format, ElementFormat::Center);
        assert!(encode(&state).unwrap().contains(r#""format":"center""#));
    }

    #[test]
    fn missing_item_values_count_from_start() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"list","listType":"number","start":4,"version":1,"children":[
            {"type":"listitem","version":1,"children":[]},
            {"type":"listitem","version":1,"children":[]}]}]}}"#;
        let state = decode(doc).unwrap();
        let Node::List(list) = &state.root().children[0] else {
            panic!("expected list");
        };
        assert_eq!(list.tag, ListTag::Ol);
        let values: Vec<_> = list.items().map(|i| i.value).collect();
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn tab_text_must_be_a_tab() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"paragraph","version":1,"children":[{"type":"tab","text":"x","version":1}]}]}}"#;
        let (path, _) = malformed(decode(doc).unwrap_err());
        assert_eq!(path, "root.children[0].children[0].text");
    }

    #[test]
    fn unknown_format_bits_survive() {
        let doc = r#"{"root":{"type":"root","version":1,"children":[{"type":"paragraph","version":1,"children":[{"type":"text","text":"x","format":4097,"version":1}]}]}}"#;
        let state = decode(doc).unwrap();
        assert!(encode(&state).unwrap().contains(r#""format":4097"#));
    }

    #[test]
    fn serde_integration() {
        let state: EditorState = serde_json::from_str(HEADING_DOC).unwrap();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["root"]["children"][0]["tag"], "h1");
        assert!(serde_json::from_str::<EditorState>("{\"root\":{}}").is_err());
    }
}
