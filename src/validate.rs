//! Structural rules every editor state must satisfy.
//!
//! Decoding and the hand-built constructors both funnel through [`validate`],
//! so code downstream of an `EditorState` never has to re-check them.

use crate::error::DocumentError;
use crate::node::{List, ListItem, Node, NodeKind, Root};

pub(crate) fn validate(root: &Root) -> Result<(), DocumentError> {
    let mut cx = Checker {
        path: String::from("root"),
    };
    cx.children(NodeKind::Root, &root.children, 0)
}

struct Checker {
    path: String,
}

impl Checker {
    fn fail(&self, reason: impl Into<String>) -> DocumentError {
        DocumentError::malformed(self.path.clone(), reason)
    }

    /// Check `children` of a node of kind `parent`; `lists` is the number of
    /// list ancestors so far.
    fn children(&mut self, parent: NodeKind, children: &[Node], lists: u32) -> Result<(), DocumentError> {
        if parent == NodeKind::ListItem
            && children.len() > 1
            && children.iter().any(|c| c.kind() == NodeKind::List)
        {
            return Err(self.fail("a list item holding a nested list must hold nothing else"));
        }

        let mut previous: Option<&Node> = None;
        for (index, child) in children.iter().enumerate() {
            let len = self.path.len();
            self.path.push_str(&format!(".children[{index}]"));

            if !allowed(parent, child.kind()) {
                return Err(self.fail(format!(
                    "{} is not allowed inside {}",
                    child.kind(),
                    parent
                )));
            }
            if let (Some(Node::Text(prev)), Node::Text(text)) = (previous, child) {
                if prev.can_merge_with(text) {
                    return Err(self.fail("adjacent text runs with identical formatting"));
                }
            }
            self.node(child, lists)?;

            self.path.truncate(len);
            previous = Some(child);
        }
        Ok(())
    }

    fn node(&mut self, node: &Node, lists: u32) -> Result<(), DocumentError> {
        match node {
            Node::List(list) => {
                self.list(list)?;
                self.children(NodeKind::List, &list.children, lists + 1)
            }
            Node::ListItem(item) => {
                self.list_item(item, lists)?;
                self.children(NodeKind::ListItem, &item.children, lists)
            }
            other => self.children(other.kind(), other.children(), lists),
        }
    }

    fn list(&self, list: &List) -> Result<(), DocumentError> {
        if list.start == 0 {
            return Err(self.fail("list start must be at least 1"));
        }
        // None once an item has taken the largest ordinal
        let mut expected_min = Some(list.start);
        for (index, item) in list.items().enumerate() {
            if index == 0 && item.value != list.start {
                return Err(self.fail(format!(
                    "first item value {} does not match list start {}",
                    item.value, list.start
                )));
            }
            if expected_min.is_none_or(|min| item.value < min) {
                return Err(self.fail(format!(
                    "item value {} breaks increasing order",
                    item.value
                )));
            }
            expected_min = item.value.checked_add(1);
        }
        Ok(())
    }

    fn list_item(&self, item: &ListItem, lists: u32) -> Result<(), DocumentError> {
        let level = lists.saturating_sub(1);
        if item.attrs.indent != level {
            return Err(self.fail(format!(
                "list item indent {} does not match nesting level {}",
                item.attrs.indent, level
            )));
        }
        Ok(())
    }
}

fn allowed(parent: NodeKind, child: NodeKind) -> bool {
    match parent {
        NodeKind::Root => child.is_block(),
        NodeKind::Heading | NodeKind::Paragraph => child.is_inline(),
        NodeKind::Quote => child.is_inline() || child == NodeKind::Paragraph,
        NodeKind::List => child == NodeKind::ListItem,
        NodeKind::ListItem => child.is_inline() || child == NodeKind::List,
        NodeKind::Link => child.is_inline() && child != NodeKind::Link,
        NodeKind::Text | NodeKind::Tab | NodeKind::LineBreak => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DocumentError;
    use crate::node::*;

    fn item(text: &str) -> ListItem {
        ListItem::new(vec![Text::plain(text).into()])
    }

    fn reason(err: DocumentError) -> (String, String) {
        match err {
            DocumentError::Malformed { path, reason } => (path, reason),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn accepts_built_lists() {
        let nested = List::build(ListType::Bullet, 1, vec![item("b")]);
        let list = List::build(ListType::Bullet, 1, vec![item("a"), ListItem::nested(nested)]);
        assert!(EditorState::new(Root::new(vec![list.into()])).is_ok());
    }

    #[test]
    fn rejects_text_at_root() {
        let err = EditorState::new(Root::new(vec![Text::plain("loose").into()])).unwrap_err();
        let (path, reason) = reason(err);
        assert_eq!(path, "root.children[0]");
        assert_eq!(reason, "text is not allowed inside root");
    }

    #[test]
    fn rejects_non_item_list_children() {
        let mut list = List::build(ListType::Bullet, 1, vec![item("a")]);
        list.children.push(Paragraph::new(vec![]).into());
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        assert_eq!(reason(err).1, "paragraph is not allowed inside list");
    }

    #[test]
    fn rejects_out_of_order_values() {
        let mut list = List::build(ListType::Number, 1, vec![item("a"), item("b")]);
        if let Node::ListItem(second) = &mut list.children[1] {
            second.value = 1;
        }
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        assert_eq!(reason(err).1, "item value 1 breaks increasing order");
    }

    #[test]
    fn rejects_item_after_largest_ordinal() {
        let mut list = List::build(ListType::Number, u32::MAX, vec![item("a"), item("b")]);
        if let Node::ListItem(second) = &mut list.children[1] {
            second.value = u32::MAX;
        }
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        assert_eq!(reason(err).1, format!("item value {} breaks increasing order", u32::MAX));
    }

    #[test]
    fn rejects_wrong_first_value() {
        let mut list = List::build(ListType::Number, 1, vec![item("a")]);
        list.start = 2;
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        assert!(reason(err).1.contains("does not match list start 2"));
    }

    #[test]
    fn rejects_bad_indent() {
        let nested = List::build(ListType::Bullet, 1, vec![item("b")]);
        let mut list = List::build(ListType::Bullet, 1, vec![ListItem::nested(nested)]);
        if let Node::ListItem(wrapper) = &mut list.children[0] {
            if let Node::List(inner) = &mut wrapper.children[0] {
                if let Node::ListItem(deep) = &mut inner.children[0] {
                    deep.attrs.indent = 0;
                }
            }
        }
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        let (path, reason) = reason(err);
        assert_eq!(path, "root.children[0].children[0].children[0].children[0]");
        assert_eq!(reason, "list item indent 0 does not match nesting level 1");
    }

    #[test]
    fn rejects_mixed_nested_item() {
        let nested = List::build(ListType::Bullet, 1, vec![item("b")]);
        let mut wrapper = ListItem::nested(nested);
        wrapper.children.insert(0, Text::plain("a").into());
        let list = List::build(ListType::Bullet, 1, vec![wrapper]);
        let err = EditorState::new(Root::new(vec![list.into()])).unwrap_err();
        assert!(reason(err).1.contains("nothing else"));
    }

    #[test]
    fn rejects_mergeable_runs() {
        let paragraph = Paragraph::new(vec![Text::plain("a").into(), Text::plain("b").into()]);
        let err = EditorState::new(Root::new(vec![paragraph.into()])).unwrap_err();
        assert_eq!(reason(err).1, "adjacent text runs with identical formatting");
    }

    #[test]
    fn unmergeable_runs_may_touch() {
        let mut second = Text::plain("b");
        second.detail = TextDetail::default().with_unmergeable();
        let paragraph = Paragraph::new(vec![Text::plain("a").into(), second.into()]);
        assert!(EditorState::new(Root::new(vec![paragraph.into()])).is_ok());
    }
}
