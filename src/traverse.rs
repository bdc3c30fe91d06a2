//! Lazy depth-first traversal over an editor state.
//!
//! Nodes never point at their parents. Both iterators keep the chain of open
//! ancestors on a stack instead, exposed through `ancestors()`.

use std::slice;

use crate::node::{Node, NodeRef, Root};

/// Entering or leaving a node during a [`Walk`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    Enter(NodeRef<'a>),
    Leave(NodeRef<'a>),
}

impl<'a> Event<'a> {
    pub fn node(self) -> NodeRef<'a> {
        match self {
            Event::Enter(node) | Event::Leave(node) => node,
        }
    }
}

/// Enter/leave events in document order.
pub struct Walk<'a> {
    start: Option<&'a Root>,
    path: Vec<NodeRef<'a>>,
    pending: Vec<slice::Iter<'a, Node>>,
    entered: bool,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(root: &'a Root) -> Self {
        Self {
            start: Some(root),
            path: Vec::new(),
            pending: Vec::new(),
            entered: false,
        }
    }

    /// Ancestors of the node in the last event, outermost first.
    pub fn ancestors(&self) -> &[NodeRef<'a>] {
        if self.entered {
            &self.path[..self.path.len().saturating_sub(1)]
        } else {
            &self.path
        }
    }

    fn open(&mut self, node: NodeRef<'a>) -> Event<'a> {
        self.path.push(node);
        self.pending.push(node.children().iter());
        self.entered = true;
        Event::Enter(node)
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.start.take() {
            return Some(self.open(NodeRef::Root(root)));
        }

        match self.pending.last_mut()?.next() {
            Some(child) => Some(self.open(NodeRef::Node(child))),
            None => {
                self.pending.pop();
                let node = self.path.pop()?;
                self.entered = false;
                Some(Event::Leave(node))
            }
        }
    }
}

/// Pre-order iteration over every node, the root first.
pub struct Traverse<'a> {
    walk: Walk<'a>,
}

impl<'a> Traverse<'a> {
    pub(crate) fn new(root: &'a Root) -> Self {
        Self {
            walk: Walk::new(root),
        }
    }

    /// Ancestors of the node last yielded, outermost first.
    pub fn ancestors(&self) -> &[NodeRef<'a>] {
        self.walk.ancestors()
    }

    pub fn depth(&self) -> usize {
        self.ancestors().len()
    }
}

impl<'a> Iterator for Traverse<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walk.next()? {
                Event::Enter(node) => return Some(node),
                Event::Leave(_) => continue,
            }
        }
    }
}
