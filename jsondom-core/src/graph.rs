//! Underlying JSON graph primitives.
//!
//! Nodes live in the arena's node vector and link to each other by index:
//! parent, first/last child and prev/next sibling. A named field whose value
//! is a container holds that container as its only child and records it as
//! its `target`.
//!
//! ```text
//! {"x":{"y":"z"}}
//!
//! root (Object, Element)
//! └── {} (Object, Element)
//!     └── "x" (Object, Field) ── target ─┐
//!         └── {} (Object, Element) ◀─────┘
//!             └── "y" (String, Field) text "z"
//! ```
//!
//! These are the engine-level operations the DOM layer builds on: create,
//! link, unlink, copy, walk and search. None of them allocate wrappers.

use crate::arena::{Arena, Block};
use crate::kind::{Kind, Position, ValueKind};

/// Index into the arena's node storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Internal node storage.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeData {
    pub(crate) kind: Kind,
    pub(crate) tag: Option<Block>,
    pub(crate) text: Option<Block>,
    /// Container a named field refers to.
    pub(crate) target: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) child_count: u32,
}

impl NodeData {
    fn new(kind: Kind, tag: Option<Block>, text: Option<Block>) -> Self {
        Self {
            kind,
            tag,
            text,
            target: None,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            child_count: 0,
        }
    }
}

/// Owned copy of one node's payload, used while duplicating subtrees.
struct Snapshot {
    kind: Kind,
    tag: Option<String>,
    text: Option<String>,
    target: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Arena {
    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        id
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Invisible top node every document hangs its values from.
    pub(crate) fn new_root(&mut self) -> NodeId {
        self.push_node(NodeData::new(Kind::element(ValueKind::Object), None, None))
    }

    /// Leaf node; named when `tag` is given, an anonymous element otherwise.
    pub(crate) fn new_leaf(&mut self, tag: Option<&str>, value: ValueKind, text: &str) -> NodeId {
        debug_assert!(value.is_leaf());
        let position = if tag.is_some() { Position::Field } else { Position::Element };
        let tag = tag.map(|t| self.alloc_str(t));
        let text = Some(self.alloc_str(text));
        self.push_node(NodeData::new(Kind { value, position }, tag, text))
    }

    /// Empty anonymous object or array.
    pub(crate) fn new_container(&mut self, value: ValueKind) -> NodeId {
        debug_assert!(value.is_container());
        self.push_node(NodeData::new(Kind::element(value), None, None))
    }

    /// Named field referring to `value`, which becomes its only child.
    ///
    /// The field takes the value kind of what it refers to. A leaf value keeps
    /// its payload on the leaf; the field itself has no text slot.
    pub(crate) fn new_field(&mut self, tag: &str, value: NodeId) -> NodeId {
        let kind = Kind::field(self.node(value).kind.value);
        let tag = Some(self.alloc_str(tag));
        let field = self.push_node(NodeData::new(kind, tag, None));
        self.append(field, value);
        self.node_mut(field).target = Some(value);
        field
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Link `child` as the last child of `parent`, moving it if it is
    /// already attached somewhere else.
    pub(crate) fn append(&mut self, parent: NodeId, child: NodeId) {
        let child_data = self.node(child);
        if child == parent || child_data.first_child.is_some() {
            assert!(
                !self.is_ancestor_or_self(child, parent),
                "cannot attach a node beneath itself"
            );
        }
        if child_data.parent.is_some() {
            self.detach(child);
        }

        let last = self.node(parent).last_child;
        {
            let data = self.node_mut(child);
            data.parent = Some(parent);
            data.prev_sibling = last;
            data.next_sibling = None;
        }
        match last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        let data = self.node_mut(parent);
        data.last_child = Some(child);
        data.child_count += 1;
    }

    /// Unlink `node` (and its subtree) from its parent.
    ///
    /// Returns false when the node was not attached.
    pub(crate) fn detach(&mut self, node: NodeId) -> bool {
        let NodeData { parent, prev_sibling, next_sibling, .. } = *self.node(node);
        let Some(parent) = parent else {
            return false;
        };

        match prev_sibling {
            Some(prev) => self.node_mut(prev).next_sibling = next_sibling,
            None => self.node_mut(parent).first_child = next_sibling,
        }
        match next_sibling {
            Some(next) => self.node_mut(next).prev_sibling = prev_sibling,
            None => self.node_mut(parent).last_child = prev_sibling,
        }
        let parent_data = self.node_mut(parent);
        parent_data.child_count -= 1;
        if parent_data.target == Some(node) {
            parent_data.target = None;
        }

        let data = self.node_mut(node);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
        true
    }

    /// Whether `child` may hang from the document root `root`.
    ///
    /// A root holds either one anonymous value or any number of fields.
    pub(crate) fn root_accepts(&self, root: NodeId, child: NodeId) -> bool {
        let anonymous = self.node(child).kind.position == Position::Element;
        let mut cur = self.node(root).first_child;
        while let Some(id) = cur {
            if id != child && (anonymous || self.node(id).kind.position == Position::Element) {
                return false;
            }
            cur = self.node(id).next_sibling;
        }
        true
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.node(id).parent;
        }
        false
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Number of links between `node` and the top of its tree.
    pub(crate) fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self.node(node).parent;
        while let Some(id) = cur {
            depth += 1;
            cur = self.node(id).parent;
        }
        depth
    }

    /// Next node after `node` in document order, staying below `within`.
    pub(crate) fn next_in_order(&self, node: NodeId, within: NodeId) -> Option<NodeId> {
        if let Some(child) = self.node(node).first_child {
            return Some(child);
        }
        let mut cur = node;
        loop {
            if cur == within {
                return None;
            }
            let data = self.node(cur);
            if let Some(next) = data.next_sibling {
                return Some(next);
            }
            cur = data.parent?;
        }
    }

    /// Non-empty tag of `node`.
    pub(crate) fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node)
            .tag
            .map(|block| self.str(block))
            .filter(|tag| !tag.is_empty())
    }

    /// Case-insensitive tag comparison.
    pub(crate) fn tag_matches(&self, node: NodeId, name: &str) -> bool {
        self.tag(node).is_some_and(|tag| tag.eq_ignore_ascii_case(name))
    }

    /// Text payload of `node`, if it has a text slot.
    pub(crate) fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node).text.map(|block| self.str(block))
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Nodes below `root` whose tag matches `tag`, in document order.
    pub(crate) fn find_by_tag(&self, root: NodeId, tag: &str, first_only: bool) -> Vec<NodeId> {
        let mut hits = Vec::new();
        let mut cur = self.next_in_order(root, root);
        while let Some(id) = cur {
            if self.tag_matches(id, tag) {
                hits.push(id);
                if first_only {
                    break;
                }
            }
            cur = self.next_in_order(id, root);
        }
        hits
    }

    /// Nodes below `root` matching a `/`-separated tag path.
    ///
    /// A node matches when its tag equals the last segment and its nearest
    /// named ancestors carry the preceding segments, innermost first.
    /// Anonymous containers between them are skipped.
    pub(crate) fn find_by_tags(&self, root: NodeId, path: &str, first_only: bool) -> Vec<NodeId> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, ancestors)) = segments.split_last() else {
            return Vec::new();
        };

        let mut hits = Vec::new();
        let mut cur = self.next_in_order(root, root);
        while let Some(id) = cur {
            if self.tag_matches(id, last) && self.ancestors_match(id, root, ancestors) {
                hits.push(id);
                if first_only {
                    break;
                }
            }
            cur = self.next_in_order(id, root);
        }
        hits
    }

    fn ancestors_match(&self, node: NodeId, root: NodeId, segments: &[&str]) -> bool {
        let mut cur = self.node(node).parent;
        for segment in segments.iter().rev() {
            let named = loop {
                match cur {
                    None => return false,
                    Some(id) if id == root => return false,
                    Some(id) if self.tag(id).is_some() => break id,
                    Some(id) => cur = self.node(id).parent,
                }
            };
            if !self.tag_matches(named, segment) {
                return false;
            }
            cur = self.node(named).parent;
        }
        true
    }

    // ========================================================================
    // Duplication
    // ========================================================================

    fn snapshot(&self, node: NodeId) -> Snapshot {
        let data = self.node(node);
        let mut children = Vec::with_capacity(data.child_count as usize);
        let mut cur = data.first_child;
        while let Some(id) = cur {
            children.push(id);
            cur = self.node(id).next_sibling;
        }
        Snapshot {
            kind: data.kind,
            tag: data.tag.map(|b| self.str(b).to_owned()),
            text: data.text.map(|b| self.str(b).to_owned()),
            target: data.target,
            children,
        }
    }

    fn alloc_snapshot(&mut self, snap: &Snapshot) -> NodeId {
        let tag = snap.tag.as_deref().map(|t| self.alloc_str(t));
        let text = snap.text.as_deref().map(|t| self.alloc_str(t));
        self.push_node(NodeData::new(snap.kind, tag, text))
    }

    /// Deep copy of `node` into this arena, detached.
    ///
    /// `source` is the arena `node` lives in; `None` means this one.
    pub(crate) fn copy_subtree(&mut self, source: Option<&Arena>, node: NodeId) -> NodeId {
        let top = source.unwrap_or(&*self).snapshot(node);
        let copy = self.alloc_snapshot(&top);

        // (source node, new parent, is the parent's target)
        let mut stack: Vec<(NodeId, NodeId, bool)> = top
            .children
            .iter()
            .rev()
            .map(|&child| (child, copy, top.target == Some(child)))
            .collect();

        while let Some((from, parent, is_target)) = stack.pop() {
            let snap = source.unwrap_or(&*self).snapshot(from);
            let id = self.alloc_snapshot(&snap);
            self.append(parent, id);
            if is_target {
                self.node_mut(parent).target = Some(id);
            }
            stack.extend(
                snap.children
                    .iter()
                    .rev()
                    .map(|&child| (child, id, snap.target == Some(child))),
            );
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn children(arena: &Arena, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = arena.node(id).first_child;
        while let Some(c) = cur {
            out.push(c);
            cur = arena.node(c).next_sibling;
        }
        out
    }

    #[test]
    fn test_root_holds_one_value_or_fields() {
        let mut arena = Arena::default();
        let root = arena.new_root();
        let a = arena.new_leaf(Some("a"), ValueKind::Bool, "true");
        let b = arena.new_leaf(Some("b"), ValueKind::Null, "null");
        let list = arena.new_container(ValueKind::Array);
        assert!(arena.root_accepts(root, a));
        arena.append(root, a);
        assert!(arena.root_accepts(root, b));
        assert!(!arena.root_accepts(root, list));

        let other = arena.new_root();
        arena.append(other, list);
        assert!(arena.root_accepts(other, list));
        assert!(!arena.root_accepts(other, a));
        let second = arena.new_container(ValueKind::Object);
        assert!(!arena.root_accepts(other, second));
    }

    #[test]
    fn test_append_keeps_order() {
        let mut arena = Arena::default();
        let obj = arena.new_container(ValueKind::Object);
        let a = arena.new_leaf(Some("a"), ValueKind::Number, "1");
        let b = arena.new_leaf(Some("b"), ValueKind::Number, "2");
        let c = arena.new_leaf(Some("c"), ValueKind::Number, "3");
        arena.append(obj, a);
        arena.append(obj, b);
        arena.append(obj, c);

        assert_eq!(children(&arena, obj), vec![a, b, c]);
        assert_eq!(arena.node(obj).child_count, 3);
        assert_eq!(arena.node(b).parent, Some(obj));
    }

    #[test]
    fn test_detach_middle_and_ends() {
        let mut arena = Arena::default();
        let arr = arena.new_container(ValueKind::Array);
        let items: Vec<NodeId> = (0..4)
            .map(|i| {
                let id = arena.new_leaf(None, ValueKind::Number, &i.to_string());
                arena.append(arr, id);
                id
            })
            .collect();

        assert!(arena.detach(items[1]));
        assert_eq!(children(&arena, arr), vec![items[0], items[2], items[3]]);
        assert!(arena.detach(items[0]));
        assert!(arena.detach(items[3]));
        assert_eq!(children(&arena, arr), vec![items[2]]);
        assert_eq!(arena.node(arr).first_child, arena.node(arr).last_child);
        assert_eq!(arena.node(arr).child_count, 1);

        // Already detached
        assert!(!arena.detach(items[1]));
        assert_eq!(arena.text(items[1]), Some("1"));
    }

    #[test]
    fn test_append_moves_attached_node() {
        let mut arena = Arena::default();
        let first = arena.new_container(ValueKind::Array);
        let second = arena.new_container(ValueKind::Array);
        let item = arena.new_leaf(None, ValueKind::Null, "null");
        arena.append(first, item);
        arena.append(second, item);
        assert_eq!(arena.node(first).child_count, 0);
        assert_eq!(children(&arena, second), vec![item]);
    }

    #[test]
    #[should_panic(expected = "beneath itself")]
    fn test_append_cycle_rejected() {
        let mut arena = Arena::default();
        let outer = arena.new_container(ValueKind::Array);
        let inner = arena.new_container(ValueKind::Array);
        arena.append(outer, inner);
        arena.append(inner, outer);
    }

    #[test]
    fn test_field_target_cleared_on_detach() {
        let mut arena = Arena::default();
        let obj = arena.new_container(ValueKind::Object);
        let field = arena.new_field("x", obj);
        assert_eq!(arena.node(field).target, Some(obj));
        assert_eq!(arena.node(field).kind, Kind::field(ValueKind::Object));
        arena.detach(obj);
        assert_eq!(arena.node(field).target, None);
    }

    #[test]
    fn test_document_order_walk() {
        let mut arena = Arena::default();
        let root = arena.new_root();
        let obj = arena.new_container(ValueKind::Object);
        arena.append(root, obj);
        let inner = arena.new_container(ValueKind::Object);
        let x = arena.new_field("x", inner);
        arena.append(obj, x);
        let y = arena.new_leaf(Some("y"), ValueKind::String, "z");
        arena.append(inner, y);
        let w = arena.new_leaf(Some("w"), ValueKind::Bool, "true");
        arena.append(obj, w);

        let mut order = Vec::new();
        let mut cur = arena.next_in_order(root, root);
        while let Some(id) = cur {
            order.push(id);
            cur = arena.next_in_order(id, root);
        }
        assert_eq!(order, vec![obj, x, inner, y, w]);
        assert_eq!(arena.depth(y), 4);
    }

    #[test]
    fn test_find_by_tags_skips_anonymous_containers() {
        let mut arena = Arena::default();
        let root = arena.new_root();
        let top = arena.new_container(ValueKind::Object);
        arena.append(root, top);
        let inner = arena.new_container(ValueKind::Object);
        let a = arena.new_field("a", inner);
        arena.append(top, a);
        let b = arena.new_leaf(Some("B"), ValueKind::Number, "1");
        arena.append(inner, b);
        let stray = arena.new_leaf(Some("b"), ValueKind::Number, "2");
        arena.append(top, stray);

        assert_eq!(arena.find_by_tags(root, "a/b", false), vec![b]);
        assert_eq!(arena.find_by_tags(root, "/a//b/", false), vec![b]);
        assert_eq!(arena.find_by_tags(root, "b", false), vec![b, stray]);
        assert!(arena.find_by_tags(root, "x/b", false).is_empty());
        assert!(arena.find_by_tags(root, "", false).is_empty());
        assert_eq!(arena.find_by_tag(root, "b", true), vec![b]);
    }

    #[test]
    fn test_copy_subtree_preserves_targets() {
        let mut arena = Arena::default();
        let inner = arena.new_container(ValueKind::Array);
        let one = arena.new_leaf(None, ValueKind::Number, "1");
        arena.append(inner, one);
        let field = arena.new_field("list", inner);

        let copy = arena.copy_subtree(None, field);
        assert_ne!(copy, field);
        assert_eq!(arena.tag(copy), Some("list"));
        let copied_inner = arena.node(copy).target.expect("target copied");
        assert_ne!(copied_inner, inner);
        let copied_one = arena.node(copied_inner).first_child.expect("child copied");
        assert_eq!(arena.text(copied_one), Some("1"));
        assert_eq!(arena.node(copy).parent, None);
    }

    #[test]
    fn test_copy_between_arenas() {
        let mut src = Arena::default();
        let obj = src.new_container(ValueKind::Object);
        let leaf = src.new_leaf(Some("k"), ValueKind::String, "v");
        src.append(obj, leaf);

        let mut dst = Arena::default();
        let copy = dst.copy_subtree(Some(&src), obj);
        let child = dst.node(copy).first_child.expect("child copied");
        assert_eq!(dst.tag(child), Some("k"));
        assert_eq!(dst.text(child), Some("v"));
    }
}
