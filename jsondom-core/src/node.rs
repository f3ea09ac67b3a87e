//! `ValueNode` - a lightweight handle onto one node of a [`Document`].
//!
//! A handle is three integers: the arena it was minted in, the arena
//! generation at the time, and the slot of its wrapper record. The record
//! lives in the arena and holds the underlying node, the owning document and
//! the memoized slots:
//!
//! ```text
//! ValueNode { arena, generation, slot }
//!                                  │
//!                                  ▼
//! Wrapper { node, owner, parent?, object?, cursor }
//!             │                    │        │
//!             ▼                    ▼        ▼
//!         NodeData          wrapper slots (memoized)
//! ```
//!
//! Every operation takes the document explicitly. Reads and memoizing
//! navigation borrow it shared; edits and rendering borrow it exclusively.
//!
//! Handles are cheap to copy and compare. Two handles are `==` only when
//! they name the same wrapper record; use [`ValueNode::same_node`] to ask
//! whether two wrappers view the same underlying node.

use crate::arena::{Arena, DocumentId};
use crate::config::DocFlags;
use crate::document::Document;
use crate::graph::NodeId;
use crate::kind::{self, Kind};
use crate::render::write_node;

/// Handle to a wrapper record in a document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueNode {
    pub(crate) arena: u32,
    pub(crate) generation: u32,
    pub(crate) slot: u32,
}

/// Position of a single-cursor child iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cursor {
    /// No successful `first_*` call yet.
    Unset,
    At(NodeId),
    Exhausted,
}

/// Arena-resident wrapper record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Wrapper {
    pub(crate) node: NodeId,
    pub(crate) owner: DocumentId,
    /// Memoized parent wrapper.
    pub(crate) parent: Option<u32>,
    /// Memoized view of the container a field refers to.
    pub(crate) object: Option<u32>,
    pub(crate) cursor: Cursor,
}

impl Wrapper {
    pub(crate) fn new(node: NodeId, owner: DocumentId) -> Self {
        Self {
            node,
            owner,
            parent: None,
            object: None,
            cursor: Cursor::Unset,
        }
    }
}

impl ValueNode {
    /// Panic unless this handle is live and owned by `doc`.
    fn assert_owned_by(self, doc: &Document) {
        let arena = doc.arena.borrow();
        doc.load(&arena, self);
    }

    fn with_arena<R>(self, doc: &Document, f: impl FnOnce(&Arena, NodeId) -> R) -> R {
        let arena = doc.arena.borrow();
        let node = doc.load(&arena, self).node;
        f(&*arena, node)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Full type tag of the underlying node.
    pub fn kind(self, doc: &Document) -> Kind {
        self.with_arena(doc, |arena, node| arena.node(node).kind)
    }

    /// Field name, if the node has a non-empty one.
    pub fn tag_name(self, doc: &Document) -> Option<String> {
        self.with_arena(doc, |arena, node| arena.tag(node).map(str::to_owned))
    }

    /// Leaf payload. Containers have no text slot and return `None`;
    /// an empty payload is `Some("")`.
    pub fn text(self, doc: &Document) -> Option<String> {
        self.with_arena(doc, |arena, node| arena.text(node).map(str::to_owned))
    }

    /// Payload of a non-empty leaf whose kind passes `accepts`.
    fn scalar<R>(
        self,
        doc: &Document,
        accepts: fn(Kind) -> bool,
        convert: impl FnOnce(&str) -> R,
    ) -> Option<R> {
        self.with_arena(doc, |arena, node| {
            if !accepts(arena.node(node).kind) {
                return None;
            }
            arena.text(node).filter(|t| !t.is_empty()).map(convert)
        })
    }

    pub fn as_string(self, doc: &Document) -> Option<String> {
        self.scalar(doc, Kind::is_string, str::to_owned)
    }

    /// Integer value of a numeric node. Malformed text reads as 0.
    pub fn as_i64(self, doc: &Document) -> Option<i64> {
        self.scalar(doc, Kind::is_number, kind::lenient_i64)
    }

    /// Float value of a numeric node. Malformed text reads as 0.0.
    pub fn as_f64(self, doc: &Document) -> Option<f64> {
        self.scalar(doc, Kind::is_double, kind::lenient_f64)
    }

    /// `true` only for a case-insensitive `"true"` payload.
    pub fn as_bool(self, doc: &Document) -> Option<bool> {
        self.scalar(doc, Kind::is_bool, kind::lenient_bool)
    }

    /// See [`Kind::name`].
    pub fn kind_name(self, doc: &Document) -> &'static str {
        self.kind(doc).name()
    }

    pub fn is_string(self, doc: &Document) -> bool {
        self.kind(doc).is_string()
    }

    pub fn is_number(self, doc: &Document) -> bool {
        self.kind(doc).is_number()
    }

    pub fn is_double(self, doc: &Document) -> bool {
        self.kind(doc).is_double()
    }

    pub fn is_bool(self, doc: &Document) -> bool {
        self.kind(doc).is_bool()
    }

    pub fn is_null(self, doc: &Document) -> bool {
        self.kind(doc).is_null()
    }

    pub fn is_object(self, doc: &Document) -> bool {
        self.kind(doc).is_object()
    }

    pub fn is_array(self, doc: &Document) -> bool {
        self.kind(doc).is_array()
    }

    /// Number of links up to the top of the tree. The document root is 0.
    pub fn depth(self, doc: &Document) -> usize {
        self.with_arena(doc, |arena, node| arena.depth(node))
    }

    pub fn child_count(self, doc: &Document) -> usize {
        self.with_arena(doc, |arena, node| arena.node(node).child_count as usize)
    }

    /// Whether both wrappers view the same underlying node.
    pub fn same_node(self, doc: &Document, other: ValueNode) -> bool {
        let arena = doc.arena.borrow();
        doc.load(&arena, self).node == doc.load(&arena, other).node
    }

    /// Whether this handle is live and was minted by `doc`.
    pub fn belongs_to(self, doc: &Document) -> bool {
        let arena = doc.arena.borrow();
        self.arena == arena.id()
            && self.generation == arena.generation()
            && arena.wrapper(self).owner == doc.id
    }

    // ========================================================================
    // Memoized navigation
    // ========================================================================

    /// The container a named field refers to.
    ///
    /// Repeated calls return the same wrapper.
    pub fn nested_object_view(self, doc: &Document) -> Option<ValueNode> {
        let mut arena = doc.arena.borrow_mut();
        let wrapper = doc.load(&arena, self);
        if let Some(slot) = wrapper.object {
            return Some(arena.handle(slot));
        }
        let target = arena.node(wrapper.node).target?;
        let view = doc.wrap(&mut arena, target);
        arena.wrapper_mut(self).object = Some(view.slot);
        Some(view)
    }

    /// Parent wrapper.
    ///
    /// Returns the memoized parent when one is set. A node directly under
    /// the document root, or not attached at all, gets the root wrapper.
    pub fn parent(self, doc: &Document) -> ValueNode {
        let root = doc.root_node();
        let mut arena = doc.arena.borrow_mut();
        let wrapper = doc.load(&arena, self);
        if let Some(slot) = wrapper.parent {
            return arena.handle(slot);
        }
        match arena.node(wrapper.node).parent {
            Some(parent) if parent != root => {
                let handle = doc.wrap(&mut arena, parent);
                arena.wrapper_mut(self).parent = Some(handle.slot);
                handle
            }
            _ => {
                drop(arena);
                doc.root()
            }
        }
    }

    // ========================================================================
    // Child iteration
    // ========================================================================

    /// Start the single-cursor child iteration.
    ///
    /// Each call returns a fresh wrapper, even for a child seen before.
    pub fn first_child(self, doc: &Document) -> Option<ValueNode> {
        let mut arena = doc.arena.borrow_mut();
        let node = doc.load(&arena, self).node;
        match arena.node(node).first_child {
            Some(child) => {
                arena.wrapper_mut(self).cursor = Cursor::At(child);
                Some(doc.wrap(&mut arena, child))
            }
            None => {
                arena.wrapper_mut(self).cursor = Cursor::Unset;
                None
            }
        }
    }

    /// Advance the cursor set by [`ValueNode::first_child`].
    ///
    /// # Panics
    ///
    /// When no successful `first_child` call precedes it.
    pub fn next_child(self, doc: &Document) -> Option<ValueNode> {
        let mut arena = doc.arena.borrow_mut();
        let cursor = doc.load(&arena, self).cursor;
        let next = match cursor {
            Cursor::Unset => panic!("next_child called without a successful first_child"),
            Cursor::Exhausted => return None,
            Cursor::At(current) => arena.node(current).next_sibling,
        };
        match next {
            Some(child) => {
                arena.wrapper_mut(self).cursor = Cursor::At(child);
                Some(doc.wrap(&mut arena, child))
            }
            None => {
                arena.wrapper_mut(self).cursor = Cursor::Exhausted;
                None
            }
        }
    }

    /// Iterator over the immediate children, independent of the cursor.
    pub fn children(self, doc: &Document) -> Children<'_> {
        let arena = doc.arena.borrow();
        let node = doc.load(&arena, self).node;
        Children {
            doc,
            next: arena.node(node).first_child,
            generation: arena.generation(),
        }
    }

    /// First immediate child whose tag matches `name`, ignoring ASCII case.
    ///
    /// Scans through the single cursor, so an iteration in progress on
    /// this wrapper is restarted.
    pub fn get(self, doc: &Document, name: &str) -> Option<ValueNode> {
        let mut child = self.first_child(doc);
        while let Some(candidate) = child {
            let hit = {
                let arena = doc.arena.borrow();
                arena.tag_matches(doc.load(&arena, candidate).node, name)
            };
            if hit {
                return Some(candidate);
            }
            child = self.next_child(doc);
        }
        None
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Rename a field. Anonymous nodes and empty names are rejected.
    pub fn set_tag_name(self, doc: &mut Document, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let mut arena = doc.arena.borrow_mut();
        let node = doc.load(&arena, self).node;
        if arena.tag(node).is_none() {
            return false;
        }
        let block = arena.alloc_str(name);
        arena.node_mut(node).tag = Some(block);
        true
    }

    /// Replace a leaf payload. Containers, nodes without a text slot and
    /// empty text are rejected.
    pub fn set_text(self, doc: &mut Document, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let mut arena = doc.arena.borrow_mut();
        let node = doc.load(&arena, self).node;
        let data = arena.node(node);
        if !data.kind.value.is_leaf() || data.text.is_none() {
            return false;
        }
        let block = arena.alloc_str(text);
        arena.node_mut(node).text = Some(block);
        true
    }

    /// Serialize this subtree.
    ///
    /// Appends to `out` when given; otherwise writes into this wrapper's
    /// scratch buffer, which is cleared first.
    pub fn render<'a>(self, doc: &'a mut Document, out: Option<&'a mut String>) -> &'a str {
        let add_space = doc.flags().contains(DocFlags::ADD_SPACE);
        let arena = doc.arena.borrow();
        let node = doc.load(&arena, self).node;
        let out = match out {
            Some(out) => out,
            None => {
                let buffer = doc.node_buffers.entry(self).or_default();
                buffer.clear();
                buffer
            }
        };
        write_node(&arena, node, out, add_space);
        drop(arena);
        out
    }

    /// Empty the scratch buffer used by [`ValueNode::render`].
    pub fn clear_buffer(self, doc: &mut Document) {
        self.assert_owned_by(doc);
        if let Some(buffer) = doc.node_buffers.get_mut(&self) {
            buffer.clear();
        }
    }

    /// Link `child` as the last child of this node.
    ///
    /// A child attached elsewhere is moved. On a field that refers to a
    /// container the child goes into that container. Returns `child` when
    /// `return_child` is set, `self` otherwise.
    ///
    /// # Panics
    ///
    /// - when `child` is this node or one of its ancestors
    /// - when this node, or the value a field refers to, is a scalar
    /// - when this is the document root and the child would become a second
    ///   top-level value, or an anonymous value beside root fields
    pub fn add_child(self, doc: &mut Document, child: ValueNode, return_child: bool) -> ValueNode {
        let root = doc.root_node();
        let mut arena = doc.arena.borrow_mut();
        let wrapper = doc.load(&arena, self);
        let node = doc.load(&arena, child).node;
        let (parent, parent_slot) = match arena.node(wrapper.node).target {
            Some(target) => {
                let slot = match wrapper.object {
                    Some(slot) => slot,
                    None => {
                        let view = doc.wrap(&mut arena, target);
                        arena.wrapper_mut(self).object = Some(view.slot);
                        view.slot
                    }
                };
                (target, slot)
            }
            None => (wrapper.node, self.slot),
        };
        assert!(
            arena.node(parent).kind.value.is_container(),
            "cannot add a child to a {} value",
            arena.node(parent).kind.name()
        );
        if parent == root {
            assert!(
                arena.root_accepts(root, node),
                "document root already holds a top-level value or fields"
            );
        }
        arena.append(parent, node);
        arena.wrapper_mut(child).parent = Some(parent_slot);
        if return_child {
            child
        } else {
            self
        }
    }

    /// Append a new empty anonymous object.
    pub fn add_object(self, doc: &mut Document, return_child: bool) -> ValueNode {
        let child = doc.create_object();
        self.add_child(doc, child, return_child)
    }

    /// Append a new empty anonymous array.
    pub fn add_array(self, doc: &mut Document, return_child: bool) -> ValueNode {
        let child = doc.create_array();
        self.add_child(doc, child, return_child)
    }

    /// Append a field named `tag` holding `node`.
    pub fn add_child_named(
        self,
        doc: &mut Document,
        tag: &str,
        node: ValueNode,
        return_child: bool,
    ) -> ValueNode {
        let field = doc.create_field(tag, node);
        self.add_child(doc, field, return_child)
    }

    /// Append a field named `tag` holding a new empty object.
    ///
    /// With `return_child` the new object is returned, ready for its own
    /// members; the field itself is not.
    pub fn add_object_named(self, doc: &mut Document, tag: &str, return_child: bool) -> ValueNode {
        let object = doc.create_object();
        self.add_child_named(doc, tag, object, false);
        if return_child {
            object
        } else {
            self
        }
    }

    pub fn add_text(self, doc: &mut Document, tag: &str, value: &str, return_child: bool) -> ValueNode {
        let child = doc.create_text(tag, value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_i64(self, doc: &mut Document, tag: &str, value: i64, return_child: bool) -> ValueNode {
        let child = doc.create_i64(tag, value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_f64(self, doc: &mut Document, tag: &str, value: f64, return_child: bool) -> ValueNode {
        let child = doc.create_f64(tag, value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_f64_precision(
        self,
        doc: &mut Document,
        tag: &str,
        value: f64,
        precision: usize,
        return_child: bool,
    ) -> ValueNode {
        let child = doc.create_f64_precision(tag, value, precision);
        self.add_child(doc, child, return_child)
    }

    pub fn add_bool(self, doc: &mut Document, tag: &str, value: bool, return_child: bool) -> ValueNode {
        let child = doc.create_bool(tag, value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_null(self, doc: &mut Document, tag: &str, return_child: bool) -> ValueNode {
        let child = doc.create_null(tag);
        self.add_child(doc, child, return_child)
    }

    pub fn add_array_text(self, doc: &mut Document, text: &str, return_child: bool) -> ValueNode {
        let child = doc.create_array_text(text);
        self.add_child(doc, child, return_child)
    }

    pub fn add_array_i64(self, doc: &mut Document, value: i64, return_child: bool) -> ValueNode {
        let child = doc.create_array_i64(value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_array_f64(self, doc: &mut Document, value: f64, return_child: bool) -> ValueNode {
        let child = doc.create_array_f64(value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_array_bool(self, doc: &mut Document, value: bool, return_child: bool) -> ValueNode {
        let child = doc.create_array_bool(value);
        self.add_child(doc, child, return_child)
    }

    pub fn add_array_null(self, doc: &mut Document, return_child: bool) -> ValueNode {
        let child = doc.create_array_null();
        self.add_child(doc, child, return_child)
    }

    /// Unlink this subtree from its parent.
    ///
    /// The wrapper and the subtree stay readable until the arena is reset.
    /// Returns false when the node was not attached.
    pub fn detach(self, doc: &mut Document) -> bool {
        let mut arena = doc.arena.borrow_mut();
        let node = doc.load(&arena, self).node;
        let detached = arena.detach(node);
        if detached {
            arena.wrapper_mut(self).parent = None;
        }
        detached
    }
}

/// Iterator over a node's immediate children.
///
/// Yields a fresh wrapper per child and leaves the node's cursor alone.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
    generation: u32,
}

impl Iterator for Children<'_> {
    type Item = ValueNode;

    fn next(&mut self) -> Option<ValueNode> {
        let current = self.next?;
        let mut arena = self.doc.arena.borrow_mut();
        assert_eq!(
            arena.generation(),
            self.generation,
            "arena reset while iterating children"
        );
        self.next = arena.node(current).next_sibling;
        Some(self.doc.wrap(&mut arena, current))
    }
}
