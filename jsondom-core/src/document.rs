//! `Document` - owner of a JSON tree, its parser and its query cache.
//!
//! A document keeps an invisible root node. Parsed or hand-built values hang
//! from it; rendering a root with a single anonymous value yields just that
//! value.
//!
//! ```
//! use jsondom_core::Document;
//!
//! let mut doc = Document::from_text(r#"{"a":1,"b":[true,null]}"#);
//! let b = doc.find_first_by_tag("b").unwrap();
//! b.nested_object_view(&doc).unwrap().add_array_i64(&mut doc, 7, false);
//! assert_eq!(doc.render(None, false), r#"{"a":1,"b":[true,null,7]}"#);
//! ```
//!
//! Several documents may share one arena. Resetting through any of them
//! invalidates every handle minted on that arena; the other documents notice
//! the new generation and start over from an empty root.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::arena::{Arena, DocumentId, SharedArena};
use crate::config::{DocFlags, DocumentConfig};
use crate::error::{ParseError, ParseErrorCode};
use crate::graph::NodeId;
use crate::kind::{format_double, ValueKind};
use crate::node::{Cursor, ValueNode, Wrapper};
use crate::parser::Parser;
use crate::render::write_document;

#[derive(Debug)]
pub struct Document {
    pub(crate) arena: SharedArena,
    pub(crate) id: DocumentId,
    flags: DocFlags,
    config: DocumentConfig,
    root: Cell<NodeId>,
    /// Arena generation `root` belongs to.
    generation: Cell<u32>,
    root_wrapper: Cell<Option<ValueNode>>,
    cursor: Cell<Cursor>,
    buffer: String,
    /// Scratch buffers for `ValueNode::render`, one per wrapper.
    pub(crate) node_buffers: FxHashMap<ValueNode, String>,
    /// Results of the last tag search.
    query: Vec<ValueNode>,
    parser: Parser,
}

impl Document {
    /// Create an empty document with its own arena.
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        Self::with_arena(Arena::shared(config.arena), config)
    }

    /// Create an empty document on an existing, possibly shared, arena.
    ///
    /// `config.arena` is ignored; the arena is already sized.
    pub fn with_arena(arena: SharedArena, config: DocumentConfig) -> Self {
        let (id, root, generation) = {
            let mut a = arena.borrow_mut();
            (a.next_document_id(), a.new_root(), a.generation())
        };
        Self {
            arena,
            id,
            flags: config.flags,
            config,
            root: Cell::new(root),
            generation: Cell::new(generation),
            root_wrapper: Cell::new(None),
            cursor: Cell::new(Cursor::Unset),
            buffer: String::new(),
            node_buffers: FxHashMap::default(),
            query: Vec::new(),
            parser: Parser::new(config.limits, generation),
        }
    }

    /// Parse `text` into a new document.
    ///
    /// Malformed input is not an error here: the document keeps whatever was
    /// built before the problem and [`Document::error`] describes it.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.parse(text);
        doc.finish();
        doc
    }

    /// Parse `text`, which must hold exactly one complete JSON value.
    pub fn parse_complete(text: &str) -> Result<Self, ParseError> {
        let mut doc = Self::new();
        let rest = doc.parse(text);
        let done = doc.finish();
        if let Some(err) = doc.error() {
            return Err(*err);
        }
        if !done {
            return Err(doc.parser.eof_error());
        }
        let trimmed = rest.trim_start();
        if !trimmed.is_empty() {
            let offset = text.len() - trimmed.len();
            return Err(ParseError::new(ParseErrorCode::TrailingData, offset as u64));
        }
        Ok(doc)
    }

    /// New document on `src`'s arena, rooted at a copy of `node`.
    pub fn from_node(src: &Document, node: ValueNode) -> Self {
        src.root_node();
        let doc = Self::with_arena(Rc::clone(&src.arena), src.config);
        {
            let mut arena = doc.arena.borrow_mut();
            let source = src.load(&arena, node).node;
            let copy = arena.copy_subtree(None, source);
            arena.append(doc.root.get(), copy);
        }
        doc
    }

    /// The arena backing this document, for sharing with other documents.
    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn flags(&self) -> DocFlags {
        self.flags
    }

    // ========================================================================
    // Root and handles
    // ========================================================================

    /// Current root node, re-created when another document sharing the
    /// arena has reset it.
    pub(crate) fn root_node(&self) -> NodeId {
        let stale = self.arena.borrow().generation() != self.generation.get();
        if stale {
            let mut arena = self.arena.borrow_mut();
            self.root.set(arena.new_root());
            self.generation.set(arena.generation());
            self.root_wrapper.set(None);
            self.cursor.set(Cursor::Unset);
            debug!(
                document = ?self.id,
                generation = arena.generation(),
                "shared arena was reset, starting from an empty root"
            );
        }
        self.root.get()
    }

    /// Bring document-level state in line with the arena before an edit.
    fn sync(&mut self) -> NodeId {
        let before = self.generation.get();
        let root = self.root_node();
        if self.generation.get() != before {
            self.query.clear();
            self.node_buffers.clear();
            self.buffer.clear();
        }
        if self.parser.generation() != self.generation.get() {
            self.parser.reset(self.generation.get());
        }
        root
    }

    /// Resolve a handle, failing fast when it is stale, foreign, or minted
    /// by another document on the same arena.
    pub(crate) fn load(&self, arena: &Arena, node: ValueNode) -> Wrapper {
        let wrapper = *arena.wrapper(node);
        assert_eq!(
            wrapper.owner, self.id,
            "ValueNode used with a document that does not own it"
        );
        wrapper
    }

    pub(crate) fn wrap(&self, arena: &mut Arena, node: NodeId) -> ValueNode {
        arena.create(Wrapper::new(node, self.id))
    }

    /// Wrapper for the root. Repeated calls return the same handle.
    pub fn root(&self) -> ValueNode {
        let root = self.root_node();
        if let Some(handle) = self.root_wrapper.get() {
            return handle;
        }
        let handle = self.wrap(&mut self.arena.borrow_mut(), root);
        self.root_wrapper.set(Some(handle));
        handle
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Feed a chunk of JSON text.
    ///
    /// Returns what follows the top-level value once it is complete, and an
    /// empty string while more input is needed or after an error.
    pub fn parse<'t>(&mut self, text: &'t str) -> &'t str {
        let used = self.parse_bytes(text.as_bytes());
        if self.parser.is_done() {
            text.get(used..).unwrap_or_default()
        } else {
            ""
        }
    }

    /// Feed raw bytes; returns how many belonged to the current value.
    ///
    /// Chunks may split a UTF-8 character; see [`Document::part_word`].
    pub fn parse_bytes(&mut self, bytes: &[u8]) -> usize {
        let root = self.sync();
        let part_word = self.flags.contains(DocFlags::PART_WORD);
        let mut arena = self.arena.borrow_mut();
        self.parser.feed(&mut arena, root, bytes, part_word)
    }

    /// Signal end of input. True when one complete value was parsed.
    pub fn finish(&mut self) -> bool {
        let root = self.sync();
        let mut arena = self.arena.borrow_mut();
        self.parser.finish(&mut arena, root)
    }

    /// First syntax error, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.parser.error()
    }

    /// Hold back (`true`) or decode on the spot (`false`) a UTF-8
    /// character cut by a chunk boundary.
    pub fn part_word(&mut self, on: bool) {
        self.flags.set(DocFlags::PART_WORD, on);
    }

    // ========================================================================
    // Tag search
    // ========================================================================

    fn search(&mut self, find: impl FnOnce(&Arena, NodeId) -> Vec<NodeId>) -> Vec<ValueNode> {
        let root = self.sync();
        self.query.clear();
        let mut arena = self.arena.borrow_mut();
        let hits = find(&*arena, root);
        for hit in hits {
            let handle = arena.create(Wrapper::new(hit, self.id));
            self.query.push(handle);
        }
        self.query.clone()
    }

    /// First node in document order whose tag matches, ignoring ASCII case.
    pub fn find_first_by_tag(&mut self, tag: &str) -> Option<ValueNode> {
        self.search(|arena, root| arena.find_by_tag(root, tag, true))
            .first()
            .copied()
    }

    /// Every node whose tag matches, in document order.
    pub fn find_all_by_tag(&mut self, tag: &str) -> Vec<ValueNode> {
        self.search(|arena, root| arena.find_by_tag(root, tag, false))
    }

    /// Every node matching a `/`-separated tag path such as `"a/b/c"`.
    ///
    /// The last segment names the node itself; the others must match its
    /// nearest named ancestors in order. Anonymous containers in between
    /// are skipped and empty segments are ignored.
    pub fn find_all_by_tags(&mut self, path: &str) -> Vec<ValueNode> {
        self.search(|arena, root| arena.find_by_tags(root, path, false))
    }

    pub fn find_first_by_tags(&mut self, path: &str) -> Option<ValueNode> {
        self.search(|arena, root| arena.find_by_tags(root, path, true))
            .first()
            .copied()
    }

    /// Same as [`Document::find_first_by_tag`].
    pub fn get(&mut self, tag: &str) -> Option<ValueNode> {
        self.find_first_by_tag(tag)
    }

    /// Wrappers produced by the last search.
    pub fn query_results(&self) -> &[ValueNode] {
        &self.query
    }

    // ========================================================================
    // Top-level iteration
    // ========================================================================

    /// Start the single-cursor iteration over the root's values.
    pub fn first_node(&self) -> Option<ValueNode> {
        let root = self.root_node();
        let mut arena = self.arena.borrow_mut();
        match arena.node(root).first_child {
            Some(node) => {
                self.cursor.set(Cursor::At(node));
                Some(self.wrap(&mut arena, node))
            }
            None => {
                self.cursor.set(Cursor::Unset);
                None
            }
        }
    }

    /// # Panics
    ///
    /// When no successful `first_node` call precedes it.
    pub fn next_node(&self) -> Option<ValueNode> {
        self.root_node();
        let mut arena = self.arena.borrow_mut();
        let next = match self.cursor.get() {
            Cursor::Unset => panic!("next_node called without a successful first_node"),
            Cursor::Exhausted => return None,
            Cursor::At(current) => arena.node(current).next_sibling,
        };
        match next {
            Some(node) => {
                self.cursor.set(Cursor::At(node));
                Some(self.wrap(&mut arena, node))
            }
            None => {
                self.cursor.set(Cursor::Exhausted);
                None
            }
        }
    }

    /// Every node below the root, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        let root = self.root_node();
        let arena = self.arena.borrow();
        Descendants {
            doc: self,
            root,
            next: arena.next_in_order(root, root),
            generation: arena.generation(),
        }
    }

    // ========================================================================
    // Node factories
    // ========================================================================

    fn create_leaf(&mut self, tag: Option<&str>, kind: ValueKind, text: &str) -> ValueNode {
        self.sync();
        let mut arena = self.arena.borrow_mut();
        let node = arena.new_leaf(tag, kind, text);
        arena.create(Wrapper::new(node, self.id))
    }

    /// Named string field.
    pub fn create_text(&mut self, tag: &str, value: &str) -> ValueNode {
        self.create_leaf(Some(tag), ValueKind::String, value)
    }

    pub fn create_i64(&mut self, tag: &str, value: i64) -> ValueNode {
        self.create_leaf(Some(tag), ValueKind::Number, &value.to_string())
    }

    /// Named double field in shortest round-trip form.
    pub fn create_f64(&mut self, tag: &str, value: f64) -> ValueNode {
        self.create_leaf(Some(tag), ValueKind::Double, &format_double(value, None))
    }

    /// Named double field with exactly `precision` decimals.
    pub fn create_f64_precision(&mut self, tag: &str, value: f64, precision: usize) -> ValueNode {
        let text = format_double(value, Some(precision));
        self.create_leaf(Some(tag), ValueKind::Double, &text)
    }

    pub fn create_bool(&mut self, tag: &str, value: bool) -> ValueNode {
        self.create_leaf(Some(tag), ValueKind::Bool, bool_text(value))
    }

    pub fn create_null(&mut self, tag: &str) -> ValueNode {
        self.create_leaf(Some(tag), ValueKind::Null, "null")
    }

    /// Anonymous string element.
    pub fn create_array_text(&mut self, text: &str) -> ValueNode {
        self.create_leaf(None, ValueKind::String, text)
    }

    pub fn create_array_i64(&mut self, value: i64) -> ValueNode {
        self.create_leaf(None, ValueKind::Number, &value.to_string())
    }

    pub fn create_array_f64(&mut self, value: f64) -> ValueNode {
        self.create_leaf(None, ValueKind::Double, &format_double(value, None))
    }

    pub fn create_array_bool(&mut self, value: bool) -> ValueNode {
        self.create_leaf(None, ValueKind::Bool, bool_text(value))
    }

    pub fn create_array_null(&mut self) -> ValueNode {
        self.create_leaf(None, ValueKind::Null, "null")
    }

    /// Empty anonymous object or array.
    pub fn create_node(&mut self, as_array: bool) -> ValueNode {
        self.sync();
        let kind = if as_array { ValueKind::Array } else { ValueKind::Object };
        let mut arena = self.arena.borrow_mut();
        let node = arena.new_container(kind);
        arena.create(Wrapper::new(node, self.id))
    }

    pub fn create_object(&mut self) -> ValueNode {
        self.create_node(false)
    }

    pub fn create_array(&mut self) -> ValueNode {
        self.create_node(true)
    }

    /// Field named `tag` holding `node`.
    ///
    /// `node` becomes the field's only child, moving it if it was attached.
    pub fn create_field(&mut self, tag: &str, node: ValueNode) -> ValueNode {
        self.sync();
        let mut arena = self.arena.borrow_mut();
        let value = self.load(&arena, node).node;
        let field = arena.new_field(tag, value);
        arena.create(Wrapper::new(field, self.id))
    }

    /// Deep, detached copy of `node`.
    pub fn duplicate_node(&mut self, node: ValueNode) -> ValueNode {
        self.sync();
        let mut arena = self.arena.borrow_mut();
        let source = self.load(&arena, node).node;
        let copy = arena.copy_subtree(None, source);
        arena.create(Wrapper::new(copy, self.id))
    }

    /// Deep, detached copy of a node owned by another document.
    pub fn import_node(&mut self, from: &Document, node: ValueNode) -> ValueNode {
        self.sync();
        let copy = if Rc::ptr_eq(&self.arena, &from.arena) {
            let mut arena = self.arena.borrow_mut();
            let source = from.load(&arena, node).node;
            arena.copy_subtree(None, source)
        } else {
            let src = from.arena.borrow();
            let source = from.load(&src, node).node;
            self.arena.borrow_mut().copy_subtree(Some(&*src), source)
        };
        self.wrap(&mut self.arena.borrow_mut(), copy)
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Serialize the document.
    ///
    /// Appends to `out` when given; otherwise writes into the document's
    /// buffer, cleared first. `add_space` also becomes the spacing used by
    /// [`ValueNode::render`].
    pub fn render<'a>(&'a mut self, out: Option<&'a mut String>, add_space: bool) -> &'a str {
        let root = self.sync();
        self.flags.set(DocFlags::ADD_SPACE, add_space);
        let arena = self.arena.borrow();
        let out = match out {
            Some(out) => out,
            None => {
                self.buffer.clear();
                &mut self.buffer
            }
        };
        write_document(&arena, root, out, add_space);
        drop(arena);
        out
    }

    /// Append the serialized document to `out`.
    pub fn build_into(&mut self, out: &mut String, add_space: bool) {
        self.render(Some(out), add_space);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drop the whole tree and every wrapper on the arena, then start over
    /// from an empty root.
    pub fn reset(&mut self) {
        self.clear();
        self.node_buffers.clear();
        let mut arena = self.arena.borrow_mut();
        arena.reset();
        let generation = arena.generation();
        self.root.set(arena.new_root());
        self.generation.set(generation);
        self.root_wrapper.set(None);
        self.cursor.set(Cursor::Unset);
        self.parser.reset(generation);
        debug!(document = ?self.id, generation, "document reset");
    }

    /// Empty the render buffer and the search results.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.query.clear();
    }

    /// Parse `input` and echo up to `max` bytes of it into `out`
    /// (`max == 0` means all of it). Returns the number of bytes echoed.
    pub fn push_pop(&mut self, input: &str, out: Option<&mut String>, max: usize) -> usize {
        self.parse(input);
        let Some(out) = out else {
            return 0;
        };
        let mut len = input.len();
        if max > 0 && len > max {
            len = max;
            while !input.is_char_boundary(len) {
                len -= 1;
            }
        }
        out.push_str(&input[..len]);
        len
    }

    /// Nothing is ever buffered for output, so there is never anything to
    /// flush.
    pub fn pop_end(&mut self, _out: Option<&mut String>, _max: usize) -> usize {
        0
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root_node();
        let mut out = String::new();
        write_document(
            &self.arena.borrow(),
            root,
            &mut out,
            self.flags.contains(DocFlags::ADD_SPACE),
        );
        f.write_str(&out)
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Iterator over every node below a document's root, in document order.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
    generation: u32,
}

impl Iterator for Descendants<'_> {
    type Item = ValueNode;

    fn next(&mut self) -> Option<ValueNode> {
        let current = self.next?;
        let mut arena = self.doc.arena.borrow_mut();
        assert_eq!(
            arena.generation(),
            self.generation,
            "arena reset while iterating descendants"
        );
        self.next = arena.next_in_order(current, self.root);
        Some(self.doc.wrap(&mut arena, current))
    }
}
