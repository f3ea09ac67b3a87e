//! Bump arena backing document graphs and their wrappers.
//!
//! Everything a document allocates lives here:
//! - **byte chunks** - tags, text payloads and raw blocks, bump allocated
//! - **nodes** - the underlying JSON graph (see `graph.rs`)
//! - **wrappers** - `ValueNode` records with their memoized slots
//!
//! Nothing is ever freed individually. `reset()` drops everything at once
//! and bumps a generation counter; handles minted before the reset carry the
//! old generation and are rejected when used.
//!
//! # Memory Layout
//!
//! ```text
//! chunks:   [ chunk 0 (kept across resets) ][ chunk 1 ][ chunk 2 ] ...
//!               ▲ Block { chunk, start, end } points into one chunk
//! nodes:    Vec<NodeData>   addressed by NodeId
//! wrappers: Vec<Wrapper>    addressed by ValueNode { arena, generation, slot }
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::config::ArenaConfig;
use crate::graph::NodeData;
use crate::node::{ValueNode, Wrapper};

/// An arena shared by every document built on it.
pub type SharedArena = Rc<RefCell<Arena>>;

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// A reference to a run of bytes within one arena chunk.
///
/// This is 12 bytes: chunk (u32) + start (u32) + end (u32), and stays
/// valid until the arena is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Index into the chunk list
    pub chunk: u32,
    /// Start offset within the chunk
    pub start: u32,
    /// End offset within the chunk (exclusive)
    pub end: u32,
}

impl Block {
    const EMPTY: Block = Block { chunk: 0, start: 0, end: 0 };

    /// Length of the block in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Check if the block is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Identifies a document within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DocumentId(u32);

/// Bulk-allocate, bulk-reset region for one or more documents.
#[derive(Debug)]
pub struct Arena {
    id: u32,
    generation: u32,
    chunk_size: usize,
    /// Each chunk is allocated with a fixed capacity and never grows past it.
    chunks: Vec<Vec<u8>>,
    pub(crate) nodes: Vec<NodeData>,
    wrappers: Vec<Wrapper>,
    next_document: u32,
}

impl Arena {
    /// Create an empty arena.
    pub fn new(config: ArenaConfig) -> Self {
        let chunk_size = config.chunk_size.max(64);
        Self {
            id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            chunk_size,
            chunks: vec![Vec::with_capacity(chunk_size)],
            nodes: Vec::new(),
            wrappers: Vec::new(),
            next_document: 0,
        }
    }

    /// Create an arena ready to be shared between documents.
    pub fn shared(config: ArenaConfig) -> SharedArena {
        Rc::new(RefCell::new(Self::new(config)))
    }

    #[inline]
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    /// Number of resets this arena has gone through.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Bytes handed out from the chunk region since the last reset.
    pub fn allocated_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Number of underlying graph nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of wrapper records created since the last reset.
    pub fn wrapper_count(&self) -> usize {
        self.wrappers.len()
    }

    /// Allocate a zeroed block of `size` bytes.
    pub fn allocate(&mut self, size: usize) -> Block {
        if size == 0 {
            return Block::EMPTY;
        }
        let fits = self
            .chunks
            .last()
            .is_some_and(|chunk| chunk.capacity() - chunk.len() >= size);
        if !fits {
            self.chunks.push(Vec::with_capacity(self.chunk_size.max(size)));
        }
        let chunk_idx = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_idx];
        let start = chunk.len();
        chunk.resize(start + size, 0);
        Block {
            chunk: chunk_idx as u32,
            start: start as u32,
            end: (start + size) as u32,
        }
    }

    /// Copy `text` into the arena.
    pub fn alloc_str(&mut self, text: &str) -> Block {
        let block = self.allocate(text.len());
        self.bytes_mut(block).copy_from_slice(text.as_bytes());
        block
    }

    /// Resolve a block to its bytes.
    #[inline]
    pub fn bytes(&self, block: Block) -> &[u8] {
        if block.is_empty() {
            return &[];
        }
        &self.chunks[block.chunk as usize][block.start as usize..block.end as usize]
    }

    /// Resolve a block to its bytes, mutably.
    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        if block.is_empty() {
            return &mut [];
        }
        &mut self.chunks[block.chunk as usize][block.start as usize..block.end as usize]
    }

    /// Resolve a block written by `alloc_str`.
    #[inline]
    pub(crate) fn str(&self, block: Block) -> &str {
        std::str::from_utf8(self.bytes(block)).unwrap_or_default()
    }

    /// Invalidate every block, node and wrapper at once.
    ///
    /// The first chunk keeps its capacity for reuse.
    pub fn reset(&mut self) {
        debug!(
            arena = self.id,
            generation = self.generation,
            nodes = self.nodes.len(),
            wrappers = self.wrappers.len(),
            bytes = self.allocated_bytes(),
            "arena reset"
        );
        self.chunks.truncate(1);
        if let Some(first) = self.chunks.first_mut() {
            first.clear();
        }
        self.nodes.clear();
        self.wrappers.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub(crate) fn next_document_id(&mut self) -> DocumentId {
        self.next_document += 1;
        DocumentId(self.next_document)
    }

    // ========================================================================
    // Wrapper records
    // ========================================================================

    /// Store a wrapper record and mint a handle for it.
    pub(crate) fn create(&mut self, wrapper: Wrapper) -> ValueNode {
        let slot = self.wrappers.len() as u32;
        self.wrappers.push(wrapper);
        self.handle(slot)
    }

    /// Handle for an existing slot of the current generation.
    #[inline]
    pub(crate) fn handle(&self, slot: u32) -> ValueNode {
        ValueNode {
            arena: self.id,
            generation: self.generation,
            slot,
        }
    }

    /// Look up a wrapper, failing fast on foreign or stale handles.
    pub(crate) fn wrapper(&self, handle: ValueNode) -> &Wrapper {
        self.check(handle);
        &self.wrappers[handle.slot as usize]
    }

    pub(crate) fn wrapper_mut(&mut self, handle: ValueNode) -> &mut Wrapper {
        self.check(handle);
        &mut self.wrappers[handle.slot as usize]
    }

    fn check(&self, handle: ValueNode) {
        assert_eq!(
            handle.arena, self.id,
            "ValueNode used with a document from a different arena"
        );
        assert_eq!(
            handle.generation, self.generation,
            "stale ValueNode used after its arena was reset"
        );
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}
