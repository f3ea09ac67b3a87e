//! Document configuration.
//!
//! ```
//! use jsondom_core::{DocFlags, DocumentConfig};
//!
//! let config = DocumentConfig::default()
//!     .with_flags(DocFlags::ADD_SPACE)
//!     .with_max_depth(64)
//!     .with_chunk_size(16 * 1024);
//! assert!(!config.flags.contains(DocFlags::PART_WORD));
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Per-document behaviour switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct DocFlags: u8 {
        /// Emit a space after `:` and `,` when rendering.
        const ADD_SPACE = 0b0000_0001;
        /// Hold back a UTF-8 character split across two parse chunks.
        const PART_WORD = 0b0000_0010;
    }
}

impl Default for DocFlags {
    fn default() -> Self {
        DocFlags::PART_WORD
    }
}

/// Parser resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Limits {
    /// Deepest container nesting accepted before the parse fails.
    pub max_depth: usize,
}

impl Limits {
    pub const DEFAULT_MAX_DEPTH: usize = 512;
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: Self::DEFAULT_MAX_DEPTH }
    }
}

/// Arena sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArenaConfig {
    /// Capacity of each text chunk. Larger payloads get a chunk of their own.
    pub chunk_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self { chunk_size: 4096 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DocumentConfig {
    pub flags: DocFlags,
    pub limits: Limits,
    pub arena: ArenaConfig,
}

impl DocumentConfig {
    pub fn with_flags(mut self, flags: DocFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.arena.chunk_size = chunk_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert_eq!(config.flags, DocFlags::PART_WORD);
        assert_eq!(config.limits.max_depth, 512);
        assert_eq!(config.arena.chunk_size, 4096);
    }

    #[test]
    fn test_builders() {
        let config = DocumentConfig::default()
            .with_flags(DocFlags::ADD_SPACE | DocFlags::PART_WORD)
            .with_max_depth(3)
            .with_chunk_size(128);
        assert!(config.flags.contains(DocFlags::ADD_SPACE));
        assert_eq!(config.limits.max_depth, 3);
        assert_eq!(config.arena.chunk_size, 128);
    }
}
