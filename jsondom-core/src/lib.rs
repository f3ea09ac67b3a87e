//! jsondom core
//!
//! Arena-backed, mutable, queryable JSON document object model.
//! Parse text (in one go or in chunks), or build a tree with factories, then
//! navigate, search by tag, edit in place and serialize back to text.
//!
//! # Architecture
//!
//! - **arena.rs** - Bump region for text, graph nodes and wrapper records; bulk reset
//! - **kind.rs** - Two-axis node type tag, lenient scalar conversions
//! - **graph.rs** - Underlying node graph: link, unlink, copy, walk, search
//! - **parser.rs** - Incremental push parser building graph nodes
//! - **render.rs** - Compact JSON builder
//! - **node.rs** - `ValueNode` handles: accessors, navigation, editing
//! - **document.rs** - `Document`: parsing, tag search, factories, output
//! - **config.rs** - Flags, limits and arena sizing
//! - **error.rs** - Parse diagnostics
//!
//! # Example
//!
//! ```
//! use jsondom_core::Document;
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! root.add_i64(&mut doc, "a", 1, false);
//! let list = doc.create_array();
//! list.add_array_bool(&mut doc, true, false)
//!     .add_array_null(&mut doc, false);
//! root.add_child_named(&mut doc, "b", list, false);
//! assert_eq!(doc.render(None, false), r#"{"a":1,"b":[true,null]}"#);
//!
//! let b = doc.find_first_by_tag("B").unwrap();
//! assert_eq!(b.kind_name(&doc), "array");
//! ```

pub mod arena;
pub mod config;
pub mod document;
pub mod error;
mod graph;
pub mod kind;
pub mod node;
mod parser;
mod render;

pub use arena::{Arena, Block, SharedArena};
pub use config::{ArenaConfig, DocFlags, DocumentConfig, Limits};
pub use document::{Descendants, Document};
pub use error::{ParseError, ParseErrorCode};
pub use kind::{Kind, Position, ValueKind};
pub use node::{Children, ValueNode};
