//! JSON text builder.
//!
//! Output is compact. With `add_space` a single space follows every `:` and
//! `,`. Strings and tags are escaped; numeric, boolean and null payloads are
//! written as stored.
//!
//! Walks with an explicit stack so hand-built trees deeper than the parser's
//! limit still render.

use std::fmt::Write as _;

use crate::arena::Arena;
use crate::graph::NodeId;
use crate::kind::{Position, ValueKind};

enum Step {
    /// Tag (for fields) followed by the value.
    Member(NodeId),
    /// Value only.
    Value(NodeId),
    Separator,
    Close(char),
}

/// Render a whole document.
///
/// A root holding exactly one anonymous value renders as that value.
/// Otherwise the root holds only fields and renders as an object of them.
pub(crate) fn write_document(arena: &Arena, root: NodeId, out: &mut String, add_space: bool) {
    let data = arena.node(root);
    match data.first_child {
        Some(only)
            if data.child_count == 1
                && arena.node(only).kind.position == Position::Element =>
        {
            write_node(arena, only, out, add_space)
        }
        _ => write_steps(arena, Step::Value(root), out, add_space),
    }
}

/// Render the subtree under `node`, including its tag when it is a field.
pub(crate) fn write_node(arena: &Arena, node: NodeId, out: &mut String, add_space: bool) {
    write_steps(arena, Step::Member(node), out, add_space)
}

fn write_steps(arena: &Arena, first: Step, out: &mut String, add_space: bool) {
    let mut stack = vec![first];
    while let Some(step) = stack.pop() {
        match step {
            Step::Separator => {
                out.push(',');
                if add_space {
                    out.push(' ');
                }
            }
            Step::Close(ch) => out.push(ch),
            Step::Member(id) => {
                let data = arena.node(id);
                if data.kind.position == Position::Field {
                    let tag = data.tag.map(|b| arena.str(b)).unwrap_or_default();
                    write_string(tag, out);
                    out.push(':');
                    if add_space {
                        out.push(' ');
                    }
                }
                stack.push(Step::Value(data.target.unwrap_or(id)));
            }
            Step::Value(id) => {
                let data = arena.node(id);
                let (open, close) = match data.kind.value {
                    ValueKind::Object => ('{', '}'),
                    ValueKind::Array => ('[', ']'),
                    leaf => {
                        let text = data.text.map(|b| arena.str(b)).unwrap_or_default();
                        write_scalar(leaf, text, out);
                        continue;
                    }
                };
                out.push(open);
                stack.push(Step::Close(close));
                let mut cur = data.last_child;
                let mut last = true;
                while let Some(child) = cur {
                    if !last {
                        stack.push(Step::Separator);
                    }
                    stack.push(Step::Member(child));
                    last = false;
                    cur = arena.node(child).prev_sibling;
                }
            }
        }
    }
}

fn write_scalar(kind: ValueKind, text: &str, out: &mut String) {
    match kind {
        ValueKind::String => write_string(text, out),
        _ if !text.is_empty() => out.push_str(text),
        ValueKind::Number | ValueKind::Double => out.push('0'),
        ValueKind::Bool => out.push_str("false"),
        _ => out.push_str("null"),
    }
}

/// Quote and escape `s`.
pub(crate) fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
