//! Incremental JSON parser.
//!
//! A push-based state machine that builds graph nodes as it goes. Input may
//! be fed in chunks of any size, split at any byte: strings, numbers and
//! literals resume where the previous chunk stopped.
//!
//! ```text
//! feed(b"{\"a\":[1,")  →  root ─ {} ─ "a" ─ [] ─ 1        (state: Value)
//! feed(b"true]}")      →  root ─ {} ─ "a" ─ [] ─ 1, true  (state: Done)
//! ```
//!
//! Parsing stops after the first complete top-level value; whatever follows
//! is left unconsumed for the caller. The first syntax error is recorded and
//! everything after it is ignored.

use memchr::memchr2;
use phf::phf_map;
use tracing::{debug, trace};

use crate::arena::Arena;
use crate::config::Limits;
use crate::error::{ParseError, ParseErrorCode};
use crate::graph::NodeId;
use crate::kind::ValueKind;

static LITERALS: phf::Map<&'static str, ValueKind> = phf_map! {
    "true" => ValueKind::Bool,
    "false" => ValueKind::Bool,
    "null" => ValueKind::Null,
};

/// Longest entry in `LITERALS`.
const MAX_LITERAL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting any value.
    Value,
    /// Just after `[`: a value or `]`.
    ArrayFirst,
    /// Just after `{`: a key or `}`.
    ObjectFirst,
    /// After `,` inside an object.
    Key,
    Colon,
    /// After a value inside a container: `,` or the closing bracket.
    Separator,
    Str { key: bool },
    Number,
    Literal,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode { value: u32, digits: u8 },
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    kind: ValueKind,
}

#[derive(Debug)]
pub(crate) struct Parser {
    state: State,
    stack: Vec<Frame>,
    /// Raw bytes of the token being scanned.
    token: Vec<u8>,
    /// Prefix of `token` already known to be valid UTF-8.
    committed: usize,
    /// Key waiting for its value.
    key: Option<String>,
    escape: Escape,
    high_surrogate: Option<u32>,
    offset: u64,
    max_depth: usize,
    error: Option<ParseError>,
    /// Arena generation the open frames belong to.
    generation: u32,
}

impl Parser {
    pub(crate) fn new(limits: Limits, generation: u32) -> Self {
        Self {
            state: State::Value,
            stack: Vec::new(),
            token: Vec::new(),
            committed: 0,
            key: None,
            escape: Escape::None,
            high_surrogate: None,
            offset: 0,
            max_depth: limits.max_depth,
            error: None,
            generation,
        }
    }

    /// Forget all progress; the next byte starts a new top-level value.
    pub(crate) fn reset(&mut self, generation: u32) {
        self.state = State::Value;
        self.stack.clear();
        self.token.clear();
        self.committed = 0;
        self.key = None;
        self.escape = Escape::None;
        self.high_surrogate = None;
        self.offset = 0;
        self.error = None;
        self.generation = generation;
    }

    #[inline]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub(crate) fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Error describing input that stopped inside a value.
    pub(crate) fn eof_error(&self) -> ParseError {
        ParseError::new(ParseErrorCode::UnexpectedEof, self.offset)
    }

    // ========================================================================
    // Feeding
    // ========================================================================

    /// Consume as much of `input` as belongs to the current top-level value,
    /// attaching new nodes under `root`. Returns the number of bytes used.
    pub(crate) fn feed(
        &mut self,
        arena: &mut Arena,
        root: NodeId,
        input: &[u8],
        part_word: bool,
    ) -> usize {
        trace!(bytes = input.len(), offset = self.offset, "parse chunk");
        let mut pos = 0;
        while pos < input.len() {
            match self.state {
                State::Done | State::Failed => break,
                State::Str { key } => pos = self.scan_string(arena, root, input, pos, key),
                _ => {
                    if self.step(arena, root, input[pos]) {
                        pos += 1;
                        self.offset += 1;
                    }
                }
            }
        }
        if !part_word && matches!(self.state, State::Str { .. }) {
            self.commit_lossy();
        }
        pos
    }

    /// Signal end of input. Completes a trailing top-level number or literal.
    pub(crate) fn finish(&mut self, arena: &mut Arena, root: NodeId) -> bool {
        if self.stack.is_empty() {
            match self.state {
                State::Number => self.finish_number(arena, root),
                State::Literal => self.finish_literal(arena, root),
                _ => {}
            }
        }
        self.is_done()
    }

    /// Handle one byte outside a string. Returns false when the byte must be
    /// looked at again in the new state.
    fn step(&mut self, arena: &mut Arena, root: NodeId, byte: u8) -> bool {
        match self.state {
            State::Value => self.start_value(arena, root, byte),
            State::ArrayFirst => match byte {
                b']' => self.close(arena, root, ValueKind::Array),
                b'}' => self.close(arena, root, ValueKind::Object),
                _ => self.start_value(arena, root, byte),
            },
            State::ObjectFirst => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => true,
                b'}' => self.close(arena, root, ValueKind::Object),
                b']' => self.close(arena, root, ValueKind::Array),
                b'"' => self.begin_string(true),
                _ => self.fail(ParseErrorCode::ExpectedKey),
            },
            State::Key => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => true,
                b'"' => self.begin_string(true),
                _ => self.fail(ParseErrorCode::ExpectedKey),
            },
            State::Colon => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => true,
                b':' => {
                    self.state = State::Value;
                    true
                }
                _ => self.fail(ParseErrorCode::ExpectedColon),
            },
            State::Separator => match byte {
                b' ' | b'\t' | b'\n' | b'\r' => true,
                b',' => match self.stack.last() {
                    Some(Frame { kind: ValueKind::Object, .. }) => {
                        self.state = State::Key;
                        true
                    }
                    Some(_) => {
                        self.state = State::Value;
                        true
                    }
                    None => self.fail(ParseErrorCode::UnexpectedByte),
                },
                b']' => self.close(arena, root, ValueKind::Array),
                b'}' => self.close(arena, root, ValueKind::Object),
                _ => self.fail(ParseErrorCode::ExpectedSeparator),
            },
            State::Number => {
                if matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                    self.token.push(byte);
                    true
                } else {
                    self.finish_number(arena, root);
                    false
                }
            }
            State::Literal => {
                if byte.is_ascii_lowercase() {
                    if self.token.len() == MAX_LITERAL {
                        return self.fail(ParseErrorCode::InvalidLiteral);
                    }
                    self.token.push(byte);
                    true
                } else {
                    self.finish_literal(arena, root);
                    false
                }
            }
            State::Str { .. } | State::Done | State::Failed => false,
        }
    }

    fn start_value(&mut self, arena: &mut Arena, root: NodeId, byte: u8) -> bool {
        match byte {
            b' ' | b'\t' | b'\n' | b'\r' => true,
            _ if self.stack.is_empty() && arena.node(root).first_child.is_some() => {
                self.fail(ParseErrorCode::RootOccupied)
            }
            b'{' => self.open(arena, root, ValueKind::Object),
            b'[' => self.open(arena, root, ValueKind::Array),
            b'"' => self.begin_string(false),
            b'-' | b'0'..=b'9' => {
                self.token.clear();
                self.token.push(byte);
                self.state = State::Number;
                true
            }
            b'a'..=b'z' => {
                self.token.clear();
                self.token.push(byte);
                self.state = State::Literal;
                true
            }
            _ => self.fail(ParseErrorCode::UnexpectedByte),
        }
    }

    fn fail(&mut self, code: ParseErrorCode) -> bool {
        let error = ParseError::new(code, self.offset);
        debug!(%error, "parse failed");
        self.error = Some(error);
        self.state = State::Failed;
        false
    }

    // ========================================================================
    // Tree building
    // ========================================================================

    fn open(&mut self, arena: &mut Arena, root: NodeId, kind: ValueKind) -> bool {
        if self.stack.len() >= self.max_depth {
            return self.fail(ParseErrorCode::DepthLimit);
        }
        let container = arena.new_container(kind);
        match self.stack.last().copied() {
            None => arena.append(root, container),
            Some(Frame { node, kind: ValueKind::Object }) => {
                let key = self.key.take().unwrap_or_default();
                let field = arena.new_field(&key, container);
                arena.append(node, field);
            }
            Some(Frame { node, .. }) => arena.append(node, container),
        }
        self.stack.push(Frame { node: container, kind });
        self.state = match kind {
            ValueKind::Object => State::ObjectFirst,
            _ => State::ArrayFirst,
        };
        true
    }

    fn close(&mut self, arena: &mut Arena, root: NodeId, kind: ValueKind) -> bool {
        match self.stack.last() {
            Some(frame) if frame.kind == kind => {
                self.stack.pop();
                self.value_done(arena, root);
                true
            }
            _ => self.fail(ParseErrorCode::MismatchedBracket),
        }
    }

    fn add_leaf(&mut self, arena: &mut Arena, root: NodeId, kind: ValueKind, text: &str) {
        match self.stack.last().copied() {
            None => {
                let leaf = arena.new_leaf(None, kind, text);
                arena.append(root, leaf);
            }
            Some(Frame { node, kind: ValueKind::Object }) => {
                let key = self.key.take().unwrap_or_default();
                let leaf = arena.new_leaf(Some(&key), kind, text);
                arena.append(node, leaf);
            }
            Some(Frame { node, .. }) => {
                let leaf = arena.new_leaf(None, kind, text);
                arena.append(node, leaf);
            }
        }
        self.value_done(arena, root);
    }

    fn value_done(&mut self, arena: &Arena, root: NodeId) {
        if self.stack.is_empty() {
            self.state = State::Done;
            debug!(
                offset = self.offset,
                nodes = arena.node_count(),
                values = arena.node(root).child_count,
                "parse complete"
            );
        } else {
            self.state = State::Separator;
        }
    }

    // ========================================================================
    // Scalars
    // ========================================================================

    fn finish_number(&mut self, arena: &mut Arena, root: NodeId) {
        let token = std::mem::take(&mut self.token);
        if valid_number(&token) {
            let kind = if token.iter().any(|b| matches!(b, b'.' | b'e' | b'E')) {
                ValueKind::Double
            } else {
                ValueKind::Number
            };
            let text: String = token.iter().map(|&b| b as char).collect();
            self.add_leaf(arena, root, kind, &text);
        } else {
            self.fail(ParseErrorCode::InvalidNumber);
        }
        self.token = token;
        self.token.clear();
    }

    fn finish_literal(&mut self, arena: &mut Arena, root: NodeId) {
        let token = std::mem::take(&mut self.token);
        let found = std::str::from_utf8(&token)
            .ok()
            .and_then(|word| LITERALS.get(word).map(|&kind| (word, kind)));
        match found {
            Some((word, kind)) => self.add_leaf(arena, root, kind, word),
            None => {
                self.fail(ParseErrorCode::InvalidLiteral);
            }
        }
        self.token = token;
        self.token.clear();
    }

    // ========================================================================
    // Strings
    // ========================================================================

    fn begin_string(&mut self, key: bool) -> bool {
        self.token.clear();
        self.committed = 0;
        self.escape = Escape::None;
        self.high_surrogate = None;
        self.state = State::Str { key };
        true
    }

    /// Scan string content starting at `pos`; returns the new position.
    fn scan_string(
        &mut self,
        arena: &mut Arena,
        root: NodeId,
        input: &[u8],
        mut pos: usize,
        key: bool,
    ) -> usize {
        while pos < input.len() && matches!(self.state, State::Str { .. }) {
            match self.escape {
                Escape::None => {
                    let rest = &input[pos..];
                    let end = memchr2(b'"', b'\\', rest).unwrap_or(rest.len());
                    let run = &rest[..end];
                    if let Some(bad) = run.iter().position(|&b| b < 0x20) {
                        self.offset += bad as u64;
                        self.fail(ParseErrorCode::ControlCharacter);
                        return pos + bad;
                    }
                    if !run.is_empty() {
                        self.flush_surrogate();
                        self.token.extend_from_slice(run);
                    }
                    pos += end;
                    self.offset += end as u64;
                    if end == rest.len() {
                        break;
                    }
                    let special = input[pos];
                    pos += 1;
                    self.offset += 1;
                    if special == b'\\' {
                        self.escape = Escape::Backslash;
                    } else {
                        self.end_string(arena, root, key);
                    }
                }
                Escape::Backslash => {
                    let unit = match input[pos] {
                        b'"' => b'"',
                        b'\\' => b'\\',
                        b'/' => b'/',
                        b'b' => 0x08,
                        b'f' => 0x0C,
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'u' => 0,
                        _ => {
                            self.fail(ParseErrorCode::InvalidEscape);
                            return pos;
                        }
                    };
                    if input[pos] == b'u' {
                        self.escape = Escape::Unicode { value: 0, digits: 0 };
                    } else {
                        self.flush_surrogate();
                        self.token.push(unit);
                        self.escape = Escape::None;
                    }
                    pos += 1;
                    self.offset += 1;
                }
                Escape::Unicode { value, digits } => {
                    let Some(digit) = (input[pos] as char).to_digit(16) else {
                        self.fail(ParseErrorCode::InvalidUnicodeEscape);
                        return pos;
                    };
                    pos += 1;
                    self.offset += 1;
                    let value = (value << 4) | digit;
                    if digits == 3 {
                        self.escape = Escape::None;
                        self.push_code_unit(value);
                    } else {
                        self.escape = Escape::Unicode { value, digits: digits + 1 };
                    }
                }
            }
        }
        pos
    }

    fn end_string(&mut self, arena: &mut Arena, root: NodeId, key: bool) {
        self.flush_surrogate();
        let text = String::from_utf8_lossy(&self.token).into_owned();
        self.token.clear();
        self.committed = 0;
        if key {
            self.key = Some(text);
            self.state = State::Colon;
        } else {
            self.add_leaf(arena, root, ValueKind::String, &text);
        }
    }

    /// Decode one UTF-16 code unit from a `\u` escape, pairing surrogates.
    /// Unpaired surrogates become U+FFFD.
    fn push_code_unit(&mut self, unit: u32) {
        if let Some(high) = self.high_surrogate.take() {
            if (0xDC00..=0xDFFF).contains(&unit) {
                let code = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
                self.push_char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                return;
            }
            self.push_char(char::REPLACEMENT_CHARACTER);
        }
        if (0xD800..=0xDBFF).contains(&unit) {
            self.high_surrogate = Some(unit);
        } else {
            self.push_char(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }

    fn flush_surrogate(&mut self) {
        if self.high_surrogate.take().is_some() {
            self.push_char(char::REPLACEMENT_CHARACTER);
        }
    }

    fn push_char(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.token.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    }

    /// Decode the uncommitted tail of the string token on its own, turning a
    /// character cut by the chunk boundary into U+FFFD.
    fn commit_lossy(&mut self) {
        let tail = self.token.split_off(self.committed);
        let decoded = String::from_utf8_lossy(&tail);
        self.token.extend_from_slice(decoded.as_bytes());
        self.committed = self.token.len();
    }
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn valid_number(text: &[u8]) -> bool {
    let digits_from = |mut i: usize| {
        while text.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if text.first() == Some(&b'-') {
        i += 1;
    }
    match text.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => i = digits_from(i),
        _ => return false,
    }
    if text.get(i) == Some(&b'.') {
        let end = digits_from(i + 1);
        if end == i + 1 {
            return false;
        }
        i = end;
    }
    if matches!(text.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(text.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let end = digits_from(i);
        if end == i {
            return false;
        }
        i = end;
    }
    i == text.len()
}
