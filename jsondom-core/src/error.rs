//! Parse diagnostics.

/// Why the parser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParseErrorCode {
    /// Byte that cannot start or continue any token here
    UnexpectedByte = 0,
    /// Object member without a quoted key
    ExpectedKey,
    /// Missing ':' after an object key
    ExpectedColon,
    /// Missing ',' or closing bracket after a value
    ExpectedSeparator,
    /// '}' closing an array or ']' closing an object
    MismatchedBracket,
    /// Unknown backslash escape
    InvalidEscape,
    /// Malformed \uXXXX escape
    InvalidUnicodeEscape,
    /// Raw control character inside a string
    ControlCharacter,
    /// Number that does not follow the JSON grammar
    InvalidNumber,
    /// Misspelled true/false/null
    InvalidLiteral,
    /// Containers nested deeper than the configured limit
    DepthLimit,
    /// Input ended inside a value
    UnexpectedEof,
    /// Non-whitespace after the top-level value
    TrailingData,
    /// Document root already holds a value or fields
    RootOccupied,
}

impl ParseErrorCode {
    /// Get a human-readable message for this error code.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnexpectedByte => "unexpected byte",
            Self::ExpectedKey => "expected object key",
            Self::ExpectedColon => "expected ':'",
            Self::ExpectedSeparator => "expected ',' or closing bracket",
            Self::MismatchedBracket => "mismatched closing bracket",
            Self::InvalidEscape => "invalid escape",
            Self::InvalidUnicodeEscape => "invalid unicode escape",
            Self::ControlCharacter => "control character in string",
            Self::InvalidNumber => "invalid number",
            Self::InvalidLiteral => "invalid literal",
            Self::DepthLimit => "nesting too deep",
            Self::UnexpectedEof => "unexpected end of input",
            Self::TrailingData => "trailing data",
            Self::RootOccupied => "document already holds a value",
        }
    }
}

/// First syntax error seen by a document's parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{} at byte {}", .code.message(), .offset)]
pub struct ParseError {
    pub code: ParseErrorCode,
    /// Offset into the concatenated input fed so far.
    pub offset: u64,
}

impl ParseError {
    pub(crate) fn new(code: ParseErrorCode, offset: u64) -> Self {
        Self { code, offset }
    }
}
