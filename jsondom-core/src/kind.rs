//! Node type tags and scalar conversions.
//!
//! A node's type has two independent axes:
//! - **value kind** - what the node holds (string, number, object, ...)
//! - **position** - whether it is a named object member or an anonymous
//!   element (array item, top-level value, container behind a field)
//!
//! Numeric predicates follow the engine's historical rules: an integer is a
//! numeric value, and `is_number()` answers exactly like `is_double()`.
//! That quirk lives here and nowhere else.

/// What a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Quoted string.
    String,
    /// Integer literal, no fraction or exponent.
    Number,
    /// Number literal with a fraction or exponent.
    Double,
    /// `true` / `false`.
    Bool,
    /// `null`.
    Null,
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
}

impl ValueKind {
    /// Object or array.
    #[inline]
    pub fn is_container(self) -> bool {
        matches!(self, ValueKind::Object | ValueKind::Array)
    }

    /// Anything that carries a text payload.
    #[inline]
    pub fn is_leaf(self) -> bool {
        !self.is_container()
    }
}

/// Where a node sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// Named object member: `"tag": value`.
    Field,
    /// Anonymous value: array item, top-level value or a field's container.
    Element,
}

/// Full type tag of an underlying node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind {
    pub value: ValueKind,
    pub position: Position,
}

impl Kind {
    pub const fn field(value: ValueKind) -> Self {
        Self { value, position: Position::Field }
    }

    pub const fn element(value: ValueKind) -> Self {
        Self { value, position: Position::Element }
    }

    #[inline]
    pub fn is_string(self) -> bool {
        self.value == ValueKind::String
    }

    /// True for integers and doubles alike.
    #[inline]
    pub fn is_double(self) -> bool {
        matches!(self.value, ValueKind::Number | ValueKind::Double)
    }

    /// Same answer as [`Kind::is_double`].
    #[inline]
    pub fn is_number(self) -> bool {
        self.is_double()
    }

    #[inline]
    pub fn is_bool(self) -> bool {
        self.value == ValueKind::Bool
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.value == ValueKind::Null
    }

    #[inline]
    pub fn is_object(self) -> bool {
        self.value == ValueKind::Object
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.value == ValueKind::Array
    }

    /// Type name, checked in a fixed order.
    ///
    /// Because integers already answer `is_double()`, the `"number"` arm
    /// never fires. The order is kept for compatibility.
    pub fn name(self) -> &'static str {
        if self.is_string() {
            "string"
        } else if self.is_double() {
            "double"
        } else if self.is_number() {
            "number"
        } else if self.is_bool() {
            "bool"
        } else if self.is_null() {
            "null"
        } else if self.is_object() {
            "object"
        } else if self.is_array() {
            "array"
        } else {
            "unknown"
        }
    }
}

// ============================================================================
// Lenient scalar conversions
// ============================================================================

/// Leading integer of `text`, or 0 when there is none.
///
/// Digits past the `i64` range saturate at `i64::MAX` / `i64::MIN`.
pub fn lenient_i64(text: &str) -> i64 {
    match lexical_core::parse_partial::<i64>(text.trim_start().as_bytes()) {
        Ok((value, _)) => value,
        Err(lexical_core::Error::Overflow(_)) => i64::MAX,
        Err(lexical_core::Error::Underflow(_)) => i64::MIN,
        Err(_) => 0,
    }
}

/// Leading float of `text`, or 0.0 when there is none.
pub fn lenient_f64(text: &str) -> f64 {
    lexical_core::parse_partial::<f64>(text.trim_start().as_bytes())
        .map(|(value, _)| value)
        .unwrap_or(0.0)
}

/// Case-insensitive comparison with `true`.
pub fn lenient_bool(text: &str) -> bool {
    text.eq_ignore_ascii_case("true")
}

/// Text payload for a double, optionally with a fixed number of decimals.
///
/// Non-finite values have no JSON spelling and are stored as `null`.
pub fn format_double(value: f64, precision: Option<usize>) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    match precision {
        Some(digits) => format!("{:.*}", digits, value),
        None => {
            let mut buf = [0u8; lexical_core::BUFFER_SIZE];
            String::from_utf8_lossy(lexical_core::write(value, &mut buf)).into_owned()
        }
    }
}
