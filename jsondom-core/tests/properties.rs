//! Property-based tests for parsing, building and rendering.
//!
//! serde_json serves as the reference: documents are generated as
//! `serde_json::Value`s, pushed through the DOM, and compared after the
//! rendered text is read back.

use jsondom_core::{Document, ValueNode};
use proptest::prelude::*;
use serde_json::Value;

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..12).prop_map(|chars| chars.into_iter().collect())
}

/// JSON values whose floats have short, exact decimal forms.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1_000_000i32..1_000_000).prop_map(|n| Value::from(f64::from(n) / 64.0)),
        text().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z_]{0,6}", inner, 0..6)
                .prop_map(|members| Value::Object(members.into_iter().collect())),
        ]
    })
}

// =============================================================================
// Test Helpers
// =============================================================================

fn render(doc: &mut Document, add_space: bool) -> String {
    doc.render(None, add_space).to_string()
}

fn read_back(rendered: &str) -> Result<Value, TestCaseError> {
    serde_json::from_str(rendered)
        .map_err(|e| TestCaseError::fail(format!("{e}: {rendered:?}")))
}

/// Detached anonymous node holding `value`, built with the factories.
fn build(doc: &mut Document, value: &Value) -> ValueNode {
    match value {
        Value::Null => doc.create_array_null(),
        Value::Bool(b) => doc.create_array_bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => doc.create_array_i64(i),
            None => doc.create_array_f64(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => doc.create_array_text(s),
        Value::Array(items) => {
            let array = doc.create_array();
            for item in items {
                let child = build(doc, item);
                array.add_child(doc, child, false);
            }
            array
        }
        Value::Object(members) => {
            let object = doc.create_object();
            for (key, member) in members {
                add_member(doc, object, key, member);
            }
            object
        }
    }
}

fn add_member(doc: &mut Document, object: ValueNode, key: &str, value: &Value) {
    match value {
        Value::Null => object.add_null(doc, key, false),
        Value::Bool(b) => object.add_bool(doc, key, *b, false),
        Value::Number(n) => match n.as_i64() {
            Some(i) => object.add_i64(doc, key, i, false),
            None => object.add_f64(doc, key, n.as_f64().unwrap_or_default(), false),
        },
        Value::String(s) => object.add_text(doc, key, s, false),
        container => {
            let child = build(doc, container);
            object.add_child_named(doc, key, child, false)
        }
    };
}

// =============================================================================
// Property: Parser Never Panics
// =============================================================================

proptest! {
    #![proptest_config(config())]

    /// Arbitrary bytes, split anywhere, never panic the parser or renderer.
    #[test]
    fn parser_never_panics(
        input in prop::collection::vec(any::<u8>(), 0..512),
        split in any::<prop::sample::Index>(),
    ) {
        let at = split.index(input.len() + 1);
        let mut doc = Document::new();
        doc.parse_bytes(&input[..at]);
        doc.parse_bytes(&input[at..]);
        doc.finish();
        render(&mut doc, true);
    }

    /// JSON-flavoured noise reaches deeper parser states.
    #[test]
    fn parser_never_panics_jsonish(input in "[\\[\\]{}:,\"\\\\tfrueanl0-9.eE+ -]{0,300}") {
        let mut doc = Document::new();
        doc.parse(&input);
        doc.finish();
        render(&mut doc, false);
    }
}

// =============================================================================
// Property: Parsed Documents Render Equivalent JSON
// =============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn parse_then_render_preserves_value(value in json_value()) {
        let text = serde_json::to_string(&value).expect("serializes");
        let expected: Value = serde_json::from_str(&text).expect("reference parse");

        let mut doc = Document::parse_complete(&text)
            .map_err(|e| TestCaseError::fail(format!("{e}: {text:?}")))?;
        prop_assert_eq!(read_back(&render(&mut doc, false))?, expected.clone());
        prop_assert_eq!(read_back(&render(&mut doc, true))?, expected);
    }

    #[test]
    fn render_is_a_fixed_point(value in json_value(), add_space in any::<bool>()) {
        let text = serde_json::to_string_pretty(&value).expect("serializes");
        let mut first = Document::from_text(&text);
        let once = render(&mut first, add_space);
        let mut second = Document::from_text(&once);
        prop_assert_eq!(render(&mut second, add_space), once);
    }

    #[test]
    fn chunked_parse_matches_one_shot(
        value in json_value(),
        split in any::<prop::sample::Index>(),
    ) {
        let text = serde_json::to_string(&value).expect("serializes");
        let bytes = text.as_bytes();
        let at = split.index(bytes.len() + 1);

        let mut whole = Document::from_text(&text);
        let mut parts = Document::new();
        parts.parse_bytes(&bytes[..at]);
        parts.parse_bytes(&bytes[at..]);
        prop_assert!(parts.finish(), "split at {} of {:?}", at, text);
        prop_assert_eq!(render(&mut parts, false), render(&mut whole, false));
    }
}

// =============================================================================
// Property: Factory-Built Trees Render Equivalent JSON
// =============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn built_tree_renders_value(value in json_value()) {
        let mut doc = Document::new();
        let node = build(&mut doc, &value);
        let root = doc.root();
        root.add_child(&mut doc, node, false);
        prop_assert_eq!(read_back(&render(&mut doc, false))?, value);
    }

    #[test]
    fn duplicate_renders_like_source(value in json_value()) {
        let mut doc = Document::new();
        let node = build(&mut doc, &value);
        let copy = doc.duplicate_node(node);
        let rendered = node.render(&mut doc, None).to_string();
        prop_assert_eq!(copy.render(&mut doc, None).to_string(), rendered);
    }
}
