//! Chunked-feeding helpers shared by the integration tests.

use jsondom_core::Document;

/// Parse `input` in one call and return the compact rendering.
pub fn parse_one_shot(input: &[u8]) -> (Document, String) {
    let mut doc = Document::new();
    doc.parse_bytes(input);
    doc.finish();
    let text = compact(&mut doc);
    (doc, text)
}

/// Parse `input` in two chunks split at `at`.
pub fn feed_split(input: &[u8], at: usize) -> Document {
    feed_chunks(input, &[at, input.len() - at])
}

/// Parse `input` as consecutive chunks of the given sizes.
pub fn feed_chunks(input: &[u8], sizes: &[usize]) -> Document {
    let mut doc = Document::new();
    let mut start = 0;
    for &size in sizes {
        let end = (start + size).min(input.len());
        doc.parse_bytes(&input[start..end]);
        start = end;
    }
    doc.parse_bytes(&input[start..]);
    doc.finish();
    doc
}

/// Compact rendering of the whole document.
pub fn compact(doc: &mut Document) -> String {
    doc.render(None, false).to_string()
}
