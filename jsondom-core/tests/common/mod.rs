//! Test infrastructure for jsondom
//!
//! Provides seeded input generation and chunked-feeding helpers.

#![allow(dead_code)]

mod generators;
mod harness;

pub use generators::Gen;
pub use harness::{compact, feed_chunks, feed_split, parse_one_shot};
