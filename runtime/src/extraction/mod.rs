//! Extraction of the concurrently viewing counter from page text.

pub mod online_count;

pub use online_count::{extract, extract_from_markup, extract_from_text, parse_count};
