//! Browser-backed page source for pages that only show the counter after
//! client-side rendering.
//!
//! Wraps headless Chromium via chromiumoxide behind the same
//! [`crate::acquisition::PageSource`] capability the HTTP client implements.

pub mod chromium;

pub use chromium::{find_chromium, ChromiumRenderer};
