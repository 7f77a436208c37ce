//! Client key extraction.

use axum::http::{HeaderMap, HeaderName};
use std::fmt;

/// Number of leading characters kept when a key is displayed.
const VISIBLE_PREFIX: usize = 4;
/// Keys this short or shorter are displayed fully masked.
const MIN_PARTIAL_LEN: usize = VISIBLE_PREFIX * 2;

/// The identifier a caller's usage is accounted under.
///
/// Displays redacted so keys can be logged without leaking credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Extract the key from `header`.
    ///
    /// An absent, empty or non-UTF-8 header yields `None`.
    pub fn from_headers(headers: &HeaderMap, header: &HeaderName) -> Option<Self> {
        let value = headers.get(header)?.to_str().ok()?;
        if value.is_empty() {
            return None;
        }
        Some(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.chars().count() <= MIN_PARTIAL_LEN {
            return f.write_str("***");
        }
        let visible: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        write!(f, "{}***", visible)
    }
}
