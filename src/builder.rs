//! Heuristic detection of blocks produced by the expected block builder.
//!
//! The builder marks its blocks by appending a transaction whose payload is the
//! UTF-8 text `Block Number: <height>`. Anything else in the last slot, including
//! payloads that are not valid UTF-8, counts as a miss.

use std::str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderVerdict {
    Matched,
    Missed,
}

impl BuilderVerdict {
    pub fn is_match(self) -> bool {
        matches!(self, BuilderVerdict::Matched)
    }
}

#[derive(Debug, Clone)]
pub struct BuilderCheck {
    marker_prefix: String,
}

impl Default for BuilderCheck {
    fn default() -> Self {
        Self::new("Block Number: ")
    }
}

impl BuilderCheck {
    pub fn new(marker_prefix: impl Into<String>) -> Self {
        Self {
            marker_prefix: marker_prefix.into(),
        }
    }

    pub fn expected_marker(&self, height: u64) -> String {
        format!("{}{}", self.marker_prefix, height)
    }

    pub fn classify(&self, height: u64, payload: &[u8]) -> BuilderVerdict {
        match str::from_utf8(payload) {
            Ok(text) if text == self.expected_marker(height) => BuilderVerdict::Matched,
            _ => BuilderVerdict::Missed,
        }
    }
}
