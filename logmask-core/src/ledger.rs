// logmask-core/src/ledger.rs
//! The per-line parameter ledger and helpers for logging captured values.
//!
//! A `ParameterLedger` records, for one masked line, every substring a rule
//! replaced, grouped by wrapped tag and kept in order of occurrence. The aligner
//! consumes it front-first. It is deliberately not `Clone`: a ledger belongs to
//! the line that produced it and is moved into alignment exactly once.

use lazy_static::lazy_static;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

lazy_static! {
    /// Whether captured values may appear verbatim in debug logs.
    static ref VALUE_DEBUG_ALLOWED: bool = {
        std::env::var("LOGMASK_ALLOW_DEBUG_VALUES")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// Ordered captures of a single masked line, keyed by wrapped tag.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParameterLedger {
    entries: BTreeMap<String, VecDeque<String>>,
}

impl ParameterLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a captured value to the back of `tag`'s queue.
    pub fn record(&mut self, tag: &str, value: &str) {
        log_captured_value_debug(module_path!(), tag, value);
        self.entries
            .entry(tag.to_string())
            .or_default()
            .push_back(value.to_string());
    }

    /// Takes the oldest remaining capture for `tag`.
    pub fn pop(&mut self, tag: &str) -> Option<String> {
        self.entries.get_mut(tag).and_then(VecDeque::pop_front)
    }

    /// True if masking recorded `tag` at least once, even if its queue is now
    /// drained.
    pub fn knows(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Remaining captures for `tag`, oldest first.
    pub fn values(&self, tag: &str) -> impl Iterator<Item = &str> {
        self.entries
            .get(tag)
            .into_iter()
            .flat_map(|queue| queue.iter().map(String::as_str))
    }

    /// Tags recorded for this line, in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of captures not yet consumed.
    pub fn remaining(&self) -> usize {
        self.entries.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Replaces a captured value with a length hint.
pub fn redact_value(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.len())
    }
}

fn loggable_value(value: &str) -> String {
    if *VALUE_DEBUG_ALLOWED {
        value.to_string()
    } else {
        redact_value(value)
    }
}

pub fn log_captured_value_debug(module_path: &str, tag: &str, value: &str) {
    debug!(
        "{} Captured value for {}: '{}'",
        module_path,
        tag,
        loggable_value(value)
    );
}

pub fn log_popped_value_debug(module_path: &str, tag: &str, value: &str, position: usize) {
    debug!(
        "{} Consumed {} at token {}: '{}'",
        module_path,
        tag,
        position,
        loggable_value(value)
    );
}
