//! compiler.rs - Manages the compilation and caching of masking rules.
//!
//! This module converts a `RuleSetConfig` into a `RuleSet`: two ordered lists of
//! compiled rules, one per pipeline phase. Compiled rule sets are cached in a
//! global, shared map keyed by a hash of the configuration, so every `Masker`
//! built from the same configuration shares one `Arc<RuleSet>`.
//!
//! The `regex` crate has no lookaround. Bounded rules are compiled as
//! `(?P<value>PATTERN)(?:[^A-Za-z0-9]|$)`; the trailing boundary is matched but
//! not masked, and the leading boundary is checked by [`CompiledRule::find_spans`].
//!
//! License: MIT OR APACHE 2.0

use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::{Arc, RwLock};

use crate::config::{invalid_tag_reason, MaskingRule, RulePhase, RuleSetConfig, MAX_PATTERN_LENGTH};
use crate::errors::LogmaskError;

const VALUE_GROUP: &str = "value";

/// A single compiled masking rule.
#[derive(Debug)]
pub struct CompiledRule {
    /// The compiled regular expression used for matching.
    pub regex: Regex,
    /// The unique name of the masking rule.
    pub name: String,
    /// The wrapped placeholder, e.g. `<IP>`.
    pub tag: String,
    pub phase: RulePhase,
    /// See the module documentation.
    pub bounded: bool,
}

impl CompiledRule {
    /// Byte ranges of every match in `text`, left to right and non-overlapping.
    pub fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        if !self.bounded {
            return self.regex.find_iter(text).map(|m| m.range()).collect();
        }

        let mut spans = Vec::new();
        let mut pos = 0;
        while pos <= text.len() {
            let Some(caps) = self.regex.captures_at(text, pos) else {
                break;
            };
            let Some(value) = caps.name(VALUE_GROUP) else {
                break;
            };
            if value.is_empty() || preceded_by_alphanumeric(text, value.start()) {
                pos = next_char_boundary(text, value.start());
                continue;
            }
            spans.push(value.range());
            pos = value.end();
        }
        spans
    }
}

fn preceded_by_alphanumeric(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphanumeric())
}

fn next_char_boundary(text: &str, idx: usize) -> usize {
    idx + text[idx..].chars().next().map_or(1, char::len_utf8)
}

/// The compiled, ordered rule lists of both phases.
#[derive(Debug)]
pub struct RuleSet {
    pre_split: Vec<CompiledRule>,
    post_split: Vec<CompiledRule>,
    fingerprint: String,
}

impl RuleSet {
    /// Rules applied before separator normalization, in order.
    pub fn pre_split(&self) -> &[CompiledRule] {
        &self.pre_split
    }

    /// Rules applied after separator normalization, in order.
    pub fn post_split(&self) -> &[CompiledRule] {
        &self.post_split
    }

    /// Hex SHA-256 over the ordered `(phase, tag, bounded, pattern)` list.
    ///
    /// Templates mined under one fingerprint are not comparable with lines masked
    /// under another.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Every wrapped tag this rule set can emit, in evaluation order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.pre_split
            .iter()
            .chain(self.post_split.iter())
            .map(|r| r.tag.as_str())
    }

    pub fn len(&self) -> usize {
        self.pre_split.len() + self.post_split.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    /// A thread-safe, global cache for compiled rule sets.
    /// The key is an order-sensitive hash of the `RuleSetConfig`.
    static ref COMPILED_RULES_CACHE: RwLock<HashMap<u64, Arc<RuleSet>>> = RwLock::new(HashMap::new());
}

/// Hashes the `RuleSetConfig` to create a cache key.
///
/// Rules are hashed in list order; two configs with the same rules in a
/// different order are different rule sets.
fn hash_config(config: &RuleSetConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.hash(&mut hasher);
    hasher.finish()
}

fn compile_one(rule: MaskingRule) -> Result<CompiledRule, LogmaskError> {
    let Some(pattern) = rule.pattern.as_deref() else {
        return Err(LogmaskError::MissingPattern(rule.name));
    };

    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(LogmaskError::PatternLengthExceeded(
            rule.name,
            pattern.len(),
            MAX_PATTERN_LENGTH,
        ));
    }

    if invalid_tag_reason(&rule.mask_with).is_some() {
        return Err(LogmaskError::InvalidTag(rule.name, rule.mask_with));
    }

    let source = if rule.bounded {
        format!("(?P<{}>{})(?:[^A-Za-z0-9]|$)", VALUE_GROUP, pattern)
    } else {
        pattern.to_string()
    };

    let regex = RegexBuilder::new(&source)
        .size_limit(10 * (1 << 20)) // 10 MB limit for compiled regex
        .build()
        .map_err(|e| LogmaskError::RuleCompilationError(rule.name.clone(), e))?;

    Ok(CompiledRule {
        regex,
        tag: rule.wrapped_tag(),
        name: rule.name,
        phase: rule.phase,
        bounded: rule.bounded,
    })
}

/// Compiles masking rules into a `RuleSet`, preserving their order.
///
/// Disabled rules (`enabled: false`) are skipped. Every failing rule is reported,
/// then the whole set is rejected as `MalformedRule`.
pub fn compile_rules(rules_to_compile: Vec<MaskingRule>) -> Result<RuleSet, LogmaskError> {
    debug!("Starting compilation of {} rules.", rules_to_compile.len());

    let mut pre_split = Vec::new();
    let mut post_split = Vec::new();
    let mut compilation_errors = Vec::new();
    let mut hasher = Sha256::new();

    for rule in rules_to_compile {
        if rule.enabled == Some(false) {
            warn!("Skipping rule '{}' because it is disabled.", &rule.name);
            continue;
        }

        debug!(
            "Attempting to compile rule: '{}' with pattern '{:?}'",
            &rule.name, rule.pattern
        );

        match compile_one(rule) {
            Ok(compiled) => {
                log::debug!(
                    target: "logmask_core::compiler",
                    "Rule '{}' compiled successfully.",
                    &compiled.name
                );
                hasher.update(compiled.phase.as_str().as_bytes());
                hasher.update(b"\0");
                hasher.update(compiled.tag.as_bytes());
                hasher.update(if compiled.bounded { b"\0b\0" } else { b"\0u\0" });
                hasher.update(compiled.regex.as_str().as_bytes());
                hasher.update(b"\n");
                match compiled.phase {
                    RulePhase::Pre => pre_split.push(compiled),
                    RulePhase::Post => post_split.push(compiled),
                }
            }
            Err(e) => compilation_errors.push(e),
        }
    }

    if !compilation_errors.is_empty() {
        let error_message = compilation_errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>()
            .join("\n");
        return Err(LogmaskError::MalformedRule(format!(
            "Failed to compile {} rule(s):\n{}",
            compilation_errors.len(),
            error_message
        )));
    }

    debug!(
        "Finished compiling rules. Pre-split: {}, post-split: {}.",
        pre_split.len(),
        post_split.len()
    );
    Ok(RuleSet {
        pre_split,
        post_split,
        fingerprint: hex::encode(hasher.finalize()),
    })
}

/// Gets a `RuleSet` from the cache or compiles it if not found.
///
/// Entries are never evicted; the cache is meant for a small, fixed set of
/// configurations. Use [`compile_rules`] for one-off rule sets.
pub fn get_or_compile_rules(config: &RuleSetConfig) -> Result<Arc<RuleSet>> {
    let cache_key = hash_config(config);

    {
        let cache = COMPILED_RULES_CACHE
            .read()
            .map_err(|_| anyhow::anyhow!("compiled rule cache lock poisoned"))?;
        if let Some(rules) = cache.get(&cache_key) {
            debug!("Serving compiled rules from cache for key: {}", &cache_key);
            return Ok(Arc::clone(rules));
        }
    }

    debug!("Compiled rules not found in cache. Compiling now.");
    let compiled = Arc::new(compile_rules(config.rules.clone())?);

    COMPILED_RULES_CACHE
        .write()
        .map_err(|_| anyhow::anyhow!("compiled rule cache lock poisoned"))?
        .insert(cache_key, Arc::clone(&compiled));

    debug!("Successfully compiled and cached rules for key: {}", &cache_key);
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded_num() -> CompiledRule {
        compile_one(MaskingRule {
            name: "num".to_string(),
            pattern: Some(r"[\-\+]?\d*\.?\d+".to_string()),
            mask_with: "NUM".to_string(),
            bounded: true,
            ..Default::default()
        })
        .unwrap()
    }

    fn spans<'a>(rule: &CompiledRule, text: &'a str) -> Vec<&'a str> {
        rule.find_spans(text).into_iter().map(|r| &text[r]).collect()
    }

    #[test]
    fn bounded_rule_skips_digits_inside_words() {
        let rule = bounded_num();
        assert_eq!(spans(&rule, "a1 2 b3c 44"), ["2", "44"]);
    }

    #[test]
    fn bounded_rule_does_not_consume_trailing_boundary() {
        let rule = bounded_num();
        assert_eq!(spans(&rule, "1 2 3"), ["1", "2", "3"]);
        assert_eq!(spans(&rule, "(7)"), ["7"]);
    }

    #[test]
    fn bounded_rule_checks_the_original_preceding_character() {
        let rule = bounded_num();
        // ".3" is preceded by '2' and is skipped; "3" is preceded by '.'.
        assert_eq!(spans(&rule, "1.2.3 x"), ["1.2", "3"]);
        assert_eq!(spans(&rule, "v1.2 x"), ["2"]);
    }

    #[test]
    fn bounded_rule_handles_multibyte_neighbours() {
        let rule = bounded_num();
        assert_eq!(spans(&rule, "é5 ü 6µ"), ["5", "6"]);
    }

    #[test]
    fn disabled_rules_are_not_compiled() {
        let rules = vec![MaskingRule {
            name: "off".to_string(),
            pattern: Some("x".to_string()),
            mask_with: "OFF".to_string(),
            enabled: Some(false),
            ..Default::default()
        }];
        assert!(compile_rules(rules).unwrap().is_empty());
    }

    #[test]
    fn invalid_pattern_is_a_malformed_rule() {
        let rules = vec![MaskingRule {
            name: "broken".to_string(),
            pattern: Some("(unclosed".to_string()),
            mask_with: "BROKEN".to_string(),
            ..Default::default()
        }];
        let err = compile_rules(rules).unwrap_err();
        assert!(matches!(err, LogmaskError::MalformedRule(_)));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let a = MaskingRule {
            name: "a".to_string(),
            pattern: Some("a".to_string()),
            mask_with: "A".to_string(),
            ..Default::default()
        };
        let b = MaskingRule {
            name: "b".to_string(),
            pattern: Some("b".to_string()),
            mask_with: "B".to_string(),
            ..Default::default()
        };
        let ab = compile_rules(vec![a.clone(), b.clone()]).unwrap();
        let ba = compile_rules(vec![b, a]).unwrap();
        assert_ne!(ab.fingerprint(), ba.fingerprint());
    }

    #[test]
    fn cache_returns_the_same_rule_set() {
        let config = RuleSetConfig::load_default_rules().unwrap();
        let first = get_or_compile_rules(&config).unwrap();
        let second = get_or_compile_rules(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
