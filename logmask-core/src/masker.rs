// logmask-core/src/masker.rs
//! The masking pipeline.
//!
//! `Masker::mask` turns one raw log line into the canonical masked form handed to
//! a template miner, plus the ledger of every value it replaced. Steps run in a
//! fixed order and each one sees the previous step's output:
//!
//! 1. strip terminal escape sequences,
//! 2. apply the pre-split rules,
//! 3. space out `=`, `|`, `:` and flatten line breaks and tabs,
//! 4. apply the post-split rules,
//! 5. split on delimiters and rejoin with single spaces.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use strip_ansi_escapes::strip;

use crate::aligner::{align, ExtractedParameter};
use crate::config::RuleSetConfig;
use crate::errors::LogmaskError;
use crate::ledger::ParameterLedger;
use crate::rules::compiler::{get_or_compile_rules, CompiledRule, RuleSet};
use crate::tokens::join_on_delimiters;

/// A masked line together with the values masked out of it.
#[derive(Debug)]
pub struct MaskedLine {
    text: String,
    ledger: ParameterLedger,
}

impl MaskedLine {
    /// The masked text, single-space separated.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ledger(&self) -> &ParameterLedger {
        &self.ledger
    }

    pub fn into_parts(self) -> (String, ParameterLedger) {
        (self.text, self.ledger)
    }

    /// Aligns `template` against this line, consuming its ledger.
    pub fn align(self, template: &str) -> Result<Vec<ExtractedParameter>, LogmaskError> {
        align(template, &self.text, self.ledger)
    }
}

#[derive(Debug, Clone)]
pub struct Masker {
    rules: Arc<RuleSet>,
}

impl Masker {
    pub fn new(config: RuleSetConfig) -> Result<Self> {
        let rules = get_or_compile_rules(&config)
            .context("Failed to compile masking rules for Masker")?;
        Ok(Self { rules })
    }

    /// A masker over the built-in rule set.
    pub fn with_default_rules() -> Result<Self> {
        Self::new(RuleSetConfig::load_default_rules()?)
    }

    pub fn from_rule_set(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// Masks one log line. Never fails: a rule that does not match contributes
    /// nothing.
    pub fn mask(&self, line: &str) -> MaskedLine {
        let mut ledger = ParameterLedger::new();

        let mut content = strip_escapes(line);
        for rule in self.rules.pre_split() {
            content = apply_rule(rule, content, &mut ledger);
        }

        content = normalize_separators(&content);
        for rule in self.rules.post_split() {
            content = apply_rule(rule, content, &mut ledger);
        }

        let text = join_on_delimiters(&content);
        debug!(
            "Masked line into {} tokens with {} captured values.",
            text.split(' ').filter(|t| !t.is_empty()).count(),
            ledger.remaining()
        );
        MaskedLine { text, ledger }
    }
}

/// CSI sequences in both the 7-bit (`ESC [`) and the single-character 8-bit form.
static CSI_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\x{9B}|\x1B\[)[0-?]*[ -/]*[@-~]").expect("CSI pattern is valid")
});

/// Removes terminal escape sequences. Tabs and carriage returns come back as
/// spaces so they still separate tokens.
fn strip_escapes(line: &str) -> String {
    let spaced = line.replace(['\t', '\r'], " ");
    let without_csi = CSI_SEQUENCE.replace_all(&spaced, "");
    let stripped = strip(without_csi.as_bytes());
    String::from_utf8_lossy(&stripped).into_owned()
}

/// Records and replaces every match of `rule`, left to right.
fn apply_rule(rule: &CompiledRule, content: String, ledger: &mut ParameterLedger) -> String {
    let spans = rule.find_spans(&content);
    if spans.is_empty() {
        return content;
    }

    debug!("Rule '{}' matched {} time(s).", rule.name, spans.len());
    let mut masked = String::with_capacity(content.len());
    let mut last_end = 0usize;
    for span in spans {
        ledger.record(&rule.tag, &content[span.clone()]);
        masked.push_str(&content[last_end..span.start]);
        masked.push_str(&rule.tag);
        last_end = span.end;
    }
    masked.push_str(&content[last_end..]);
    masked
}

/// Surrounds `=`, `|` and `:` with spaces and turns line breaks and tabs into
/// spaces.
fn normalize_separators(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 16);
    for c in content.chars() {
        match c {
            '=' | '|' | ':' => {
                out.push(' ');
                out.push(c);
                out.push(' ');
            }
            '\n' | '\r' | '\t' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masker() -> Masker {
        Masker::with_default_rules().unwrap()
    }

    #[test]
    fn strips_terminal_colors() {
        let masked = masker().mask("\x1b[31mERROR\x1b[0m\tdisk full");
        assert_eq!(masked.text(), "ERROR disk full");
        assert!(masked.ledger().is_empty());
    }

    #[test]
    fn strips_single_character_csi_colors() {
        let masked = masker().mask("status \u{9b}1;31mFAILED\u{9b}0m done");
        assert_eq!(masked.text(), "status FAILED done");
        assert!(masked.ledger().is_empty());
    }

    #[test]
    fn separators_are_spaced_out() {
        assert_eq!(normalize_separators("a=b|c:d\ne"), "a = b | c : d e");
    }

    #[test]
    fn masks_iso_timestamp_before_colons_are_split() {
        let masked = masker().mask("2024-01-15T10:30:00Z started");
        assert_eq!(masked.text(), "<UTCDATE> started");
        assert_eq!(
            masked.ledger().values("<UTCDATE>").collect::<Vec<_>>(),
            ["2024-01-15T10:30:00Z"]
        );
    }

    #[test]
    fn masks_klog_header_and_go_source_reference() {
        let masked = masker().mask("E0412 10:11:12.123456 controller.go:42] sync failed");
        assert_eq!(masked.text(), "<KLOGDATE> <GOFILEPATH> sync failed");
        assert_eq!(
            masked.ledger().values("<GOFILEPATH>").collect::<Vec<_>>(),
            ["controller.go : 42"]
        );
    }

    #[test]
    fn masks_url_as_one_value() {
        let masked = masker().mask("GET https://example.com/api/v2?id=7 done");
        assert_eq!(masked.text(), "GET <URL> done");
        assert_eq!(
            masked.ledger().values("<URL>").collect::<Vec<_>>(),
            ["https://example.com/api/v2?id=7"]
        );
    }

    #[test]
    fn cidr_wins_over_ip() {
        let masked = masker().mask("route 10.0.0.0/8 via 10.0.0.1");
        assert_eq!(masked.text(), "route <CIDR> via <IP>");
    }

    #[test]
    fn empty_line_masks_to_empty() {
        let masked = masker().mask("");
        assert_eq!(masked.text(), "");
        assert!(masked.ledger().is_empty());
    }
}
