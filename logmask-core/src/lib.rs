// logmask-core/src/lib.rs
//! # logmask Core Library
//!
//! `logmask-core` prepares raw log lines for unsupervised template mining and
//! recovers the concrete values that masking removed once a template is known.
//!
//! Masking is an ordered, two-phase application of regex rules. Every value a
//! rule replaces is recorded in a per-line [`ParameterLedger`]. After an external
//! miner returns a template for the masked line, [`align`] walks the template and
//! the masked line together and pops the ledger to rebuild each placeholder's
//! original text.
//!
//! ## Modules
//!
//! * `config`: Defines `MaskingRule`s and the ordered `RuleSetConfig`.
//! * `rules`: Compiles a configuration into a shareable `RuleSet`.
//! * `masker`: The masking pipeline.
//! * `ledger`: The per-line record of masked values.
//! * `aligner`: Template/line realignment.
//! * `tokens`: Tokenizing and placeholder splitting helpers.
//! * `miner`: The `TemplateMiner` trait implemented by clustering engines.
//! * `headless`: Batch helpers built on a `TemplateMiner`.
//!
//! ## Usage Example
//!
//! ```rust
//! use logmask_core::{ExtractedParameter, Masker};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let masker = Masker::with_default_rules()?;
//!
//!     let masked = masker.mask("count=3 total=7");
//!     assert_eq!(masked.text(), "count <NUM> total <NUM>");
//!
//!     // The template would normally come from a template miner.
//!     let params = masked.align("count <NUM> total <NUM>")?;
//!     assert_eq!(
//!         params,
//!         vec![
//!             ExtractedParameter::new("<NUM>", "3"),
//!             ExtractedParameter::new("<NUM>", "7"),
//!         ]
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Masking never fails on string input. Rule loading returns `anyhow::Error`;
//! compilation and alignment return [`LogmaskError`].
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod aligner;
pub mod config;
pub mod errors;
pub mod headless;
pub mod ledger;
pub mod masker;
pub mod miner;
pub mod rules;
pub mod tokens;

/// Re-exports the public configuration types and functions for managing masking rules.
pub use config::{
    load_rules_by_name,
    merge_rules,
    rule_set_candidate_paths,
    MaskingRule,
    RulePhase,
    RuleSetConfig,
    MAX_PATTERN_LENGTH,
};

/// Re-exports the custom error types for clear error reporting.
pub use errors::{LogmaskError, MismatchReason};

pub use rules::compiler::{compile_rules, get_or_compile_rules, CompiledRule, RuleSet};

pub use masker::{MaskedLine, Masker};
pub use ledger::ParameterLedger;
pub use aligner::{align, ExtractedParameter};
pub use miner::{ClusterAssignment, ClusterChange, TemplateMatch, TemplateMiner};

/// Re-exports types and functions for one-shot, non-interactive use.
pub use headless::{
    parameters_by_cluster,
    train_miner,
    BatchOptions,
    BatchReport,
    ClusterReport,
    LineFailure,
    MismatchPolicy,
};
