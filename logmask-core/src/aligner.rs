// logmask-core/src/aligner.rs
//! Realignment of a mined template against a masked line.
//!
//! The template and the masked line are compared token by token. Wherever the
//! template has a placeholder, the masked line's ledger supplies the value that
//! was masked out, oldest capture first.

use serde::{Deserialize, Serialize};

use crate::errors::{LogmaskError, MismatchReason};
use crate::ledger::{log_popped_value_debug, ParameterLedger};
use crate::tokens::{split_placeholders, tokenize, Piece, WILDCARD};

/// One reconstructed placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedParameter {
    /// The template placeholder, `<*>` or a typed tag such as `<NUM>`.
    pub tag: String,
    pub value: String,
}

impl ExtractedParameter {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// Reconstructs the value of every placeholder in `template`, in template order.
///
/// `ledger` must be the one produced when `masked_line` was masked; it is
/// consumed. Any structural disagreement fails the whole line and nothing is
/// returned for it.
///
/// A raw line that already contains a rule's tag text (a literal `<NUM>`) is
/// outside what alignment can resolve: the literal is indistinguishable from a
/// masked value and consumes one, so the line fails with `LedgerExhausted`.
pub fn align(
    template: &str,
    masked_line: &str,
    mut ledger: ParameterLedger,
) -> Result<Vec<ExtractedParameter>, LogmaskError> {
    let template_tokens = tokenize(template);
    let line_tokens = tokenize(masked_line);

    if template_tokens.len() != line_tokens.len() {
        return Err(MismatchReason::TokenCount {
            template: template_tokens.len(),
            line: line_tokens.len(),
        }
        .into());
    }

    let mut parameters = Vec::new();
    for (position, (template_token, line_token)) in
        template_tokens.iter().zip(line_tokens.iter()).enumerate()
    {
        if *template_token == WILDCARD {
            let value = reconstruct(line_token, &mut ledger, position)?;
            parameters.push(ExtractedParameter::new(WILDCARD, value));
            continue;
        }

        for piece in split_placeholders(template_token) {
            let Piece::Placeholder(tag) = piece else {
                continue;
            };
            if !ledger.knows(tag) {
                // Angle-bracketed text that was already in the log line.
                if template_token == line_token {
                    continue;
                }
                return Err(MismatchReason::UnknownPlaceholder {
                    tag: tag.to_string(),
                    position,
                }
                .into());
            }
            let value = pop(&mut ledger, tag, position)?;
            parameters.push(ExtractedParameter::new(tag, value));
        }
    }

    Ok(parameters)
}

/// Rebuilds the original text behind a line token matched by `<*>`.
fn reconstruct(
    line_token: &str,
    ledger: &mut ParameterLedger,
    position: usize,
) -> Result<String, LogmaskError> {
    let mut value = String::with_capacity(line_token.len());
    for piece in split_placeholders(line_token) {
        match piece {
            Piece::Placeholder(tag) if ledger.knows(tag) => {
                value.push_str(&pop(ledger, tag, position)?);
            }
            Piece::Placeholder(text) | Piece::Literal(text) => value.push_str(text),
        }
    }
    Ok(value)
}

fn pop(ledger: &mut ParameterLedger, tag: &str, position: usize) -> Result<String, LogmaskError> {
    let value = ledger.pop(tag).ok_or_else(|| MismatchReason::LedgerExhausted {
        tag: tag.to_string(),
        position,
    })?;
    log_popped_value_debug(module_path!(), tag, &value, position);
    Ok(value)
}
