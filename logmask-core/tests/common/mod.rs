// logmask-core/tests/common/mod.rs
//! Test doubles for the template miner seam.
#![allow(dead_code)]

use logmask_core::tokens::{split_placeholders, tokenize, Piece, MASK_DELIMITERS, WILDCARD};
use logmask_core::{ClusterAssignment, ClusterChange, ExtractedParameter, TemplateMatch, TemplateMiner};

/// Groups masked lines by their first token and token count. Positions where
/// members disagree become `<*>`.
#[derive(Debug, Default)]
pub struct PrefixMiner {
    clusters: Vec<(String, usize, Vec<String>)>,
}

impl PrefixMiner {
    fn find(&self, tokens: &[&str]) -> Option<usize> {
        let first = tokens.first().copied().unwrap_or_default();
        self.clusters
            .iter()
            .position(|(head, len, _)| head == first && *len == tokens.len())
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

impl TemplateMiner for PrefixMiner {
    fn add(&mut self, masked_line: &str) -> ClusterAssignment {
        let tokens = tokenize(masked_line);
        match self.find(&tokens) {
            Some(idx) => {
                let template = &mut self.clusters[idx].2;
                let mut changed = false;
                for (slot, token) in template.iter_mut().zip(&tokens) {
                    if slot.as_str() != *token && slot.as_str() != WILDCARD {
                        *slot = WILDCARD.to_string();
                        changed = true;
                    }
                }
                ClusterAssignment {
                    cluster_id: idx as u64 + 1,
                    change: if changed { ClusterChange::TemplateChanged } else { ClusterChange::None },
                    template: template.join(" "),
                }
            }
            None => {
                let first = tokens.first().copied().unwrap_or_default().to_string();
                let template: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
                let joined = template.join(" ");
                self.clusters.push((first, tokens.len(), template));
                ClusterAssignment {
                    cluster_id: self.clusters.len() as u64,
                    change: ClusterChange::ClusterCreated,
                    template: joined,
                }
            }
        }
    }

    fn match_line(&self, masked_line: &str) -> Option<TemplateMatch> {
        let tokens = tokenize(masked_line);
        self.find(&tokens).map(|idx| TemplateMatch {
            cluster_id: idx as u64 + 1,
            template: self.clusters[idx].2.join(" "),
        })
    }
}

/// Puts extracted values back into the template's placeholder positions.
pub fn substitute(template: &str, params: &[ExtractedParameter]) -> String {
    let mut values = params.iter().map(|p| p.value.as_str());
    let mut out = Vec::new();
    for token in tokenize(template) {
        if token == WILDCARD {
            out.push(values.next().unwrap_or_default().to_string());
            continue;
        }
        let mut rebuilt = String::new();
        for piece in split_placeholders(token) {
            match piece {
                Piece::Literal(text) => rebuilt.push_str(text),
                Piece::Placeholder(_) => rebuilt.push_str(values.next().unwrap_or_default()),
            }
        }
        out.push(rebuilt);
    }
    out.join(" ")
}

/// Drops delimiters and whitespace so spacing differences do not matter.
pub fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !MASK_DELIMITERS.contains(c))
        .collect()
}
