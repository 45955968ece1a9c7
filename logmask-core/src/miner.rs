// logmask-core/src/miner.rs
//! Defines the `TemplateMiner` trait, the seam to an external clustering engine.
//!
//! The engine itself (a Drain-style parse tree or anything else) lives outside
//! this crate. It receives masked lines and hands back a cluster id and a
//! template: whitespace-separated literal tokens, `<*>` wildcards and the typed
//! placeholders produced by the rule set.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

/// What adding a line did to the miner's clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterChange {
    ClusterCreated,
    TemplateChanged,
    None,
}

/// The result of training the miner on one masked line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub cluster_id: u64,
    pub change: ClusterChange,
    /// The cluster's template after the line was added.
    pub template: String,
}

/// A read-only lookup of the cluster a masked line belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub cluster_id: u64,
    pub template: String,
}

/// A trait that defines the operations this crate needs from a template miner.
pub trait TemplateMiner {
    /// Adds a masked line to the miner, creating or updating a cluster.
    fn add(&mut self, masked_line: &str) -> ClusterAssignment;

    /// Finds the cluster for a masked line without changing any cluster.
    ///
    /// Returns `None` when no existing cluster fits.
    fn match_line(&self, masked_line: &str) -> Option<TemplateMatch>;
}
