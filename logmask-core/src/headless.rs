// logmask-core/src/headless.rs
//! Convenience wrappers for batch, non-interactive use.
//!
//! `train_miner` masks every line and feeds it to a miner. `parameters_by_cluster`
//! masks the same lines again, looks each one up in the trained miner and aligns
//! the cluster template against it, grouping the extracted parameters by cluster.
//! A line that cannot be aligned is reported and, by default, skipped.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aligner::ExtractedParameter;
use crate::errors::LogmaskError;
use crate::masker::Masker;
use crate::miner::{ClusterAssignment, TemplateMiner};

/// What a batch does with a line whose template and masked form disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Record the failure and continue with the next line.
    #[default]
    Skip,
    /// Stop the batch and return the line's error.
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub mismatch_policy: MismatchPolicy,
}

/// A line that produced no parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFailure {
    /// Zero-based index into the input lines.
    pub line_number: usize,
    pub reason: String,
}

/// Parameters extracted from a batch, grouped by cluster id.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// One inner list per aligned line, in input order.
    pub clusters: BTreeMap<u64, Vec<Vec<ExtractedParameter>>>,
    pub failures: Vec<LineFailure>,
}

/// The JSON shape reported for a single cluster.
#[derive(Debug, Serialize)]
pub struct ClusterReport<'a> {
    pub cluster_id: u64,
    pub parameters: &'a [Vec<ExtractedParameter>],
}

impl BatchReport {
    pub fn cluster_report(&self, cluster_id: u64) -> Option<ClusterReport<'_>> {
        self.clusters.get(&cluster_id).map(|parameters| ClusterReport {
            cluster_id,
            parameters,
        })
    }

    /// Number of lines that were aligned successfully.
    pub fn aligned_lines(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }

    /// One `{cluster_id, parameters}` JSON object per cluster, in id order.
    pub fn to_json_lines(&self) -> Result<Vec<String>, serde_json::Error> {
        self.clusters
            .iter()
            .map(|(&cluster_id, parameters)| {
                serde_json::to_string(&ClusterReport {
                    cluster_id,
                    parameters,
                })
            })
            .collect()
    }
}

/// Masks every line and adds it to `miner`, returning one assignment per line.
pub fn train_miner<M, S>(
    masker: &Masker,
    miner: &mut M,
    lines: &[S],
) -> Result<Vec<ClusterAssignment>, LogmaskError>
where
    M: TemplateMiner + ?Sized,
    S: AsRef<str>,
{
    if lines.is_empty() {
        return Err(LogmaskError::EmptyInput);
    }

    let assignments: Vec<ClusterAssignment> = lines
        .iter()
        .map(|line| {
            let masked = masker.mask(line.as_ref().trim_end());
            miner.add(masked.text())
        })
        .collect();

    info!("Trained miner on {} lines.", assignments.len());
    Ok(assignments)
}

/// Extracts the parameters of every line, grouped by the cluster it matches.
pub fn parameters_by_cluster<M, S>(
    masker: &Masker,
    miner: &M,
    lines: &[S],
    options: &BatchOptions,
) -> Result<BatchReport, LogmaskError>
where
    M: TemplateMiner + ?Sized,
    S: AsRef<str>,
{
    if lines.is_empty() {
        return Err(LogmaskError::EmptyInput);
    }

    let mut report = BatchReport::default();
    for (line_number, line) in lines.iter().enumerate() {
        let masked = masker.mask(line.as_ref().trim_end());

        let outcome = miner
            .match_line(masked.text())
            .ok_or(LogmaskError::NoMatchingCluster)
            .and_then(|matched| {
                masked
                    .align(&matched.template)
                    .map(|params| (matched.cluster_id, params))
            });

        match outcome {
            Ok((cluster_id, params)) => {
                report.clusters.entry(cluster_id).or_default().push(params);
            }
            Err(e) if options.mismatch_policy == MismatchPolicy::Abort => return Err(e),
            Err(e) => {
                warn!("Skipping line {}: {}", line_number, e);
                report.failures.push(LineFailure {
                    line_number,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Aligned {} of {} lines into {} clusters.",
        report.aligned_lines(),
        lines.len(),
        report.clusters.len()
    );
    Ok(report)
}
