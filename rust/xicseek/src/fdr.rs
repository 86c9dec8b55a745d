//! Target/decoy competition: FDR, q-values and the score threshold.
//!
//! Results are ranked by the total score of their best peak group.
//! Every target gets `FDR = decoys above / targets above (inclusive)`
//! and a q-value, the running minimum of the FDR walking up from the
//! lowest score. Decoys borrow the values of their closest target.

use crate::models::{
    IdentifyStatus,
    ScoredPeptideResult,
};
use serde::Serialize;
use tracing::info;

const FINE_BIN_WIDTH: f64 = 0.001;
const FINE_BIN_LIMIT: f64 = 0.01;
const COARSE_BIN_WIDTH: f64 = 0.1;
const COARSE_BIN_LIMIT: f64 = 1.0;

struct Ranked {
    idx: usize,
    score: f64,
    decoy: bool,
}

/// Ranks results with a best peak group, highest score first.
///
/// Decoys sort ahead of targets with the same score.
fn rank(results: &[ScoredPeptideResult]) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = results
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            let score = r.best_total_score().filter(|s| !s.is_nan())?;
            Some(Ranked {
                idx,
                score,
                decoy: r.decoy,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.decoy.cmp(&a.decoy))
            .then(a.idx.cmp(&b.idx))
    });
    ranked
}

/// Assigns `fdr` and `q_value` in place.
///
/// Results without a best peak group get `None`. A decoy between two
/// targets takes the values of the target closer in score, the higher
/// one on equal distance. Decoys above the top target take the top
/// target's values, decoys below the last target stay `None`.
pub fn assign_fdr(results: &mut [ScoredPeptideResult]) {
    for r in results.iter_mut() {
        r.fdr = None;
        r.q_value = None;
    }
    let ranked = rank(results);

    let mut fdr: Vec<Option<f64>> = vec![None; ranked.len()];
    let mut n_targets = 0usize;
    let mut n_decoys = 0usize;
    for (pos, entry) in ranked.iter().enumerate() {
        if entry.decoy {
            n_decoys += 1;
        } else {
            n_targets += 1;
            fdr[pos] = Some(n_decoys as f64 / n_targets as f64);
        }
    }

    let mut qval: Vec<Option<f64>> = vec![None; ranked.len()];
    let mut q_min = 1.0f64;
    for pos in (0..ranked.len()).rev() {
        if let Some(f) = fdr[pos] {
            q_min = q_min.min(f);
            qval[pos] = Some(q_min);
        }
    }

    let target_positions: Vec<usize> = (0..ranked.len()).filter(|&p| !ranked[p].decoy).collect();
    for (pos, entry) in ranked.iter().enumerate() {
        if !entry.decoy {
            continue;
        }
        let k = target_positions.partition_point(|&t| t < pos);
        let above = k.checked_sub(1).map(|j| target_positions[j]);
        let below = target_positions.get(k).copied();
        let source = match (above, below) {
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) => {
                let to_above = ranked[a].score - entry.score;
                let to_below = entry.score - ranked[b].score;
                if to_above <= to_below { Some(a) } else { Some(b) }
            }
            (Some(_), None) | (None, None) => None,
        };
        if let Some(src) = source {
            fdr[pos] = fdr[src];
            qval[pos] = qval[src];
        }
    }

    for (pos, entry) in ranked.iter().enumerate() {
        let r = &mut results[entry.idx];
        r.fdr = fdr[pos];
        r.q_value = qval[pos];
    }
}

/// Score of the target with the largest FDR strictly below
/// `fdr_target`, the lowest such score on ties.
///
/// `None` means no target passes, i.e. zero detections.
pub fn min_score_threshold(results: &[ScoredPeptideResult], fdr_target: f64) -> Option<f64> {
    results
        .iter()
        .filter(|r| !r.decoy)
        .filter_map(|r| Some((r.fdr?, r.best_total_score()?)))
        .filter(|(fdr, _)| *fdr < fdr_target)
        .min_by(|a, b| b.0.total_cmp(&a.0).then(a.1.total_cmp(&b.1)))
        .map(|(_, score)| score)
}

/// Marks targets with `fdr <= fdr_target` as [`IdentifyStatus::Success`]
/// and the rest as failed. Decoys keep their status.
pub fn apply_final_status(results: &mut [ScoredPeptideResult], fdr_target: f64) {
    for r in results.iter_mut().filter(|r| !r.decoy) {
        let passed = r.fdr.is_some_and(|f| f <= fdr_target);
        r.status = match (passed, r.status) {
            (true, _) => IdentifyStatus::Success,
            (false, IdentifyStatus::InsufficientFragments) => {
                IdentifyStatus::InsufficientFragments
            }
            (false, _) => IdentifyStatus::Failed,
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdrBin {
    /// Inclusive upper FDR edge.
    pub upper: f64,
    pub targets: usize,
    pub decoys: usize,
}

/// Target and decoy counts by FDR, fine bins up to 1% then coarse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdrDistribution {
    pub bins: Vec<FdrBin>,
    pub overflow_targets: usize,
    pub overflow_decoys: usize,
    pub unassigned: usize,
}

impl FdrDistribution {
    fn empty() -> Self {
        let fine = (1..)
            .map(|i| i as f64 * FINE_BIN_WIDTH)
            .take_while(|x| *x <= FINE_BIN_LIMIT + 1e-9);
        let coarse = (1..)
            .map(|i| i as f64 * COARSE_BIN_WIDTH)
            .take_while(|x| *x <= COARSE_BIN_LIMIT + 1e-9);
        let bins = fine
            .chain(coarse)
            .map(|upper| FdrBin {
                upper,
                targets: 0,
                decoys: 0,
            })
            .collect();
        Self {
            bins,
            overflow_targets: 0,
            overflow_decoys: 0,
            unassigned: 0,
        }
    }

    pub fn from_results(results: &[ScoredPeptideResult]) -> Self {
        let mut out = Self::empty();
        for r in results.iter() {
            let Some(fdr) = r.fdr else {
                out.unassigned += 1;
                continue;
            };
            match out.bins.iter_mut().find(|b| fdr <= b.upper + 1e-12) {
                Some(bin) if r.decoy => bin.decoys += 1,
                Some(bin) => bin.targets += 1,
                None if r.decoy => out.overflow_decoys += 1,
                None => out.overflow_targets += 1,
            }
        }
        out
    }
}

/// Outcome of one calibration over a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FdrReport {
    pub fdr_target: f64,
    pub min_score: Option<f64>,
    pub n_targets: usize,
    pub n_decoys: usize,
    /// Targets at or below the FDR target.
    pub n_accepted: usize,
    pub distribution: FdrDistribution,
}

/// Assigns FDR and q-values, then derives the score threshold.
pub fn calibrate(results: &mut [ScoredPeptideResult], fdr_target: f64) -> FdrReport {
    assign_fdr(results);
    let min_score = min_score_threshold(results, fdr_target);
    let scored = || results.iter().filter(|r| r.best.is_some());
    let n_decoys = scored().filter(|r| r.decoy).count();
    let n_targets = scored().count() - n_decoys;
    let n_accepted = results
        .iter()
        .filter(|r| !r.decoy && r.fdr.is_some_and(|f| f <= fdr_target))
        .count();
    match min_score {
        Some(score) => info!(
            "FDR {}: min score {:.4}, {} of {} targets accepted ({} decoys)",
            fdr_target, score, n_accepted, n_targets, n_decoys
        ),
        None => info!(
            "FDR {}: no target passes ({} targets, {} decoys)",
            fdr_target, n_targets, n_decoys
        ),
    }
    FdrReport {
        fdr_target,
        min_score,
        n_targets,
        n_decoys,
        n_accepted,
        distribution: FdrDistribution::from_results(results),
    }
}
