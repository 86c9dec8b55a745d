//! Two-pass target/decoy calibration.
//!
//! The first pass trains on every best peak group and yields a coarse
//! threshold. The second retrains with the positive set restricted to
//! targets at or above it, then the final FDR is assigned.

use super::{
    LabelledGroup,
    TrainedModel,
};
use crate::config::AnalysisConfig;
use crate::errors::CalibrationError;
use crate::fdr::{
    self,
    FdrReport,
};
use crate::models::{
    CandidatePeakGroup,
    ScoreType,
    ScoredPeptideResult,
};
use std::sync::Arc;
use tracing::{
    info,
    warn,
};

/// Checks failed by more than this many get a target dropped from the
/// positive training set.
const MAX_FAILED_CHECKS: usize = 3;

#[derive(Debug)]
pub struct CalibrationOutcome {
    pub model: Arc<TrainedModel>,
    pub coarse: FdrReport,
    pub fine: FdrReport,
}

impl CalibrationOutcome {
    pub fn min_score(&self) -> Option<f64> {
        self.fine.min_score
    }
}

fn failed_checks(group: &CandidatePeakGroup) -> usize {
    let score = |t: ScoreType| group.sub_scores.get(&t).copied();
    [
        score(ScoreType::NormRt).is_some_and(|x| x > 8.0),
        score(ScoreType::LogSn).is_some_and(|x| x < 3.0),
        score(ScoreType::IsotopeCorrelation).is_some_and(|x| x < 0.8),
        score(ScoreType::IsotopeOverlap).is_some_and(|x| x > 0.2),
        score(ScoreType::MassdevWeighted).is_some_and(|x| x > 15.0),
        score(ScoreType::XcorrShapeWeighted).is_some_and(|x| x < 0.6),
        score(ScoreType::XcorrShape).is_some_and(|x| x < 0.5),
    ]
    .into_iter()
    .filter(|failed| *failed)
    .count()
}

pub(crate) fn is_implausible(group: &CandidatePeakGroup) -> bool {
    failed_checks(group) > MAX_FAILED_CHECKS
}

/// Labelled best peak groups: all decoys, and the targets scoring at
/// least `min_target_score`.
fn training_set(
    results: &[ScoredPeptideResult],
    score_types: &[ScoreType],
    min_target_score: Option<f64>,
    quality_gate: bool,
) -> Vec<LabelledGroup> {
    let select = |gate: bool| -> Vec<LabelledGroup> {
        results
            .iter()
            .filter_map(|r| r.best.as_ref().map(|g| (r, g)))
            .filter(|(r, g)| {
                r.decoy
                    || (min_target_score.is_none_or(|min| g.total_score >= min)
                        && !(gate && is_implausible(g)))
            })
            .map(|(r, g)| LabelledGroup::from_group(g, score_types, r.marking()))
            .collect()
    };

    let examples = select(quality_gate);
    if quality_gate && !examples.iter().any(|x| x.label.is_target()) {
        warn!("Quality gate removed every target, training without it");
        return select(false);
    }
    examples
}

/// Retrains, re-scores and calibrates `results` in place.
///
/// Leaves every result with its FDR, q-value and final status. Fails
/// when the input holds only targets or only decoys.
pub fn semi_supervised_calibration(
    results: &mut [ScoredPeptideResult],
    config: &AnalysisConfig,
) -> Result<CalibrationOutcome, CalibrationError> {
    let classifier = &config.classifier;
    let score_types = config.score_types();

    for r in results.iter_mut() {
        r.apply_weights(&config.scoring.weights);
    }
    let examples = training_set(results, &score_types, None, classifier.clean_scores);
    let model = classifier.kind.train(&examples, &score_types, classifier)?;
    model.apply(results);
    let coarse = fdr::calibrate(results, classifier.fdr);

    let model = match coarse.min_score {
        Some(min_score) => {
            let examples =
                training_set(results, &score_types, Some(min_score), classifier.clean_scores);
            info!(
                "Retraining on {} peak groups at or above {:.4}",
                examples.len(),
                min_score
            );
            let refined = classifier.kind.train(&examples, &score_types, classifier)?;
            refined.apply(results);
            refined
        }
        None => {
            warn!("No coarse threshold at FDR {}, keeping the first model", classifier.fdr);
            model
        }
    };

    let fine = fdr::calibrate(results, classifier.fdr);
    fdr::apply_final_status(results, classifier.fdr);
    Ok(CalibrationOutcome {
        model: Arc::new(model),
        coarse,
        fine,
    })
}
