//! Target/decoy classifiers re-weighting the peak group sub-scores.
//!
//! Both variants share one contract: [`ClassifierKind::train`] on
//! labelled best peak groups returns a [`TrainedModel`], and
//! [`TrainedModel::apply`] re-scores every candidate peak group.

pub mod gbm;
pub mod lda;
pub mod semi_supervised;

use crate::config::ClassifierConfig;
use crate::errors::CalibrationError;
use crate::models::{
    CandidatePeakGroup,
    ClassifierWeights,
    DecoyMarking,
    ScoreType,
    ScoredPeptideResult,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

pub use gbm::BoostedModel;
pub use semi_supervised::{
    CalibrationOutcome,
    semi_supervised_calibration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    LinearDiscriminant,
    TreeEnsemble,
}

/// Feature vector of one peak group with its target/decoy label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledGroup {
    pub features: Vec<f64>,
    pub label: DecoyMarking,
}

impl LabelledGroup {
    pub fn from_group(
        group: &CandidatePeakGroup,
        score_types: &[ScoreType],
        label: DecoyMarking,
    ) -> Self {
        Self {
            features: feature_vector(group, score_types),
            label,
        }
    }
}

/// Sub-scores in `score_types` order, missing ones as zero.
pub fn feature_vector(group: &CandidatePeakGroup, score_types: &[ScoreType]) -> Vec<f64> {
    score_types
        .iter()
        .map(|t| group.sub_scores.get(t).copied().unwrap_or(0.0))
        .collect()
}

fn check_populations(examples: &[LabelledGroup]) -> Result<(), CalibrationError> {
    let n_decoys = examples.iter().filter(|x| x.label.is_decoy()).count();
    let n_targets = examples.len() - n_decoys;
    if n_decoys == 0 {
        return Err(CalibrationError::AllTargets { n: n_targets });
    }
    if n_targets == 0 {
        return Err(CalibrationError::AllDecoys { n: n_decoys });
    }
    Ok(())
}

impl ClassifierKind {
    /// Fits a model separating targets from decoys.
    ///
    /// Fails when either population is empty or no feature is given.
    pub fn train(
        &self,
        examples: &[LabelledGroup],
        score_types: &[ScoreType],
        config: &ClassifierConfig,
    ) -> Result<TrainedModel, CalibrationError> {
        if score_types.is_empty() {
            return Err(CalibrationError::NoScoreTypes);
        }
        check_populations(examples)?;
        info!(
            "Training {:?} on {} peak groups with {} features",
            self,
            examples.len(),
            score_types.len()
        );
        match self {
            ClassifierKind::LinearDiscriminant => {
                let coefs = lda::fit_lda(examples, config.lda_ridge)?;
                let weights = score_types.iter().copied().zip(coefs).collect();
                Ok(TrainedModel::Linear(ClassifierWeights::new(weights)))
            }
            ClassifierKind::TreeEnsemble => {
                let model = BoostedModel::fit(examples, score_types, config)?;
                Ok(TrainedModel::Boosted(model))
            }
        }
    }
}

/// A fitted classifier, immutable once trained.
pub enum TrainedModel {
    Linear(ClassifierWeights),
    Boosted(BoostedModel),
}

impl std::fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainedModel::Linear(w) => f.debug_tuple("Linear").field(w).finish(),
            TrainedModel::Boosted(m) => f
                .debug_struct("Boosted")
                .field("n_models", &m.num_models())
                .finish(),
        }
    }
}

impl TrainedModel {
    /// Weights of a linear model, `None` for tree ensembles.
    pub fn weights(&self) -> Option<&ClassifierWeights> {
        match self {
            TrainedModel::Linear(w) => Some(w),
            TrainedModel::Boosted(_) => None,
        }
    }

    /// Re-scores every peak group and re-selects the best group of each
    /// result.
    pub fn apply(&self, results: &mut [ScoredPeptideResult]) {
        match self {
            TrainedModel::Linear(weights) => {
                results.iter_mut().for_each(|r| r.apply_weights(weights));
            }
            TrainedModel::Boosted(model) => {
                let groups: Vec<&CandidatePeakGroup> =
                    results.iter().flat_map(|r| r.peak_groups.iter()).collect();
                let scores = model.predict(&groups);
                let mut scores = scores.into_iter();
                for res in results.iter_mut() {
                    for group in res.peak_groups.iter_mut() {
                        group.total_score = scores.next().unwrap_or(f64::NAN);
                    }
                    res.select_best(f64::NEG_INFINITY);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_group;

    fn labelled(features: Vec<f64>, decoy: bool) -> LabelledGroup {
        LabelledGroup {
            features,
            label: DecoyMarking::from(decoy),
        }
    }

    #[test]
    fn test_train_rejects_single_population() {
        let config = ClassifierConfig::default();
        let types = [ScoreType::LogSn];
        let targets = vec![labelled(vec![1.0], false), labelled(vec![2.0], false)];
        let err = ClassifierKind::LinearDiscriminant
            .train(&targets, &types, &config)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::AllTargets { n: 2 }));

        let decoys = vec![labelled(vec![1.0], true)];
        let err = ClassifierKind::TreeEnsemble
            .train(&decoys, &types, &config)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::AllDecoys { n: 1 }));

        let err = ClassifierKind::LinearDiscriminant
            .train(&targets, &[], &config)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::NoScoreTypes));
    }

    #[test]
    fn test_feature_vector_missing_is_zero() {
        let mut group = sample_group(10.0, 1.0, 3);
        group.sub_scores.insert(ScoreType::LogSn, 4.0);
        let feats = feature_vector(&group, &[ScoreType::IonCount, ScoreType::LogSn]);
        assert_eq!(feats, vec![0.0, 4.0]);
    }
}
