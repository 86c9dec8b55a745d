use crate::extraction::{
    MzTolerance,
    RtTolerance,
};
use crate::ml::ClassifierKind;
use crate::models::{
    ClassifierWeights,
    ScoreType,
};
use crate::rt_mapping::SlopeIntercept;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionConfig {
    pub mz_tolerance: MzTolerance,
    pub rt_tolerance: RtTolerance,
    /// Also extract the precursor isotope traces from MS1.
    pub extract_precursor: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            mz_tolerance: MzTolerance::default(),
            rt_tolerance: RtTolerance::default(),
            extract_precursor: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ClassifierWeights,
    pub max_peak_groups: usize,
    /// Below this total score a direct result is considered unsatisfactory.
    pub min_total_score: f64,
    /// Window (in RT samples) of the rolling median used as noise level.
    pub sn_window: usize,
    /// Largest lag (in RT samples) explored by the cross-correlation scores.
    pub max_xcorr_lag: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ClassifierWeights::default(),
            max_peak_groups: 5,
            min_total_score: 0.0,
            sn_window: 101,
            max_xcorr_lag: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GbmSettings {
    pub iterations: usize,
    pub learning_rate: f32,
    pub max_depth: usize,
    pub min_leaf_weight: f32,
    pub early_stopping_rounds: usize,
}

impl Default for GbmSettings {
    fn default() -> Self {
        Self {
            iterations: 500,
            learning_rate: 0.3,
            max_depth: 5,
            min_leaf_weight: 1.0,
            early_stopping_rounds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    /// Target false discovery rate of the final threshold.
    pub fdr: f64,
    /// Sub-scores used as features. Empty means the keys of the
    /// configured scoring weights.
    pub score_types: Vec<ScoreType>,
    /// Ridge term added to the within-class scatter diagonal.
    pub lda_ridge: f64,
    pub gbm: GbmSettings,
    pub n_folds: usize,
    /// Drop implausible target peak groups from the positive set.
    pub clean_scores: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::LinearDiscriminant,
            fdr: 0.01,
            score_types: Vec::new(),
            lda_ridge: 1e-6,
            gbm: GbmSettings::default(),
            n_folds: 3,
            clean_scores: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Off,
    #[default]
    Deletion,
    Substitution,
    /// Substitution replacing up to six ions.
    ChargeChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    pub max_candidate_ions: usize,
    pub min_fragment_length: usize,
    /// Ion count floor above which a substitution is accepted even if it
    /// is not the best supported one.
    pub min_ion_count: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Deletion,
            max_candidate_ions: 20,
            min_fragment_length: 3,
            min_ion_count: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Configured weights, no search. Decoys are scored only for targets
    /// with peak groups.
    #[default]
    #[serde(alias = "epps")]
    Standard,
    /// Prior weights. Targets failing the prior threshold fall back to
    /// the configured search, decoys never do.
    Reselect,
    /// Fragment lists truncated, decoys always scored.
    #[serde(alias = "csi")]
    CappedIon,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub policy: BatchPolicy,
    pub max_ions: usize,
    pub rt_mapping: Option<SlopeIntercept>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            policy: BatchPolicy::Standard,
            max_ions: 6,
            rt_mapping: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub extraction: ExtractionConfig,
    pub scoring: ScoringConfig,
    pub classifier: ClassifierConfig,
    pub search: SearchConfig,
    pub batch: BatchConfig,
}

impl AnalysisConfig {
    /// Feature set of the classifier, falling back to the weighted
    /// sub-scores.
    pub fn score_types(&self) -> Vec<ScoreType> {
        if self.classifier.score_types.is_empty() {
            self.scoring.weights.score_types()
        } else {
            self.classifier.score_types.clone()
        }
    }
}

/// Prior knowledge used to re-score without recalibrating.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub weights: Arc<ClassifierWeights>,
    pub min_total_score: f64,
}

impl RunContext {
    pub fn new(weights: ClassifierWeights, min_total_score: f64) -> Self {
        Self {
            weights: Arc::new(weights),
            min_total_score,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.scoring.weights.clone(), config.scoring.min_total_score)
    }
}
