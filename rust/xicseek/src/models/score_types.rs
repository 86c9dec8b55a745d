use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

/// Sub-scores computed for every candidate peak group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    XcorrShape,
    XcorrShapeWeighted,
    XcorrCoelution,
    IsotopeCorrelation,
    IsotopeOverlap,
    MassdevWeighted,
    LogSn,
    NormRt,
    IonCount,
    LibraryCorr,
}

impl ScoreType {
    pub const ALL: [ScoreType; 10] = [
        ScoreType::XcorrShape,
        ScoreType::XcorrShapeWeighted,
        ScoreType::XcorrCoelution,
        ScoreType::IsotopeCorrelation,
        ScoreType::IsotopeOverlap,
        ScoreType::MassdevWeighted,
        ScoreType::LogSn,
        ScoreType::NormRt,
        ScoreType::IonCount,
        ScoreType::LibraryCorr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoreType::XcorrShape => "xcorr_shape",
            ScoreType::XcorrShapeWeighted => "xcorr_shape_weighted",
            ScoreType::XcorrCoelution => "xcorr_coelution",
            ScoreType::IsotopeCorrelation => "isotope_correlation",
            ScoreType::IsotopeOverlap => "isotope_overlap",
            ScoreType::MassdevWeighted => "massdev_weighted",
            ScoreType::LogSn => "log_sn",
            ScoreType::NormRt => "norm_rt",
            ScoreType::IonCount => "ion_count",
            ScoreType::LibraryCorr => "library_corr",
        }
    }
}

pub type SubScores = BTreeMap<ScoreType, f64>;

/// Weight per sub-score of the linear total score.
///
/// A snapshot is never mutated once built; refinement steps produce a
/// new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifierWeights {
    weights: BTreeMap<ScoreType, f64>,
}

impl ClassifierWeights {
    pub fn new(weights: BTreeMap<ScoreType, f64>) -> Self {
        Self { weights }
    }

    pub fn get(&self, score_type: ScoreType) -> Option<f64> {
        self.weights.get(&score_type).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreType, f64)> + '_ {
        self.weights.iter().map(|(k, v)| (*k, *v))
    }

    pub fn score_types(&self) -> Vec<ScoreType> {
        self.weights.keys().copied().collect()
    }

    /// Weighted sum of the sub-scores, missing sub-scores count as zero.
    pub fn total_score(&self, sub_scores: &SubScores) -> f64 {
        self.weights
            .iter()
            .map(|(k, w)| w * sub_scores.get(k).copied().unwrap_or(0.0))
            .sum()
    }
}

impl Default for ClassifierWeights {
    fn default() -> Self {
        let weights = [
            (ScoreType::XcorrShape, 1.0),
            (ScoreType::XcorrShapeWeighted, 1.0),
            (ScoreType::XcorrCoelution, -0.3),
            (ScoreType::IsotopeCorrelation, 0.5),
            (ScoreType::IsotopeOverlap, -0.5),
            (ScoreType::MassdevWeighted, -0.05),
            (ScoreType::LogSn, 0.5),
            (ScoreType::NormRt, -0.1),
            (ScoreType::IonCount, 0.3),
            (ScoreType::LibraryCorr, 0.5),
        ];
        Self {
            weights: weights.into_iter().collect(),
        }
    }
}
