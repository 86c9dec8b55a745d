//! Alternative fragment hypotheses for coordinates whose direct score is
//! unsatisfactory.

mod deletion;
mod substitution;

pub use deletion::deletion_search;
pub use substitution::{
    ion_cv,
    substitution_search,
};

use crate::config::{
    AnalysisConfig,
    SearchMode,
};
use crate::errors::DataProcessingError;
use crate::models::{
    ClassifierWeights,
    PeptideCoordinate,
    ScoredPeptideResult,
    SpectrumMap,
};

/// Fragment hypothesis retained by a search, with its scored result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub coord: PeptideCoordinate,
    pub result: ScoredPeptideResult,
}

impl SearchHit {
    pub fn total_score(&self) -> Option<f64> {
        self.result.best_total_score()
    }
}

/// Runs the search selected by `config.search.mode`.
///
/// `direct_score` is the best total score of the unmodified coordinate,
/// if any.
pub fn run_search(
    coord: &PeptideCoordinate,
    ms1: Option<&SpectrumMap>,
    ms2: &SpectrumMap,
    config: &AnalysisConfig,
    weights: &ClassifierWeights,
    direct_score: Option<f64>,
) -> Result<Option<SearchHit>, DataProcessingError> {
    match config.search.mode {
        SearchMode::Off => Ok(None),
        SearchMode::Deletion => deletion_search(coord, ms1, ms2, config, weights, direct_score),
        SearchMode::Substitution => substitution_search(coord, ms1, ms2, config, weights, 1),
        SearchMode::ChargeChange => substitution_search(coord, ms1, ms2, config, weights, 6),
    }
}
