use super::decoy::DecoyMarking;
use super::peak_group::{
    CandidatePeakGroup,
    best_peak_group,
};
use super::score_types::ClassifierWeights;
use super::trace::ExtractedTrace;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifyStatus {
    /// Scored, waiting for calibration.
    Wait,
    Success,
    Failed,
    InsufficientFragments,
}

impl IdentifyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifyStatus::Wait => "wait",
            IdentifyStatus::Success => "success",
            IdentifyStatus::Failed => "failed",
            IdentifyStatus::InsufficientFragments => "insufficient_fragments",
        }
    }
}

/// Everything known about one (coordinate, decoy flag) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPeptideResult {
    pub peptide_ref: String,
    pub decoy: bool,
    /// Fragment labels the peak groups were scored with.
    pub fragments: Vec<String>,
    /// Dropped by [`ScoredPeptideResult::compress`].
    pub trace: Option<ExtractedTrace>,
    pub peak_groups: Vec<CandidatePeakGroup>,
    pub best: Option<CandidatePeakGroup>,
    pub status: IdentifyStatus,
    pub fdr: Option<f64>,
    pub q_value: Option<f64>,
}

impl ScoredPeptideResult {
    pub fn new(
        peptide_ref: String,
        decoy: bool,
        fragments: Vec<String>,
        trace: ExtractedTrace,
        peak_groups: Vec<CandidatePeakGroup>,
        status: IdentifyStatus,
    ) -> Self {
        let mut out = Self {
            peptide_ref,
            decoy,
            fragments,
            trace: Some(trace),
            peak_groups,
            best: None,
            status,
            fdr: None,
            q_value: None,
        };
        out.select_best(f64::NEG_INFINITY);
        out
    }

    pub fn marking(&self) -> DecoyMarking {
        DecoyMarking::from(self.decoy)
    }

    pub fn has_peak_groups(&self) -> bool {
        !self.peak_groups.is_empty()
    }

    pub fn best_total_score(&self) -> Option<f64> {
        self.best.as_ref().map(|x| x.total_score)
    }

    /// Drops the per-RT intensity arrays, keeping the peak group
    /// summaries.
    pub fn compress(&mut self) {
        self.trace = None;
    }

    /// Re-selects the best peak group among those scoring at least
    /// `min_total_score`.
    pub fn select_best(&mut self, min_total_score: f64) -> Option<&CandidatePeakGroup> {
        self.best = best_peak_group(&self.peak_groups, min_total_score)
            .map(|i| self.peak_groups[i].clone());
        self.best.as_ref()
    }

    /// Recomputes every peak group total with new weights and
    /// re-selects the best one.
    pub fn apply_weights(&mut self, weights: &ClassifierWeights) {
        for group in self.peak_groups.iter_mut() {
            group.apply_weights(weights);
        }
        self.select_best(f64::NEG_INFINITY);
    }

    /// Accepts the result if a peak group reaches `min_total_score`.
    ///
    /// Results already flagged as [`IdentifyStatus::InsufficientFragments`]
    /// keep that status when nothing passes.
    pub fn judge(&mut self, min_total_score: f64) -> IdentifyStatus {
        let passed = self.select_best(min_total_score).is_some();
        self.status = if passed {
            IdentifyStatus::Success
        } else {
            match self.status {
                IdentifyStatus::Wait | IdentifyStatus::Success | IdentifyStatus::Failed => {
                    IdentifyStatus::Failed
                }
                IdentifyStatus::InsufficientFragments => IdentifyStatus::InsufficientFragments,
            }
        };
        if !passed {
            // Keep reporting the best available group for diagnostics.
            self.select_best(f64::NEG_INFINITY);
        }
        self.status
    }
}
