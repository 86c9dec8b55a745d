use super::result::ScoredPeptideResult;
use serde::Serialize;

/// Flat per-result row, one line of `summaries.csv`.
///
/// Peak group fields are `None` for results without a best group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeptideSummary {
    pub peptide_ref: String,
    pub decoy: bool,
    pub status: &'static str,
    pub apex_rt: Option<f32>,
    pub left_rt: Option<f32>,
    pub right_rt: Option<f32>,
    pub total_score: Option<f64>,
    pub fdr: Option<f64>,
    pub q_value: Option<f64>,
    pub best_ion: Option<String>,
    pub ion_count: Option<usize>,
    pub intensity_sum: Option<f64>,
    /// Fragment labels joined by `;`.
    pub fragments: String,
}

impl From<&ScoredPeptideResult> for PeptideSummary {
    fn from(result: &ScoredPeptideResult) -> Self {
        let best = result.best.as_ref();
        Self {
            peptide_ref: result.peptide_ref.clone(),
            decoy: result.decoy,
            status: result.status.as_str(),
            apex_rt: best.map(|x| x.apex_rt),
            left_rt: best.map(|x| x.left_rt),
            right_rt: best.map(|x| x.right_rt),
            total_score: best.map(|x| x.total_score),
            fdr: result.fdr,
            q_value: result.q_value,
            best_ion: best.and_then(|x| x.best_ion.clone()),
            ion_count: best.map(|x| x.ion_count),
            intensity_sum: best.map(|x| x.intensity_sum),
            fragments: result.fragments.join(";"),
        }
    }
}
