use super::score_types::{
    ClassifierWeights,
    SubScores,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A chromatographic peak spanning the co-eluting fragment traces.
///
/// Invariants: `left_rt <= apex_rt <= right_rt` and `ion_count` is at
/// most the number of fragments of the trace it was picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePeakGroup {
    pub apex_rt: f32,
    pub left_rt: f32,
    pub right_rt: f32,
    /// Max intensity of each fragment inside the boundaries.
    pub ion_intensities: BTreeMap<String, f32>,
    pub ion_count: usize,
    pub intensity_sum: f64,
    /// Fragment with the highest intensity inside the boundaries.
    pub best_ion: Option<String>,
    pub sub_scores: SubScores,
    pub total_score: f64,
}

impl CandidatePeakGroup {
    pub fn apply_weights(&mut self, weights: &ClassifierWeights) {
        self.total_score = weights.total_score(&self.sub_scores);
    }

    /// Ordering where `Greater` is the better peak group: higher total
    /// score, then more ions.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.total_score
            .total_cmp(&other.total_score)
            .then(self.ion_count.cmp(&other.ion_count))
    }
}

/// Index of the best peak group among those passing `min_total_score`.
///
/// On a full tie the earliest group wins.
pub fn best_peak_group(groups: &[CandidatePeakGroup], min_total_score: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, group) in groups.iter().enumerate() {
        if group.total_score.is_nan() || group.total_score < min_total_score {
            continue;
        }
        best = match best {
            Some(b) if groups[b].rank_cmp(group) != Ordering::Less => Some(b),
            _ => Some(i),
        };
    }
    best
}

#[cfg(test)]
pub(crate) fn sample_group(apex_rt: f32, total_score: f64, ion_count: usize) -> CandidatePeakGroup {
    CandidatePeakGroup {
        apex_rt,
        left_rt: apex_rt - 1.0,
        right_rt: apex_rt + 1.0,
        ion_intensities: BTreeMap::new(),
        ion_count,
        intensity_sum: 0.0,
        best_ion: None,
        sub_scores: SubScores::new(),
        total_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_tie_breaks_on_ion_count() {
        let groups = vec![
            sample_group(10.0, 5.0, 3),
            sample_group(20.0, 5.0, 5),
            sample_group(30.0, 4.0, 6),
        ];
        assert_eq!(best_peak_group(&groups, f64::NEG_INFINITY), Some(1));
    }

    #[test]
    fn test_best_respects_minimum() {
        let groups = vec![sample_group(10.0, 5.0, 3), sample_group(20.0, 7.0, 5)];
        assert_eq!(best_peak_group(&groups, 6.0), Some(1));
        assert_eq!(best_peak_group(&groups, 8.0), None);
        assert_eq!(best_peak_group(&[], 0.0), None);
    }
}
