use super::SearchHit;
use crate::config::AnalysisConfig;
use crate::errors::DataProcessingError;
use crate::extraction::extract;
use crate::models::{
    ClassifierWeights,
    PeptideCoordinate,
    SpectrumMap,
};
use crate::scoring::score;
use std::collections::BTreeMap;
use tracing::debug;

/// Re-scores the coordinate once per left-out fragment and keeps the
/// best hit at the most frequently selected apex RT.
///
/// Ties in hit count go to the RT holding the higher score. Returns
/// `None` when no deletion produced a peak group, or when the retained
/// hit scores below `direct_score`.
pub fn deletion_search(
    coord: &PeptideCoordinate,
    ms1: Option<&SpectrumMap>,
    ms2: &SpectrumMap,
    config: &AnalysisConfig,
    weights: &ClassifierWeights,
    direct_score: Option<f64>,
) -> Result<Option<SearchHit>, DataProcessingError> {
    if coord.fragments.len() < 2 {
        return Ok(None);
    }

    // Keyed by the bits of the selected apex RT, only lives for this call.
    let mut hits_by_rt: BTreeMap<u32, Vec<SearchHit>> = BTreeMap::new();
    for i in 0..coord.fragments.len() {
        let mut fragments = coord.fragments.clone();
        fragments.remove(i);
        let reduced = coord.with_fragments(fragments);

        let Some(trace) = extract(&reduced, ms1, ms2, &config.extraction)? else {
            continue;
        };
        let mut result = score(trace, &reduced, &config.scoring);
        result.apply_weights(weights);
        let Some(apex_rt) = result.best.as_ref().map(|x| x.apex_rt) else {
            continue;
        };
        hits_by_rt.entry(apex_rt.to_bits()).or_default().push(SearchHit {
            coord: reduced,
            result,
        });
    }

    let group_best = |hits: &[SearchHit]| {
        hits.iter()
            .filter_map(|x| x.total_score())
            .fold(f64::NEG_INFINITY, f64::max)
    };
    let Some(max_hit_group) = hits_by_rt.into_values().max_by(|a, b| {
        a.len()
            .cmp(&b.len())
            .then(group_best(a).total_cmp(&group_best(b)))
    }) else {
        return Ok(None);
    };

    let best = max_hit_group.into_iter().max_by(|a, b| {
        let sa = a.total_score().unwrap_or(f64::NEG_INFINITY);
        let sb = b.total_score().unwrap_or(f64::NEG_INFINITY);
        sa.total_cmp(&sb)
    });
    match (best, direct_score) {
        (Some(hit), Some(direct)) if hit.total_score().is_some_and(|s| s < direct) => {
            debug!(
                "Deletion search for {} did not beat the direct score {}",
                coord.peptide_ref, direct
            );
            Ok(None)
        }
        (best, _) => Ok(best),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SyntheticRun;
    use crate::models::ScoreType;

    fn shape_weights() -> ClassifierWeights {
        ClassifierWeights::new(
            [
                (ScoreType::XcorrShape, 1.0),
                (ScoreType::XcorrShapeWeighted, 1.0),
                (ScoreType::LibraryCorr, 1.0),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_deletion_removes_interfering_fragment() {
        let coord = PeptideCoordinate::sample();
        let y5 = coord.fragments[2].mz;
        // Broad co-eluting interference on y5, three times the top ion.
        let ms2 = SyntheticRun::new(20.0, 40.0, 0.2)
            .with_fragments(&coord, 32.4, 1000.0)
            .with_wide_peak(y5, 32.4, 4.0, 3000.0)
            .build();
        let mut config = AnalysisConfig::default();
        config.scoring.weights = shape_weights();
        let weights = shape_weights();

        let trace = extract(&coord, None, &ms2, &config.extraction).unwrap().unwrap();
        let direct = score(trace, &coord, &config.scoring);
        let direct_score = direct.best_total_score().unwrap();

        let hit = deletion_search(&coord, None, &ms2, &config, &weights, Some(direct_score))
            .unwrap()
            .unwrap();
        let best = hit.result.best.as_ref().unwrap();
        assert!((best.apex_rt - 32.4).abs() < 0.1, "apex {}", best.apex_rt);
        assert!(best.total_score >= direct_score);
        assert!(!hit.coord.fragments.iter().any(|f| f.label == "y5"));
        assert_eq!(hit.result.fragments.len(), 5);
    }

    #[test]
    fn test_deletion_never_below_direct() {
        let coord = PeptideCoordinate::sample();
        let ms2 = SyntheticRun::new(20.0, 40.0, 0.2)
            .with_fragments(&coord, 30.0, 1000.0)
            .build();
        let config = AnalysisConfig::default();
        let weights = ClassifierWeights::default();
        let out = deletion_search(&coord, None, &ms2, &config, &weights, Some(f64::INFINITY))
            .unwrap();
        assert!(out.is_none());

        let out = deletion_search(&coord, None, &ms2, &config, &weights, None).unwrap();
        assert!(out.is_some());
    }

    #[test]
    fn test_deletion_without_signal() {
        let coord = PeptideCoordinate::sample();
        let ms2 = SyntheticRun::new(20.0, 40.0, 0.2).build();
        let config = AnalysisConfig::default();
        let out = deletion_search(
            &coord,
            None,
            &ms2,
            &config,
            &ClassifierWeights::default(),
            None,
        )
        .unwrap();
        assert!(out.is_none());
    }
}
