use super::features::{
    TraceContext,
    build_peak_group,
};
use super::peak_picking::pick_peaks;
use crate::config::ScoringConfig;
use crate::models::{
    ExtractedTrace,
    IdentifyStatus,
    PeptideCoordinate,
    ScoredPeptideResult,
};
use crate::utils::rolling_calculators::rolling_baseline;
use tracing::warn;

/// `true` when fewer than half of the requested fragments have signal.
pub fn has_insufficient_fragments(trace: &ExtractedTrace) -> bool {
    2 * trace.num_ions() < trace.expected_fragments()
}

/// Picks the candidate peak groups of a trace and scores them with the
/// configured weights.
///
/// A peak group whose sub-scores cannot be computed is dropped and
/// logged; the remaining ones are kept.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace", fields(peptide = %coord.peptide_ref))
)]
pub fn score(
    trace: ExtractedTrace,
    coord: &PeptideCoordinate,
    config: &ScoringConfig,
) -> ScoredPeptideResult {
    let summed = trace.summed();
    let baseline = rolling_baseline(&summed, config.sn_window);
    let peaks = pick_peaks(&summed, config.max_peak_groups);

    let ctx = TraceContext {
        trace: &trace,
        coord,
        baseline: &baseline,
        summed: &summed,
        max_xcorr_lag: config.max_xcorr_lag,
    };
    let peak_groups = peaks
        .iter()
        .filter_map(|peak| match build_peak_group(&ctx, peak) {
            Ok(mut group) => {
                group.apply_weights(&config.weights);
                Some(group)
            }
            Err(e) => {
                warn!(
                    "Dropping peak group at index {} of {}: {}",
                    peak.apex, coord.peptide_ref, e
                );
                None
            }
        })
        .collect();

    let status = if has_insufficient_fragments(&trace) {
        IdentifyStatus::InsufficientFragments
    } else {
        IdentifyStatus::Wait
    };
    let fragments = trace.ions().iter().map(|x| x.label.clone()).collect();
    ScoredPeptideResult::new(
        coord.peptide_ref.clone(),
        coord.decoy,
        fragments,
        trace,
        peak_groups,
        status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::extraction::extract;
    use crate::models::{
        IonTrace,
        ScoreType,
    };
    use crate::test_utils::SyntheticRun;

    #[test]
    fn test_score_clean_peak() {
        let coord = PeptideCoordinate::sample();
        let ms2 = SyntheticRun::new(20.0, 40.0, 0.25)
            .with_fragments(&coord, 31.0, 1000.0)
            .build();
        let ms1 = SyntheticRun::new(20.0, 40.0, 0.5)
            .with_isotopes(&coord, 31.0, 5000.0)
            .build();
        let trace = extract(&coord, Some(&ms1), &ms2, &ExtractionConfig::default())
            .unwrap()
            .unwrap();
        let res = score(trace, &coord, &ScoringConfig::default());

        assert_eq!(res.status, IdentifyStatus::Wait);
        let best = res.best.as_ref().unwrap();
        assert!((best.apex_rt - 31.0).abs() < 0.3, "apex: {}", best.apex_rt);
        assert!(best.left_rt <= best.apex_rt && best.apex_rt <= best.right_rt);
        assert_eq!(best.ion_count, 6);
        assert_eq!(best.best_ion.as_deref(), Some("y3"));
        assert!(best.sub_scores[&ScoreType::XcorrShape] > 0.9);
        assert!(best.sub_scores[&ScoreType::IsotopeCorrelation] > 0.9);
        assert!(best.sub_scores[&ScoreType::LibraryCorr] > 0.9);
        assert!(best.sub_scores[&ScoreType::NormRt] < 0.3);
        assert!(best.sub_scores[&ScoreType::LogSn] > 3.0);
        assert!(best.sub_scores[&ScoreType::MassdevWeighted] < 1.0);
        assert!(res.peak_groups.iter().all(|g| g.ion_count <= 6));
    }

    #[test]
    fn test_all_zero_trace_has_no_peak_group() {
        let coord = PeptideCoordinate::sample();
        let ions = coord
            .fragments
            .iter()
            .map(|f| IonTrace {
                label: f.label.clone(),
                mz: f.mz,
                rank: f.rank,
                intensities: vec![0.0; 10],
                observed_mz: vec![0.0; 10],
            })
            .collect();
        let rts = (0..10).map(|x| 20.0 + x as f32).collect();
        let trace = ExtractedTrace::try_new(rts, ions, vec![], 6).unwrap();
        let res = score(trace, &coord, &ScoringConfig::default());
        assert!(res.peak_groups.is_empty());
        assert!(res.best.is_none());
    }

    #[test]
    fn test_insufficient_fragments() {
        let coord = PeptideCoordinate::sample();
        let partial = coord.with_fragments(coord.fragments[..2].to_vec());
        let ms2 = SyntheticRun::new(20.0, 40.0, 0.25)
            .with_fragments(&partial, 30.0, 1000.0)
            .build();
        let trace = extract(&coord, None, &ms2, &ExtractionConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(trace.num_ions(), 2);
        assert!(has_insufficient_fragments(&trace));
        let res = score(trace, &coord, &ScoringConfig::default());
        assert_eq!(res.status, IdentifyStatus::InsufficientFragments);
        assert!(res.has_peak_groups());
    }
}
