use super::SearchHit;
use crate::config::AnalysisConfig;
use crate::errors::DataProcessingError;
use crate::extraction::extract;
use crate::fragment_mass::generate_by_ions;
use crate::models::{
    ClassifierWeights,
    ExtractedTrace,
    FragmentDescriptor,
    PeptideCoordinate,
    SpectrumMap,
};
use crate::scoring::score;
use itertools::Itertools;
use std::collections::BTreeMap;
use tracing::debug;

/// Coefficient of variation (sample std over mean) of the non-zero
/// intensities of a trace.
///
/// `None` with fewer than two non-zero samples.
pub fn ion_cv(intensities: &[f32]) -> Option<f64> {
    let nonzero: Vec<f64> = intensities
        .iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| x as f64)
        .collect();
    if nonzero.len() < 2 {
        return None;
    }
    let n = nonzero.len() as f64;
    let mean = nonzero.iter().sum::<f64>() / n;
    let var = nonzero.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt() / mean)
}

/// Labels of the ions of `trace` with the highest CV, most distinct
/// first.
fn rank_candidates(trace: &ExtractedTrace, keep: usize) -> Vec<String> {
    let mut stats: Vec<(&str, f64)> = trace
        .ions()
        .iter()
        .filter_map(|ion| ion_cv(&ion.intensities).map(|cv| (ion.label.as_str(), cv)))
        .collect();
    stats.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
    stats
        .into_iter()
        .take(keep)
        .map(|(label, _)| label.to_string())
        .collect()
}

/// The winning combination stands if no other combination supported
/// more ions, or if it has more than `min_ion_count` of its own.
fn accepts_ion_count(final_ion_count: usize, max_ion_count: usize, min_ion_count: usize) -> bool {
    final_ion_count == max_ion_count || final_ion_count > min_ion_count
}

/// Replaces the `replace` weakest library fragments by generated b/y
/// ions and keeps the best scoring combination.
///
/// Combinations including an ion without signal are skipped. The winner
/// is only accepted when its ion count is the highest seen over all
/// combinations, or above `config.search.min_ion_count`.
pub fn substitution_search(
    coord: &PeptideCoordinate,
    ms1: Option<&SpectrumMap>,
    ms2: &SpectrumMap,
    config: &AnalysisConfig,
    weights: &ClassifierWeights,
    replace: usize,
) -> Result<Option<SearchHit>, DataProcessingError> {
    let library = coord.fragments_by_rank();
    if library.is_empty() {
        return Ok(None);
    }
    let first_rank = library.iter().map(|f| f.rank).max().unwrap_or(0) + 1;
    let generated = match generate_by_ions(
        &coord.sequence,
        coord.charge,
        config.search.min_fragment_length,
        first_rank,
    ) {
        Ok(generated) => generated,
        Err(e) => {
            debug!("Cannot fragment {}: {}", coord.peptide_ref, e);
            return Ok(None);
        }
    };

    // Library descriptors win over generated ones with the same label.
    let mut pool: BTreeMap<String, FragmentDescriptor> = generated
        .into_iter()
        .map(|f| (f.label.clone(), f))
        .collect();
    for frag in library.iter() {
        pool.insert(frag.label.clone(), frag.clone());
    }

    let everything = coord.with_fragments(pool.values().cloned().collect());
    let Some(trace) = extract(&everything, ms1, ms2, &config.extraction)? else {
        return Ok(None);
    };
    let candidates = rank_candidates(&trace, config.search.max_candidate_ions);
    let replace = replace.clamp(1, library.len());
    let kept = &library[..library.len() - replace];

    let mut max_ion_count = 0;
    let mut best: Option<SearchHit> = None;
    for combination in candidates.iter().combinations(replace) {
        if combination.iter().any(|c| kept.iter().any(|k| &k.label == *c)) {
            continue;
        }
        let fragments: Vec<FragmentDescriptor> = kept
            .iter()
            .cloned()
            .chain(combination.iter().filter_map(|c| pool.get(*c).cloned()))
            .collect();
        // Combinations with a silent ion, kept or generated, are skipped.
        let labels: Vec<&str> = fragments.iter().map(|f| f.label.as_str()).collect();
        let Some(sub_trace) = trace.select(&labels) else {
            continue;
        };
        let candidate = coord.with_fragments(fragments);
        let mut result = score(sub_trace, &candidate, &config.scoring);
        result.apply_weights(weights);
        let Some(group) = result.best.as_ref() else {
            continue;
        };
        max_ion_count = max_ion_count.max(group.ion_count);
        let beats = best
            .as_ref()
            .and_then(|b| b.total_score())
            .is_none_or(|s| group.total_score > s);
        if beats {
            best = Some(SearchHit {
                coord: candidate,
                result,
            });
        }
    }

    let Some(hit) = best else {
        return Ok(None);
    };
    let final_ion_count = hit.result.best.as_ref().map(|x| x.ion_count).unwrap_or(0);
    if accepts_ion_count(final_ion_count, max_ion_count, config.search.min_ion_count) {
        debug!(
            "Substitution for {} accepted with {} ions",
            coord.peptide_ref, final_ion_count
        );
        Ok(Some(hit))
    } else {
        debug!(
            "Substitution for {} rejected, {} ions of best {}",
            coord.peptide_ref, final_ion_count, max_ion_count
        );
        Ok(None)
    }
}
