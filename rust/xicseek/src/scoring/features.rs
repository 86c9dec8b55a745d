use super::peak_picking::PeakBoundary;
use crate::errors::DataProcessingError;
use crate::extraction::MzTolerance;
use crate::fragment_mass::MASS_PROTON;
use crate::isotopes::expected_isotope_envelope;
use crate::models::{
    CandidatePeakGroup,
    ExtractedTrace,
    PeptideCoordinate,
    ScoreType,
    SubScores,
};
use crate::utils::correlation::{
    max_cross_correlation,
    pearson_correlation,
    spearman_correlation,
};
use std::collections::BTreeMap;

/// Shared, per trace inputs of the sub-score calculations.
pub(super) struct TraceContext<'a> {
    pub trace: &'a ExtractedTrace,
    pub coord: &'a PeptideCoordinate,
    /// Rolling median of the summed fragment trace.
    pub baseline: &'a [f32],
    pub summed: &'a [f32],
    pub max_xcorr_lag: usize,
}

struct CrossCorrelationScores {
    shape: f64,
    shape_weighted: f64,
    coelution: f64,
}

fn cross_correlation_scores(
    ctx: &TraceContext,
    peak: &PeakBoundary,
) -> Result<CrossCorrelationScores, DataProcessingError> {
    let ions = ctx.trace.ions();
    let range = peak.range();

    let mut sum = 0.0;
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut lags = Vec::new();
    for i in 0..ions.len() {
        for j in (i + 1)..ions.len() {
            let a = &ions[i].intensities[range.clone()];
            let b = &ions[j].intensities[range.clone()];
            let (lag, corr) = max_cross_correlation(a, b, ctx.max_xcorr_lag)?;
            let weight = 1.0 / (ions[i].rank.max(1) as f64 * ions[j].rank.max(1) as f64);
            sum += corr as f64;
            weighted_sum += weight * corr as f64;
            weight_total += weight;
            lags.push(lag.unsigned_abs() as f64);
        }
    }
    if lags.is_empty() {
        return Ok(CrossCorrelationScores {
            shape: 0.0,
            shape_weighted: 0.0,
            coelution: 0.0,
        });
    }

    let n = lags.len() as f64;
    let mean_lag = lags.iter().sum::<f64>() / n;
    let std_lag = (lags.iter().map(|x| (x - mean_lag).powi(2)).sum::<f64>() / n).sqrt();
    Ok(CrossCorrelationScores {
        shape: sum / n,
        shape_weighted: weighted_sum / weight_total,
        coelution: mean_lag + std_lag,
    })
}

/// Isotope correlation and M-1 overlap, `None` without MS1 traces.
fn isotope_scores(
    ctx: &TraceContext,
    peak: &PeakBoundary,
) -> Result<Option<(f64, f64)>, DataProcessingError> {
    let range = peak.range();
    let sum_of = |offset: i8| -> Option<f32> {
        ctx.trace
            .precursor_isotope(offset)
            .map(|x| x[range.clone()].iter().sum())
    };
    let (Some(m_minus), Some(m0), Some(m1), Some(m2)) =
        (sum_of(-1), sum_of(0), sum_of(1), sum_of(2))
    else {
        return Ok(None);
    };

    let neutral_mass =
        (ctx.coord.precursor_mz - MASS_PROTON) * ctx.coord.charge.max(1) as f64;
    let expected = expected_isotope_envelope(neutral_mass, 3);
    let corr = pearson_correlation(&[m0, m1, m2], &expected)?;
    let corr = if corr.is_nan() { 0.0 } else { corr as f64 };
    let overlap = if m0 > 0.0 {
        (m_minus / m0) as f64
    } else {
        0.0
    };
    Ok(Some((corr, overlap)))
}

/// Intensity weighted mean absolute ppm error at the apex.
fn mass_deviation(ctx: &TraceContext, apex: usize) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for ion in ctx.trace.ions() {
        let inten = ion.intensities[apex] as f64;
        if inten <= 0.0 {
            continue;
        }
        weighted += inten * MzTolerance::ppm_error(ion.mz, ion.observed_mz[apex]).abs();
        total += inten;
    }
    if total > 0.0 { weighted / total } else { 0.0 }
}

/// Natural log of the apex signal over the local noise level, floored
/// at zero.
fn log_signal_to_noise(ctx: &TraceContext, apex: usize) -> f64 {
    let signal = ctx.summed[apex] as f64;
    let noise = ctx.baseline[apex] as f64;
    let noise = if noise > 0.0 { noise } else { 1.0 };
    (signal / noise).max(1.0).ln()
}

fn library_correlation(
    observed: &[f32],
    ranks: &[f32],
) -> Result<f64, DataProcessingError> {
    if observed.len() < 2 {
        return Ok(0.0);
    }
    let corr = spearman_correlation(observed, ranks)?;
    Ok(if corr.is_nan() { 0.0 } else { corr as f64 })
}

/// Builds the peak group of `peak` with all its sub-scores.
///
/// The total score is left at zero for the caller to weight.
pub(super) fn build_peak_group(
    ctx: &TraceContext,
    peak: &PeakBoundary,
) -> Result<CandidatePeakGroup, DataProcessingError> {
    let rt_axis = ctx.trace.rt_axis();
    let range = peak.range();

    let mut ion_intensities = BTreeMap::new();
    let mut observed = Vec::with_capacity(ctx.trace.num_ions());
    let mut inverse_ranks = Vec::with_capacity(ctx.trace.num_ions());
    let mut intensity_sum = 0.0f64;
    let mut best_ion: Option<(&str, f32)> = None;
    for ion in ctx.trace.ions() {
        let slice = &ion.intensities[range.clone()];
        let max = slice.iter().copied().fold(0.0f32, f32::max);
        intensity_sum += slice.iter().map(|&x| x as f64).sum::<f64>();
        if best_ion.is_none_or(|(_, b)| max > b) {
            best_ion = Some((ion.label.as_str(), max));
        }
        ion_intensities.insert(ion.label.clone(), max);
        observed.push(max);
        // Rank 1 is the most intense library ion.
        inverse_ranks.push(-(ion.rank as f32));
    }
    let ion_count = ctx
        .trace
        .ions()
        .iter()
        .filter(|x| x.intensities[peak.apex] > 0.0)
        .count();

    let xcorr = cross_correlation_scores(ctx, peak)?;
    let apex_rt = rt_axis[peak.apex];

    let mut sub_scores = SubScores::new();
    sub_scores.insert(ScoreType::XcorrShape, xcorr.shape);
    sub_scores.insert(ScoreType::XcorrShapeWeighted, xcorr.shape_weighted);
    sub_scores.insert(ScoreType::XcorrCoelution, xcorr.coelution);
    if let Some((corr, overlap)) = isotope_scores(ctx, peak)? {
        sub_scores.insert(ScoreType::IsotopeCorrelation, corr);
        sub_scores.insert(ScoreType::IsotopeOverlap, overlap);
    }
    sub_scores.insert(ScoreType::MassdevWeighted, mass_deviation(ctx, peak.apex));
    sub_scores.insert(ScoreType::LogSn, log_signal_to_noise(ctx, peak.apex));
    sub_scores.insert(ScoreType::NormRt, (apex_rt - ctx.coord.rt).abs() as f64);
    sub_scores.insert(ScoreType::IonCount, ion_count as f64);
    sub_scores.insert(
        ScoreType::LibraryCorr,
        library_correlation(&observed, &inverse_ranks)?,
    );

    if let Some((k, v)) = sub_scores.iter().find(|(_, v)| !v.is_finite()) {
        return Err(DataProcessingError::ExpectedFiniteNonNanData {
            context: format!("sub-score {} is {}", k.name(), v),
        });
    }

    Ok(CandidatePeakGroup {
        apex_rt,
        left_rt: rt_axis[peak.left],
        right_rt: rt_axis[peak.right],
        ion_intensities,
        ion_count,
        intensity_sum,
        best_ion: best_ion.map(|(label, _)| label.to_string()),
        sub_scores,
        total_score: 0.0,
    })
}
