//! Chromatogram extraction from centroided spectra.
//!
//! Every fragment of a coordinate is traced over the MS2 spectra of its
//! isolation window, and the precursor isotopes over the MS1 spectra
//! nearest in time to each MS2 sample.

mod tolerance;

pub use tolerance::{
    MzTolerance,
    RtTolerance,
};

use crate::config::ExtractionConfig;
use crate::errors::DataProcessingError;
use crate::isotopes::isotope_mz;
use crate::models::{
    ExtractedTrace,
    IonTrace,
    PRECURSOR_ISOTOPE_OFFSETS,
    PeptideCoordinate,
    SpectrumMap,
};
use tracing::trace;

/// Extracts one chromatogram per fragment of `coord`.
///
/// Fragments without any signal are left out of the trace. Returns
/// `Ok(None)` when the RT window holds no MS2 spectra or no fragment has
/// signal at all.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace", fields(peptide = %coord.peptide_ref))
)]
pub fn extract(
    coord: &PeptideCoordinate,
    ms1: Option<&SpectrumMap>,
    ms2: &SpectrumMap,
    config: &ExtractionConfig,
) -> Result<Option<ExtractedTrace>, DataProcessingError> {
    let (rt_start, rt_end) = config.rt_tolerance.rt_range(coord);
    let spectra = ms2.range(rt_start, rt_end);
    if spectra.is_empty() {
        trace!("No MS2 spectra in RT range for {}", coord.peptide_ref);
        return Ok(None);
    }
    let rt_axis: Vec<f32> = spectra.iter().map(|s| s.rt).collect();

    let mut ions = Vec::with_capacity(coord.fragments.len());
    for frag in coord.fragments.iter() {
        let (low, high) = config.mz_tolerance.mz_range(frag.mz);
        let (intensities, observed_mz): (Vec<f32>, Vec<f64>) =
            spectra.iter().map(|s| s.sum_in_window(low, high)).unzip();
        let ion = IonTrace {
            label: frag.label.clone(),
            mz: frag.mz,
            rank: frag.rank,
            intensities,
            observed_mz,
        };
        if ion.has_signal() {
            ions.push(ion);
        }
    }
    if ions.is_empty() {
        return Ok(None);
    }

    let precursor = match ms1 {
        Some(ms1) if config.extract_precursor && !ms1.is_empty() => {
            PRECURSOR_ISOTOPE_OFFSETS
                .iter()
                .map(|&offset| {
                    let mz = isotope_mz(coord.precursor_mz, coord.charge, offset);
                    let (low, high) = config.mz_tolerance.mz_range(mz);
                    rt_axis
                        .iter()
                        .map(|&rt| {
                            ms1.nearest(rt)
                                .map(|s| s.sum_in_window(low, high).0)
                                .unwrap_or(0.0)
                        })
                        .collect::<Vec<f32>>()
                })
                .collect()
        }
        _ => Vec::new(),
    };

    ExtractedTrace::try_new(rt_axis, ions, precursor, coord.fragments.len())
        .map(Some)
        .map_err(|e| e.append_to_context(&format!(" while extracting {}", coord.peptide_ref)))
}
