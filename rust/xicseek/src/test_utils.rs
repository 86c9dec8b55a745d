//! Synthetic runs with gaussian elution profiles for unit tests.

use crate::isotopes::{
    expected_isotope_envelope,
    isotope_mz,
};
use crate::fragment_mass::MASS_PROTON;
use crate::models::{
    PeptideCoordinate,
    Spectrum,
    SpectrumMap,
};

struct SyntheticPeak {
    mz: f64,
    apex_rt: f32,
    sigma: f32,
    height: f32,
}

pub(crate) struct SyntheticRun {
    rts: Vec<f32>,
    peaks: Vec<SyntheticPeak>,
    noise_mzs: Vec<f64>,
}

impl SyntheticRun {
    pub(crate) fn new(start: f32, end: f32, step: f32) -> Self {
        let n = ((end - start) / step).round() as usize;
        Self {
            rts: (0..=n).map(|i| start + i as f32 * step).collect(),
            peaks: Vec::new(),
            noise_mzs: Vec::new(),
        }
    }

    pub(crate) fn with_peak(self, mz: f64, apex_rt: f32, height: f32) -> Self {
        self.with_wide_peak(mz, apex_rt, 1.0, height)
    }

    pub(crate) fn with_wide_peak(mut self, mz: f64, apex_rt: f32, sigma: f32, height: f32) -> Self {
        self.peaks.push(SyntheticPeak {
            mz,
            apex_rt,
            sigma,
            height,
        });
        self
    }

    /// Co-eluting fragments of `coord`, intensity decreasing with rank.
    pub(crate) fn with_fragments(
        mut self,
        coord: &PeptideCoordinate,
        apex_rt: f32,
        height: f32,
    ) -> Self {
        for frag in coord.fragments.iter() {
            self = self.with_peak(frag.mz, apex_rt, height / frag.rank.max(1) as f32);
            self.noise_mzs.push(frag.mz);
        }
        self
    }

    /// Precursor isotopes of `coord` following the expected envelope.
    pub(crate) fn with_isotopes(
        mut self,
        coord: &PeptideCoordinate,
        apex_rt: f32,
        height: f32,
    ) -> Self {
        let mass = (coord.precursor_mz - MASS_PROTON) * coord.charge as f64;
        let envelope = expected_isotope_envelope(mass, 3);
        for (offset, rel) in envelope.iter().enumerate() {
            let mz = isotope_mz(coord.precursor_mz, coord.charge, offset as i8);
            self = self.with_peak(mz, apex_rt, height * rel);
        }
        self
    }

    pub(crate) fn build(&self) -> SpectrumMap {
        let spectra = self
            .rts
            .iter()
            .enumerate()
            .map(|(i, &rt)| {
                let mut peaks: Vec<(f64, f32)> = self
                    .peaks
                    .iter()
                    .map(|p| {
                        let d = (rt - p.apex_rt) / p.sigma;
                        (p.mz, p.height * (-0.5 * d * d).exp())
                    })
                    .collect();
                // Low deterministic noise floor next to every fragment.
                for (j, &mz) in self.noise_mzs.iter().enumerate() {
                    let level = 1.0 + ((i * 7 + j * 3) % 5) as f32 * 0.5;
                    peaks.push((mz + 1e-4, level));
                }
                peaks.sort_by(|a, b| a.0.total_cmp(&b.0));
                Spectrum {
                    rt,
                    mz: peaks.iter().map(|p| p.0).collect(),
                    intensity: peaks.iter().map(|p| p.1).collect(),
                }
            })
            .collect();
        SpectrumMap::try_new(spectra).unwrap()
    }
}
