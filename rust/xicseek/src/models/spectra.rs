use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};

/// One centroided spectrum: peaks sorted by m/z.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub rt: f32,
    pub mz: Vec<f64>,
    pub intensity: Vec<f32>,
}

impl Spectrum {
    /// Summed intensity and intensity-weighted mean m/z of the peaks in
    /// `[low, high]`.
    ///
    /// Returns `(0.0, 0.0)` when nothing falls in the window.
    pub fn sum_in_window(&self, low: f64, high: f64) -> (f32, f64) {
        let start = self.mz.partition_point(|&x| x < low);
        let end = self.mz.partition_point(|&x| x <= high);
        if start >= end {
            return (0.0, 0.0);
        }
        let mut total = 0.0f32;
        let mut weighted_mz = 0.0f64;
        for (mz, inten) in self.mz[start..end]
            .iter()
            .zip(self.intensity[start..end].iter())
        {
            total += inten;
            weighted_mz += mz * (*inten as f64);
        }
        if total > 0.0 {
            (total, weighted_mz / total as f64)
        } else {
            (0.0, 0.0)
        }
    }
}

/// Retention-time ordered collection of spectra.
///
/// Invariants (checked on construction):
/// * spectra are sorted by RT with no duplicated RT,
/// * within a spectrum `mz` and `intensity` have the same length and
///   `mz` is sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Spectrum>", into = "Vec<Spectrum>")]
pub struct SpectrumMap {
    spectra: Vec<Spectrum>,
}

impl SpectrumMap {
    pub fn try_new(mut spectra: Vec<Spectrum>) -> Result<Self, DataProcessingError> {
        for spec in spectra.iter_mut() {
            if spec.mz.len() != spec.intensity.len() {
                return Err(DataProcessingError::ExpectedSlicesSameLength {
                    expected: spec.mz.len(),
                    other: spec.intensity.len(),
                    context: format!("spectrum at rt {}", spec.rt),
                });
            }
            if !spec.rt.is_finite() {
                return Err(DataProcessingError::ExpectedFiniteNonNanData {
                    context: "spectrum retention time".to_string(),
                });
            }
            if !spec.mz.is_sorted() {
                let mut order: Vec<usize> = (0..spec.mz.len()).collect();
                order.sort_by(|&a, &b| spec.mz[a].total_cmp(&spec.mz[b]));
                spec.mz = order.iter().map(|&i| spec.mz[i]).collect();
                spec.intensity = order.iter().map(|&i| spec.intensity[i]).collect();
            }
        }
        spectra.sort_by(|a, b| a.rt.total_cmp(&b.rt));
        if let Some(w) = spectra.windows(2).find(|w| w[0].rt == w[1].rt) {
            return Err(DataProcessingError::DuplicatedRetentionTime {
                rt: w[0].rt,
                context: "spectrum map".to_string(),
            });
        }
        Ok(Self { spectra })
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    /// Spectra with `start <= rt <= end`.
    pub fn range(&self, start: f32, end: f32) -> &[Spectrum] {
        let lo = self.spectra.partition_point(|s| s.rt < start);
        let hi = self.spectra.partition_point(|s| s.rt <= end);
        if lo >= hi { &[] } else { &self.spectra[lo..hi] }
    }

    /// Spectrum closest in retention time.
    pub fn nearest(&self, rt: f32) -> Option<&Spectrum> {
        let idx = self.spectra.partition_point(|s| s.rt < rt);
        let after = self.spectra.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.spectra.get(i));
        match (before, after) {
            (Some(b), Some(a)) => {
                if (rt - b.rt) <= (a.rt - rt) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (Some(b), None) => Some(b),
            (None, a) => a,
        }
    }
}

impl TryFrom<Vec<Spectrum>> for SpectrumMap {
    type Error = DataProcessingError;

    fn try_from(value: Vec<Spectrum>) -> Result<Self, Self::Error> {
        SpectrumMap::try_new(value)
    }
}

impl From<SpectrumMap> for Vec<Spectrum> {
    fn from(value: SpectrumMap) -> Self {
        value.spectra
    }
}

/// MS2 spectra acquired with one precursor isolation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationWindow {
    pub lower_mz: f64,
    pub upper_mz: f64,
    pub spectra: SpectrumMap,
}

/// All spectra of one run, the read-only input of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralData {
    pub ms1: SpectrumMap,
    pub ms2_windows: Vec<IsolationWindow>,
}

impl SpectralData {
    /// MS2 map whose isolation window contains the precursor.
    pub fn ms2_for_precursor(&self, precursor_mz: f64) -> Option<&SpectrumMap> {
        self.ms2_windows
            .iter()
            .find(|w| w.lower_mz <= precursor_mz && precursor_mz < w.upper_mz)
            .map(|w| &w.spectra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(rt: f32, peaks: &[(f64, f32)]) -> Spectrum {
        Spectrum {
            rt,
            mz: peaks.iter().map(|p| p.0).collect(),
            intensity: peaks.iter().map(|p| p.1).collect(),
        }
    }

    #[test]
    fn test_sum_in_window() {
        let s = spec(1.0, &[(100.0, 1.0), (100.001, 3.0), (101.0, 5.0)]);
        let (inten, mz) = s.sum_in_window(99.99, 100.01);
        assert_eq!(inten, 4.0);
        assert!((mz - 100.00075).abs() < 1e-9);
        assert_eq!(s.sum_in_window(200.0, 201.0), (0.0, 0.0));
    }

    #[test]
    fn test_map_sorting_and_range() {
        let map = SpectrumMap::try_new(vec![
            spec(3.0, &[(101.0, 1.0), (100.0, 2.0)]),
            spec(1.0, &[]),
            spec(2.0, &[]),
        ])
        .unwrap();
        let rts: Vec<f32> = map.spectra().iter().map(|s| s.rt).collect();
        assert_eq!(rts, vec![1.0, 2.0, 3.0]);
        assert_eq!(map.spectra()[2].mz, vec![100.0, 101.0]);
        assert_eq!(map.spectra()[2].intensity, vec![2.0, 1.0]);
        assert_eq!(map.range(1.5, 3.0).len(), 2);
        assert!(map.range(4.0, 5.0).is_empty());
        assert_eq!(map.nearest(2.4).unwrap().rt, 2.0);
        assert_eq!(map.nearest(10.0).unwrap().rt, 3.0);
    }

    #[test]
    fn test_map_rejects_bad_input() {
        let bad = Spectrum {
            rt: 1.0,
            mz: vec![1.0],
            intensity: vec![],
        };
        assert!(SpectrumMap::try_new(vec![bad]).is_err());
        let duplicated = SpectrumMap::try_new(vec![spec(1.0, &[]), spec(1.0, &[])]);
        assert!(matches!(
            duplicated,
            Err(DataProcessingError::DuplicatedRetentionTime { rt, .. }) if rt == 1.0
        ));
    }

    #[test]
    fn test_window_routing() {
        let data = SpectralData {
            ms1: SpectrumMap::default(),
            ms2_windows: vec![
                IsolationWindow {
                    lower_mz: 400.0,
                    upper_mz: 425.0,
                    spectra: SpectrumMap::default(),
                },
                IsolationWindow {
                    lower_mz: 425.0,
                    upper_mz: 450.0,
                    spectra: SpectrumMap::try_new(vec![spec(1.0, &[])]).unwrap(),
                },
            ],
        };
        assert_eq!(data.ms2_for_precursor(430.0).unwrap().len(), 1);
        assert!(data.ms2_for_precursor(460.0).is_none());
    }
}
