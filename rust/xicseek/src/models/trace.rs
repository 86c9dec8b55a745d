use crate::errors::DataProcessingError;
use serde::{
    Deserialize,
    Serialize,
};

/// Isotope offsets extracted for the precursor, relative to the
/// monoisotopic peak. The `-1` trace is only used to detect overlap
/// with a lighter co-eluting precursor.
pub const PRECURSOR_ISOTOPE_OFFSETS: [i8; 4] = [-1, 0, 1, 2];

/// Chromatogram of a single fragment ion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IonTrace {
    pub label: String,
    pub mz: f64,
    pub rank: u16,
    pub intensities: Vec<f32>,
    /// Intensity weighted observed m/z per sample, `0.0` where there is
    /// no signal.
    pub observed_mz: Vec<f64>,
}

impl IonTrace {
    pub fn has_signal(&self) -> bool {
        self.intensities.iter().any(|&x| x > 0.0)
    }
}

/// Fragment (and precursor isotope) chromatograms sharing one RT axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTrace {
    rt_axis: Vec<f32>,
    ions: Vec<IonTrace>,
    /// One trace per entry of [`PRECURSOR_ISOTOPE_OFFSETS`], or empty
    /// when no MS1 data was available.
    precursor: Vec<Vec<f32>>,
    /// Number of fragments requested, including those without signal.
    expected_fragments: usize,
}

impl ExtractedTrace {
    pub fn try_new(
        rt_axis: Vec<f32>,
        ions: Vec<IonTrace>,
        precursor: Vec<Vec<f32>>,
        expected_fragments: usize,
    ) -> Result<Self, DataProcessingError> {
        if let Some(index) = rt_axis.windows(2).position(|w| w[0] >= w[1]) {
            return Err(DataProcessingError::UnsortedRetentionAxis {
                index: index + 1,
                context: "extracted trace".to_string(),
            });
        }
        let n = rt_axis.len();
        for ion in ions.iter() {
            for other in [ion.intensities.len(), ion.observed_mz.len()] {
                if other != n {
                    return Err(DataProcessingError::ExpectedSlicesSameLength {
                        expected: n,
                        other,
                        context: format!("ion trace {}", ion.label),
                    });
                }
            }
        }
        if let Some(bad) = precursor.iter().find(|p| p.len() != n) {
            return Err(DataProcessingError::ExpectedSlicesSameLength {
                expected: n,
                other: bad.len(),
                context: "precursor isotope trace".to_string(),
            });
        }
        Ok(Self {
            rt_axis,
            ions,
            precursor,
            expected_fragments,
        })
    }

    pub fn rt_axis(&self) -> &[f32] {
        &self.rt_axis
    }

    pub fn ions(&self) -> &[IonTrace] {
        &self.ions
    }

    pub fn precursor(&self) -> &[Vec<f32>] {
        &self.precursor
    }

    /// Precursor trace at the given isotope offset, if extracted.
    pub fn precursor_isotope(&self, offset: i8) -> Option<&[f32]> {
        let idx = PRECURSOR_ISOTOPE_OFFSETS.iter().position(|&o| o == offset)?;
        self.precursor.get(idx).map(|x| x.as_slice())
    }

    pub fn expected_fragments(&self) -> usize {
        self.expected_fragments
    }

    pub fn num_ions(&self) -> usize {
        self.ions.len()
    }

    pub fn get(&self, label: &str) -> Option<&IonTrace> {
        self.ions.iter().find(|x| x.label == label)
    }

    /// Sum of all fragment intensities at every RT sample.
    pub fn summed(&self) -> Vec<f32> {
        let mut out = vec![0.0f32; self.rt_axis.len()];
        for ion in self.ions.iter() {
            for (o, i) in out.iter_mut().zip(ion.intensities.iter()) {
                *o += i;
            }
        }
        out
    }

    /// Sub-trace holding only `labels`, in that order.
    ///
    /// `None` if any of the labels has no chromatogram in this trace.
    pub fn select(&self, labels: &[&str]) -> Option<ExtractedTrace> {
        let ions = labels
            .iter()
            .map(|l| self.get(l).cloned())
            .collect::<Option<Vec<_>>>()?;
        Some(ExtractedTrace {
            rt_axis: self.rt_axis.clone(),
            ions,
            precursor: self.precursor.clone(),
            expected_fragments: labels.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ion(label: &str, intensities: Vec<f32>) -> IonTrace {
        let n = intensities.len();
        IonTrace {
            label: label.to_string(),
            mz: 100.0,
            rank: 1,
            intensities,
            observed_mz: vec![0.0; n],
        }
    }

    #[test]
    fn test_length_invariant() {
        let ok = ExtractedTrace::try_new(
            vec![1.0, 2.0, 3.0],
            vec![ion("y3", vec![0.0, 1.0, 0.0])],
            vec![],
            1,
        );
        assert!(ok.is_ok());

        let bad = ExtractedTrace::try_new(
            vec![1.0, 2.0, 3.0],
            vec![ion("y3", vec![0.0, 1.0])],
            vec![],
            1,
        );
        assert!(bad.is_err());

        let unsorted = ExtractedTrace::try_new(vec![1.0, 2.0, 2.0], vec![], vec![], 0);
        assert!(matches!(
            unsorted,
            Err(DataProcessingError::UnsortedRetentionAxis { index: 2, .. })
        ));
    }

    #[test]
    fn test_select_and_sum() {
        let trace = ExtractedTrace::try_new(
            vec![1.0, 2.0],
            vec![ion("y3", vec![1.0, 2.0]), ion("y4", vec![3.0, 4.0])],
            vec![],
            2,
        )
        .unwrap();
        assert_eq!(trace.summed(), vec![4.0, 6.0]);
        let sub = trace.select(&["y4"]).unwrap();
        assert_eq!(sub.num_ions(), 1);
        assert_eq!(sub.expected_fragments(), 1);
        assert!(trace.select(&["y4", "b2"]).is_none());
    }
}
