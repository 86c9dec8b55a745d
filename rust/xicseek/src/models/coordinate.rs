use super::decoy::{
    DecoyMarking,
    as_decoy_string,
};
use super::fragment::FragmentDescriptor;
use crate::errors::PeptideError;
use crate::fragment_mass::refragment;
use serde::{
    Deserialize,
    Serialize,
};

/// Library entry describing where and what to extract for one peptide
/// precursor.
///
/// `rt` is the predicted retention time on the run scale and
/// `rt_start..=rt_end` the window extracted around it (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideCoordinate {
    pub peptide_ref: String,
    pub sequence: String,
    pub precursor_mz: f64,
    pub charge: u8,
    pub rt: f32,
    pub rt_start: f32,
    pub rt_end: f32,
    pub fragments: Vec<FragmentDescriptor>,
    #[serde(default)]
    pub decoy_fragments: Vec<FragmentDescriptor>,
    #[serde(default)]
    pub decoy: bool,
}

impl PeptideCoordinate {
    pub fn marking(&self) -> DecoyMarking {
        DecoyMarking::from(self.decoy)
    }

    /// The paired decoy of this coordinate.
    ///
    /// Uses the library decoy fragments when present, otherwise the
    /// target fragment labels are recomputed on the pseudo-reversed
    /// sequence.
    pub fn as_decoy(&self) -> Result<PeptideCoordinate, PeptideError> {
        let decoy_sequence = as_decoy_string(&self.sequence)?;
        let fragments = if self.decoy_fragments.is_empty() {
            refragment(&decoy_sequence, &self.fragments)?
        } else {
            self.decoy_fragments.clone()
        };
        Ok(PeptideCoordinate {
            sequence: decoy_sequence,
            fragments,
            decoy_fragments: Vec::new(),
            decoy: true,
            ..self.clone()
        })
    }

    /// Same coordinate, different fragment hypothesis.
    pub fn with_fragments(&self, fragments: Vec<FragmentDescriptor>) -> PeptideCoordinate {
        PeptideCoordinate {
            fragments,
            ..self.clone()
        }
    }

    /// Keeps only the first `max_ions` target and decoy fragments.
    pub fn capped(mut self, max_ions: usize) -> PeptideCoordinate {
        self.fragments.truncate(max_ions);
        self.decoy_fragments.truncate(max_ions);
        self
    }

    /// Fragments sorted by library rank, strongest first.
    pub fn fragments_by_rank(&self) -> Vec<FragmentDescriptor> {
        let mut out = self.fragments.clone();
        out.sort_by_key(|f| f.rank);
        out
    }

    pub fn sample() -> Self {
        PeptideCoordinate {
            peptide_ref: "PEPTIDEK_2".into(),
            sequence: "PEPTIDEK".into(),
            precursor_mz: 464.7384,
            charge: 2,
            rt: 30.0,
            rt_start: 20.0,
            rt_end: 40.0,
            fragments: vec![
                FragmentDescriptor::new("y3", 376.2089, 1, 1),
                FragmentDescriptor::new("y4", 477.2566, 2, 1),
                FragmentDescriptor::new("y5", 574.3093, 3, 1),
                FragmentDescriptor::new("y6", 703.3519, 4, 1),
                FragmentDescriptor::new("b3", 324.1554, 5, 1),
                FragmentDescriptor::new("b4", 425.2031, 6, 1),
            ],
            decoy_fragments: Vec::new(),
            decoy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoy_from_sequence() {
        let coord = PeptideCoordinate::sample();
        let decoy = coord.as_decoy().unwrap();
        assert!(decoy.decoy);
        assert_eq!(decoy.sequence, "PEDITPEK");
        assert_eq!(decoy.fragments.len(), coord.fragments.len());
        // Labels are kept, masses move.
        assert_eq!(decoy.fragments[0].label, "y3");
        assert!((decoy.fragments[0].mz - coord.fragments[0].mz).abs() > 1e-3);
    }

    #[test]
    fn test_decoy_from_library() {
        let mut coord = PeptideCoordinate::sample();
        coord.decoy_fragments = vec![FragmentDescriptor::new("y3", 400.0, 1, 1)];
        let decoy = coord.as_decoy().unwrap();
        assert_eq!(decoy.fragments, coord.decoy_fragments);
        assert!(decoy.decoy_fragments.is_empty());
    }

    #[test]
    fn test_decoy_of_modified_sequence() {
        let mut coord = PeptideCoordinate::sample();
        coord.sequence = "PEPTC[+57.0215]DEK".into();
        coord.fragments = vec![
            FragmentDescriptor::new("y3", 0.0, 1, 1),
            FragmentDescriptor::new("y5", 0.0, 2, 1),
            FragmentDescriptor::new("b4", 0.0, 3, 1),
        ];
        let decoy = coord.as_decoy().unwrap();
        assert_eq!(decoy.sequence, "PEDC[+57.0215]TPEK");
        assert_eq!(decoy.fragments.len(), 3);
        // b4 of the decoy covers the modified cysteine.
        let b4 = decoy.fragments.iter().find(|f| f.label == "b4").unwrap();
        assert!(b4.mz > 500.0);
    }

    #[test]
    fn test_decoy_failure_is_reported() {
        let mut coord = PeptideCoordinate::sample();
        coord.sequence = "PEPTC[+57.0215DEK".into();
        assert!(matches!(
            coord.as_decoy(),
            Err(PeptideError::UnbalancedModification { .. })
        ));

        let mut coord = PeptideCoordinate::sample();
        coord.fragments = vec![FragmentDescriptor::new("y9", 0.0, 1, 1)];
        assert!(matches!(coord.as_decoy(), Err(PeptideError::NoFragments { .. })));
    }

    #[test]
    fn test_capped() {
        let mut coord = PeptideCoordinate::sample();
        coord.decoy_fragments = coord.fragments.clone();
        let capped = coord.capped(4);
        assert_eq!(capped.fragments.len(), 4);
        assert_eq!(capped.decoy_fragments.len(), 4);
    }
}
