//! Monoisotopic b/y fragment masses of ProForma sequences.
//!
//! Used to enumerate substitution candidates and to build decoy
//! fragment lists when the library does not ship them. Modified
//! residues carry their mass shift into every fragment covering them.

use crate::errors::PeptideError;
use crate::models::{
    FragmentDescriptor,
    IonLabel,
    IonSeries,
    residue_tokens,
};
use rustyms::fragment::FragmentType;
use rustyms::model::Location;
use rustyms::spectrum::MassMode;
use rustyms::system::f64::MassOverCharge;
use rustyms::system::mass_over_charge::mz;
use rustyms::system::{
    Charge,
    e,
};
use rustyms::{
    ComplexPeptide,
    LinearPeptide,
    Model,
};
use std::collections::HashMap;

pub const MASS_PROTON: f64 = 1.007276466621;

fn parse_peptide(sequence: &str) -> Result<LinearPeptide, PeptideError> {
    let peptide =
        ComplexPeptide::pro_forma(sequence).map_err(|err| PeptideError::ParsingError {
            sequence: sequence.to_string(),
            error: format!("{:?}", err),
        })?;
    peptide.singular().ok_or_else(|| PeptideError::ParsingError {
        sequence: sequence.to_string(),
        error: "Peptide is not linear.".to_string(),
    })
}

#[derive(Debug)]
pub struct FragmentMassBuilder {
    pub model: Model,
    pub max_charge: Charge,
    /// Shortest b/y ion kept, in residues.
    pub min_length: usize,
}

impl FragmentMassBuilder {
    pub fn new(max_charge: u8, min_length: usize) -> Self {
        let by_ions = Model {
            a: (Location::None, Vec::new()),
            b: (Location::All, Vec::new()),
            c: (Location::None, Vec::new()),
            d: (Location::None, Vec::new()),
            v: (Location::None, Vec::new()),
            w: (Location::None, Vec::new()),
            x: (Location::None, Vec::new()),
            y: (Location::All, Vec::new()),
            z: (Location::None, Vec::new()),
            precursor: vec![],
            ppm: MassOverCharge::new::<mz>(20.0),
            glycan_fragmentation: None,
        };
        Self {
            model: by_ions,
            max_charge: Charge::new::<e>(max_charge.max(1) as f64),
            min_length: min_length.max(1),
        }
    }

    /// Every b and y ion shorter than the peptide, sorted by label.
    pub fn fragment_mzs(&self, sequence: &str) -> Result<Vec<(IonLabel, f64)>, PeptideError> {
        let (_, residues, _) = residue_tokens(sequence)?;
        let peptide = parse_peptide(sequence)?;
        let mut out: Vec<(IonLabel, f64)> = peptide
            .generate_theoretical_fragments(self.max_charge, &self.model)
            .into_iter()
            .filter_map(|frag| {
                let (series, ordinal) = match &frag.ion {
                    FragmentType::b(pos) => (IonSeries::B, pos.series_number),
                    FragmentType::y(pos) => (IonSeries::Y, pos.series_number),
                    _ => return None,
                };
                if ordinal < self.min_length || ordinal >= residues.len() {
                    return None;
                }
                let charge = frag.charge.value.round() as u8;
                let label = IonLabel::new(series, u8::try_from(ordinal).ok()?, charge);
                Some((label, frag.mz(MassMode::Monoisotopic).value))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out.dedup_by(|a, b| a.0 == b.0);
        Ok(out)
    }
}

/// Every b and y ion of at least `min_length` residues, for charges
/// `1..=max_charge`.
///
/// Generated fragments carry no library rank, so they are assigned
/// ranks after the library ones in generation order.
pub fn generate_by_ions(
    sequence: &str,
    max_charge: u8,
    min_length: usize,
    first_rank: u16,
) -> Result<Vec<FragmentDescriptor>, PeptideError> {
    let builder = FragmentMassBuilder::new(max_charge, min_length);
    let out = builder
        .fragment_mzs(sequence)?
        .into_iter()
        .zip(first_rank..)
        .map(|((label, frag_mz), rank)| {
            FragmentDescriptor::new(label.to_string(), frag_mz, rank, label.charge)
        })
        .collect();
    Ok(out)
}

/// Re-computes the m/z of each fragment against a different sequence,
/// keeping labels and ranks.
///
/// Fragments whose label cannot be parsed or does not fit the sequence
/// are dropped. Fails when none is left.
pub fn refragment(
    sequence: &str,
    fragments: &[FragmentDescriptor],
) -> Result<Vec<FragmentDescriptor>, PeptideError> {
    let labels: Vec<(&FragmentDescriptor, IonLabel)> = fragments
        .iter()
        .filter_map(|f| f.ion_label().ok().map(|label| (f, label)))
        .collect();
    let max_charge = labels.iter().map(|(_, l)| l.charge).max().unwrap_or(1);
    let masses: HashMap<IonLabel, f64> = FragmentMassBuilder::new(max_charge, 1)
        .fragment_mzs(sequence)?
        .into_iter()
        .collect();
    let out: Vec<FragmentDescriptor> = labels
        .into_iter()
        .filter_map(|(f, label)| {
            let frag_mz = masses.get(&label)?;
            Some(FragmentDescriptor::new(f.label.clone(), *frag_mz, f.rank, f.charge))
        })
        .collect();
    if out.is_empty() {
        return Err(PeptideError::NoFragments {
            sequence: sequence.to_string(),
        });
    }
    Ok(out)
}
