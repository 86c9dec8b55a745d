mod coordinate;
mod decoy;
mod fragment;
mod peak_group;
mod result;
mod score_types;
mod spectra;
mod summary;
mod trace;

pub use coordinate::PeptideCoordinate;
pub use decoy::DecoyMarking;
pub(crate) use decoy::residue_tokens;
pub use fragment::{
    FragmentDescriptor,
    IonLabel,
    IonParsingError,
    IonSeries,
};
pub use peak_group::{
    CandidatePeakGroup,
    best_peak_group,
};
pub use result::{
    IdentifyStatus,
    ScoredPeptideResult,
};
pub use score_types::{
    ClassifierWeights,
    ScoreType,
    SubScores,
};
pub use spectra::{
    IsolationWindow,
    SpectralData,
    Spectrum,
    SpectrumMap,
};
pub use summary::PeptideSummary;
pub use trace::{
    ExtractedTrace,
    IonTrace,
    PRECURSOR_ISOTOPE_OFFSETS,
};

#[cfg(test)]
pub(crate) use peak_group::sample_group;
