pub mod config;
pub mod data_sources;
pub mod errors;
pub mod extraction;
pub mod fdr;
pub mod fragment_mass;
pub mod isotopes;
pub mod ml;
pub mod models;
pub mod pipeline;
pub mod rt_mapping;
pub mod scoring;
pub mod search;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{
    AnalysisConfig,
    BatchPolicy,
    RunContext,
};
pub use data_sources::CoordinateLibrary;
pub use models::{
    ClassifierWeights,
    ExtractedTrace,
    IdentifyStatus,
    PeptideCoordinate,
    PeptideSummary,
    ScoredPeptideResult,
    SpectralData,
};
pub use pipeline::{
    BatchOutput,
    Pipeline,
};
