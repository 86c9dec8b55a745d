use serde::{
    Deserialize,
    Serialize,
};
use std::path::PathBuf;
use xicseek::{
    AnalysisConfig,
    ClassifierWeights,
    RunContext,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Weights and threshold of a previous run, used by `reselect`.
    #[serde(default)]
    pub context: Option<ContextConfig>,
    pub output: Option<OutputConfig>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    2048
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum InputConfig {
    #[serde(rename = "json")]
    Json { spectra: PathBuf, library: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContextConfig {
    pub weights: ClassifierWeights,
    pub min_total_score: f64,
}

impl From<ContextConfig> for RunContext {
    fn from(value: ContextConfig) -> Self {
        RunContext::new(value.weights, value.min_total_score)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}
