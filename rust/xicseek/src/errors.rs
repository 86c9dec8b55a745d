use forust_ml::errors::ForustError;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DataProcessingError {
    ExpectedSlicesSameLength {
        expected: usize,
        other: usize,
        context: String,
    },
    ExpectedFiniteNonNanData {
        context: String,
    },
    /// Two spectra of one map share a retention time.
    DuplicatedRetentionTime {
        rt: f32,
        context: String,
    },
    /// The RT axis decreases or repeats at `index`.
    UnsortedRetentionAxis {
        index: usize,
        context: String,
    },
}

impl DataProcessingError {
    pub fn append_to_context(mut self, context: &str) -> Self {
        match &mut self {
            DataProcessingError::ExpectedSlicesSameLength {
                context: owned_context,
                ..
            }
            | DataProcessingError::ExpectedFiniteNonNanData {
                context: owned_context,
            }
            | DataProcessingError::DuplicatedRetentionTime {
                context: owned_context,
                ..
            }
            | DataProcessingError::UnsortedRetentionAxis {
                context: owned_context,
                ..
            } => {
                owned_context.push_str(context);
            }
        }
        self
    }
}

impl std::fmt::Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Failures of the global calibration phase.
///
/// These are the only errors allowed to fail a whole run, since a
/// classifier trained on a degenerate population has no partial outcome.
#[derive(Debug)]
pub enum CalibrationError {
    AllTargets {
        n: usize,
    },
    AllDecoys {
        n: usize,
    },
    SingularScatterMatrix {
        n_features: usize,
    },
    NoScoreTypes,
    /// Fewer training examples than cross-validation folds.
    EmptyFold {
        fold: u8,
    },
    Booster(ForustError),
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A peptide sequence that cannot be fragmented or turned into a decoy.
#[derive(Debug)]
pub enum PeptideError {
    ParsingError {
        sequence: String,
        error: String,
    },
    UnbalancedModification {
        sequence: String,
    },
    NoFragments {
        sequence: String,
    },
}

impl std::fmt::Display for PeptideError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug)]
pub enum LibraryReadingError {
    ParsingError {
        source: serde_json::Error,
        context: &'static str,
    },
    FileReadingError {
        source: std::io::Error,
        context: &'static str,
        path: PathBuf,
    },
}

#[derive(Debug)]
pub enum XicSeekError {
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
    ParseError {
        msg: String,
    },
    DataProcessingError(DataProcessingError),
    CalibrationError(CalibrationError),
    LibraryReadingError(LibraryReadingError),
    PeptideError(PeptideError),
}

impl std::fmt::Display for XicSeekError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for XicSeekError {}

pub type Result<T> = std::result::Result<T, XicSeekError>;

impl From<serde_json::Error> for XicSeekError {
    fn from(val: serde_json::Error) -> Self {
        XicSeekError::ParseError {
            msg: val.to_string(),
        }
    }
}

impl From<DataProcessingError> for XicSeekError {
    fn from(x: DataProcessingError) -> Self {
        Self::DataProcessingError(x)
    }
}

impl From<CalibrationError> for XicSeekError {
    fn from(x: CalibrationError) -> Self {
        Self::CalibrationError(x)
    }
}

impl From<ForustError> for CalibrationError {
    fn from(x: ForustError) -> Self {
        Self::Booster(x)
    }
}

impl From<ForustError> for XicSeekError {
    fn from(x: ForustError) -> Self {
        Self::CalibrationError(CalibrationError::Booster(x))
    }
}

impl From<LibraryReadingError> for XicSeekError {
    fn from(x: LibraryReadingError) -> Self {
        Self::LibraryReadingError(x)
    }
}

impl From<PeptideError> for XicSeekError {
    fn from(x: PeptideError) -> Self {
        Self::PeptideError(x)
    }
}
