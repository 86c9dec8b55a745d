use xicseek::errors::{
    CalibrationError,
    LibraryReadingError,
};

#[derive(Debug)]
pub enum CliError {
    Config {
        source: String,
    },
    ParseError {
        msg: String,
    },
    Io {
        source: String,
        path: Option<String>,
    },
    DataReading {
        source: String,
    },
    Calibration {
        source: String,
    },
    Output {
        source: String,
    },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config { source } => write!(f, "Error interpreting the config: {}", source),
            CliError::ParseError { msg } => write!(f, "Error parsing config: {}", msg),
            CliError::Io { source, path } => {
                if let Some(path) = path {
                    write!(f, "Error reading file {}: {}", path, source)
                } else {
                    write!(f, "Error reading file: {}", source)
                }
            }
            CliError::DataReading { source } => write!(f, "Error reading data: {}", source),
            CliError::Calibration { source } => write!(f, "Calibration failed: {}", source),
            CliError::Output { source } => write!(f, "Error writing results: {}", source),
        }
    }
}

impl From<LibraryReadingError> for CliError {
    fn from(e: LibraryReadingError) -> Self {
        CliError::DataReading {
            source: format!("{:?}", e),
        }
    }
}

impl From<CalibrationError> for CliError {
    fn from(e: CalibrationError) -> Self {
        CliError::Calibration {
            source: e.to_string(),
        }
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Output {
            source: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output {
            source: e.to_string(),
        }
    }
}
