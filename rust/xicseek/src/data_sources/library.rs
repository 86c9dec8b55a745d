use crate::errors::LibraryReadingError;
use crate::models::PeptideCoordinate;
use std::io::{
    BufRead,
    BufReader,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryFormat {
    /// A single JSON array of coordinates.
    JsonArray,
    /// One coordinate object per line.
    NdJson,
}

impl LibraryFormat {
    pub fn detect_from_path(path: &Path) -> Result<Self, LibraryReadingError> {
        let path_str = path.to_string_lossy().to_lowercase();
        if path_str.ends_with(".ndjson") || path_str.ends_with(".jsonl") {
            Ok(LibraryFormat::NdJson)
        } else {
            Self::detect_from_content(path)
        }
    }

    fn detect_from_content(path: &Path) -> Result<Self, LibraryReadingError> {
        let file =
            std::fs::File::open(path).map_err(|e| LibraryReadingError::FileReadingError {
                source: e,
                context: "Error opening file for format detection",
                path: PathBuf::from(path),
            })?;
        let mut reader = BufReader::new(file);
        let mut buffer = [0u8; 64];
        let first = match reader.read(&mut buffer) {
            Ok(n) => buffer[..n].iter().copied().find(|b| !b.is_ascii_whitespace()),
            Err(_) => None,
        };
        match first {
            Some(b'[') => Ok(LibraryFormat::JsonArray),
            _ => Ok(LibraryFormat::NdJson),
        }
    }
}

/// Peptide coordinates to extract and score.
#[derive(Debug, Clone, Default)]
pub struct CoordinateLibrary {
    elems: Vec<PeptideCoordinate>,
}

impl CoordinateLibrary {
    pub fn new(elems: Vec<PeptideCoordinate>) -> Self {
        Self { elems }
    }

    pub fn from_file(path: &Path) -> Result<Self, LibraryReadingError> {
        let format = LibraryFormat::detect_from_path(path)?;
        let file =
            std::fs::File::open(path).map_err(|e| LibraryReadingError::FileReadingError {
                source: e,
                context: "Error opening coordinate library",
                path: PathBuf::from(path),
            })?;
        let out = Self::from_reader(BufReader::new(file), format)?;
        info!(
            "Read {} coordinates from {} ({:?})",
            out.len(),
            path.display(),
            format
        );
        Ok(out)
    }

    pub fn from_reader(
        reader: impl BufRead,
        format: LibraryFormat,
    ) -> Result<Self, LibraryReadingError> {
        let elems = match format {
            LibraryFormat::JsonArray => serde_json::from_reader(reader).map_err(|e| {
                LibraryReadingError::ParsingError {
                    source: e,
                    context: "Error parsing JSON coordinate array",
                }
            })?,
            LibraryFormat::NdJson => {
                let mut elems = Vec::new();
                for line in reader.lines() {
                    let line = line.map_err(|e| LibraryReadingError::ParsingError {
                        source: serde_json::Error::io(e),
                        context: "Error reading NDJSON line",
                    })?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let elem = serde_json::from_str(&line).map_err(|e| {
                        LibraryReadingError::ParsingError {
                            source: e,
                            context: "Error parsing line in NDJSON",
                        }
                    })?;
                    elems.push(elem);
                }
                elems
            }
        };
        Ok(Self { elems })
    }

    pub fn as_slice(&self) -> &[PeptideCoordinate] {
        &self.elems
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn into_inner(self) -> Vec<PeptideCoordinate> {
        self.elems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_both_formats() {
        let coord = PeptideCoordinate::sample();
        let array = serde_json::to_string(&vec![coord.clone(), coord.clone()]).unwrap();
        let lib = CoordinateLibrary::from_reader(array.as_bytes(), LibraryFormat::JsonArray)
            .unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.as_slice()[0], coord);

        let line = serde_json::to_string(&coord).unwrap();
        let ndjson = format!("{}\n\n{}\n", line, line);
        let lib = CoordinateLibrary::from_reader(ndjson.as_bytes(), LibraryFormat::NdJson)
            .unwrap();
        assert_eq!(lib.len(), 2);

        let err = CoordinateLibrary::from_reader("{not json".as_bytes(), LibraryFormat::NdJson);
        assert!(matches!(err, Err(LibraryReadingError::ParsingError { .. })));
    }
}
