use crate::errors::LibraryReadingError;
use crate::models::SpectralData;
use std::io::BufReader;
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;

/// Reads a JSON rendering of [`SpectralData`].
///
/// Spectra are validated and sorted while deserializing.
pub fn read_spectral_data(path: &Path) -> Result<SpectralData, LibraryReadingError> {
    let file = std::fs::File::open(path).map_err(|e| LibraryReadingError::FileReadingError {
        source: e,
        context: "Error opening spectral data",
        path: PathBuf::from(path),
    })?;
    let data: SpectralData = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        LibraryReadingError::ParsingError {
            source: e,
            context: "Error parsing spectral data",
        }
    })?;
    info!(
        "Read {} MS1 spectra and {} isolation windows from {}",
        data.ms1.len(),
        data.ms2_windows.len(),
        path.display()
    );
    Ok(data)
}
