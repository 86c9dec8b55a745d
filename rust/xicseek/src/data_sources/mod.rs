mod library;
mod spectra;

pub use library::{
    CoordinateLibrary,
    LibraryFormat,
};
pub use spectra::read_spectral_data;
