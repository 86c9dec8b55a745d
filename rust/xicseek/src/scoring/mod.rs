//! Peak group detection and sub-score calculation on extracted traces.

mod features;
mod peak_picking;
mod scorer;

pub use peak_picking::{
    PeakBoundary,
    gaussblur_in_place,
    pick_peaks,
};
pub use scorer::{
    has_insufficient_fragments,
    score,
};
