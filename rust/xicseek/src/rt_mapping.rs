use crate::models::PeptideCoordinate;
use serde::{
    Deserialize,
    Serialize,
};

/// Linear relation `lib_rt = slope * run_rt + intercept` between library
/// and run retention times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeIntercept {
    pub slope: f32,
    pub intercept: f32,
}

impl SlopeIntercept {
    pub fn to_run_rt(&self, lib_rt: f32) -> f32 {
        (lib_rt - self.intercept) / self.slope
    }

    /// Moves the predicted RT and window of a coordinate onto the run
    /// time scale.
    ///
    /// A zero or non-finite slope leaves the coordinate untouched.
    pub fn map_coordinate(&self, mut coord: PeptideCoordinate) -> PeptideCoordinate {
        if self.slope == 0.0 || !self.slope.is_finite() {
            return coord;
        }
        coord.rt = self.to_run_rt(coord.rt);
        let a = self.to_run_rt(coord.rt_start);
        let b = self.to_run_rt(coord.rt_end);
        coord.rt_start = a.min(b);
        coord.rt_end = a.max(b);
        coord
    }
}
