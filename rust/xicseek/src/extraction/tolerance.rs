use crate::models::PeptideCoordinate;
use serde::{
    Deserialize,
    Serialize,
};

/// Convention: ranges are given as positive values, so `(1, 1)` on a
/// value of 10 means `(9, 11)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MzTolerance {
    #[serde(rename = "da")]
    Absolute((f64, f64)),
    #[serde(rename = "ppm")]
    Ppm((f64, f64)),
}

impl Default for MzTolerance {
    fn default() -> Self {
        MzTolerance::Ppm((20.0, 20.0))
    }
}

impl MzTolerance {
    /// # Example
    ///
    /// ```
    /// use xicseek::extraction::MzTolerance;
    ///
    /// let (low, high) = MzTolerance::Ppm((20.0, 20.0)).mz_range(500.0);
    /// assert!((low - 499.99).abs() < 1e-9);
    /// assert!((high - 500.01).abs() < 1e-9);
    /// ```
    pub fn mz_range(&self, mz: f64) -> (f64, f64) {
        match self {
            MzTolerance::Absolute((low, high)) => (mz - low, mz + high),
            MzTolerance::Ppm((low, high)) => {
                let low = mz * low / 1e6;
                let high = mz * high / 1e6;
                (mz - low, mz + high)
            }
        }
    }

    /// Signed error in ppm of an observed m/z.
    pub fn ppm_error(theoretical: f64, observed: f64) -> f64 {
        (observed - theoretical) / theoretical * 1e6
    }
}

/// Which retention times to extract for a coordinate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum RtTolerance {
    /// The `rt_start..=rt_end` window carried by the coordinate.
    #[default]
    #[serde(rename = "coordinate")]
    Coordinate,
    /// Fixed window around the predicted RT.
    #[serde(rename = "seconds")]
    Seconds((f32, f32)),
    #[serde(rename = "unrestricted")]
    Unrestricted,
}

impl RtTolerance {
    pub fn rt_range(&self, coord: &PeptideCoordinate) -> (f32, f32) {
        match self {
            RtTolerance::Coordinate => (coord.rt_start, coord.rt_end),
            RtTolerance::Seconds((low, high)) => (coord.rt - low, coord.rt + high),
            RtTolerance::Unrestricted => (f32::NEG_INFINITY, f32::INFINITY),
        }
    }
}
