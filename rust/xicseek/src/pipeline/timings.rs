//! Stage timings, summed over all units of a batch.

use serde::Serialize;
use std::time::Duration;

/// Accumulated time per pipeline stage.
///
/// Phase 1 stages are summed across threads, so they can exceed the
/// wall time of the batch.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PipelineTimings {
    /// Building traces from the spectral maps.
    pub extraction: Duration,
    /// Peak picking and sub-scores of the direct hypothesis.
    pub scoring: Duration,
    /// Deletion or substitution searches.
    pub search: Duration,
    /// Phase 2, classifier training and FDR.
    pub calibration: Duration,
}

impl Serialize for PipelineTimings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PipelineTimings", 4)?;
        state.serialize_field("extraction_ms", &self.extraction.as_millis())?;
        state.serialize_field("scoring_ms", &self.scoring.as_millis())?;
        state.serialize_field("search_ms", &self.search.as_millis())?;
        state.serialize_field("calibration_ms", &self.calibration.as_millis())?;
        state.end()
    }
}

impl std::ops::AddAssign for PipelineTimings {
    fn add_assign(&mut self, rhs: Self) {
        self.extraction += rhs.extraction;
        self.scoring += rhs.scoring;
        self.search += rhs.search;
        self.calibration += rhs.calibration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_serialize() {
        let mut a = PipelineTimings {
            extraction: Duration::from_millis(5),
            ..Default::default()
        };
        a += PipelineTimings {
            extraction: Duration::from_millis(7),
            search: Duration::from_millis(3),
            ..Default::default()
        };
        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["extraction_ms"], 12);
        assert_eq!(json["search_ms"], 3);
        assert_eq!(json["calibration_ms"], 0);
    }
}
