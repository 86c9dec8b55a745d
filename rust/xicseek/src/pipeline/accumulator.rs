//! Merges the owned outcomes of parallel scoring units.
//!
//! Each thread folds outcomes into a local accumulator, the local
//! accumulators are then reduced pairwise. Units never share mutable
//! state.

use super::timings::PipelineTimings;
use super::{
    BatchCounts,
    UnitOutcome,
};
use crate::models::ScoredPeptideResult;
use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};

#[derive(Default)]
pub(super) struct BatchAccumulator {
    pub(super) res: Vec<ScoredPeptideResult>,
    pub(super) counts: BatchCounts,
    pub(super) timings: PipelineTimings,
}

impl BatchAccumulator {
    pub(super) fn reduce(mut self, other: Self) -> Self {
        self.res.extend(other.res);
        self.counts += other.counts;
        self.timings += other.timings;
        self
    }

    pub(super) fn fold(mut self, item: UnitOutcome) -> Self {
        self.res.extend(item.results);
        self.counts += item.counts;
        self.timings += item.timings;
        self
    }
}

impl FromIterator<UnitOutcome> for BatchAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = UnitOutcome>,
    {
        iter.into_iter()
            .fold(BatchAccumulator::default(), BatchAccumulator::fold)
    }
}

impl FromParallelIterator<UnitOutcome> for BatchAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = UnitOutcome>,
    {
        par_iter
            .into_par_iter()
            .fold(BatchAccumulator::default, BatchAccumulator::fold)
            .reduce(BatchAccumulator::default, BatchAccumulator::reduce)
    }
}
