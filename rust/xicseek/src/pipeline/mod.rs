//! Batch orchestration.
//!
//! Phase 1 maps every coordinate to an owned [`UnitOutcome`] in
//! parallel: the target, then its decoy, extracted and scored under the
//! configured [`BatchPolicy`]. Units whose decoy cannot be built are
//! dropped whole. Phase 2 runs once Phase 1 has drained,
//! as one sequential calibration pass over the sorted results.
//!
//! | policy | weights | search fallback | decoy scored |
//! |---|---|---|---|
//! | `Standard` | configured | no | when the target has peak groups |
//! | `Reselect` | prior run context | target only | when the target has peak groups |
//! | `CappedIon` | configured | no | always, on capped fragment lists |

mod accumulator;
mod timings;

pub use timings::PipelineTimings;

use crate::config::{
    AnalysisConfig,
    BatchPolicy,
    RunContext,
    SearchMode,
};
use crate::errors::{
    CalibrationError,
    DataProcessingError,
};
use crate::extraction::extract;
use crate::ml::{
    CalibrationOutcome,
    semi_supervised_calibration,
};
use crate::models::{
    ClassifierWeights,
    IdentifyStatus,
    PeptideCoordinate,
    ScoredPeptideResult,
    SpectralData,
    SpectrumMap,
};
use crate::scoring::{
    has_insufficient_fragments,
    score,
};
use crate::search::run_search;
use accumulator::BatchAccumulator;
#[cfg(not(feature = "serial_scoring"))]
use rayon::prelude::*;
use serde::Serialize;
use std::time::Instant;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    /// Coordinates outside every isolation window.
    pub skipped: usize,
    /// Units dropped on a processing error.
    pub faulted: usize,
    /// Targets without any fragment signal.
    pub empty: usize,
    /// Targets replaced by a search hypothesis under `Reselect`.
    pub reselected: usize,
    /// Units dropped because their decoy could not be built.
    pub decoy_failed: usize,
}

impl std::ops::AddAssign for BatchCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.skipped += rhs.skipped;
        self.faulted += rhs.faulted;
        self.empty += rhs.empty;
        self.reselected += rhs.reselected;
        self.decoy_failed += rhs.decoy_failed;
    }
}

/// Owned outcome of one coordinate: zero, one or two results.
#[derive(Debug, Default)]
pub(crate) struct UnitOutcome {
    pub(crate) results: Vec<ScoredPeptideResult>,
    pub(crate) counts: BatchCounts,
    pub(crate) timings: PipelineTimings,
}

#[derive(Debug, Default)]
pub struct BatchOutput {
    pub results: Vec<ScoredPeptideResult>,
    pub counts: BatchCounts,
    pub timings: PipelineTimings,
}

impl BatchOutput {
    pub fn merge(&mut self, other: BatchOutput) {
        self.results.extend(other.results);
        self.counts += other.counts;
        self.timings += other.timings;
    }
}

impl From<BatchAccumulator> for BatchOutput {
    fn from(acc: BatchAccumulator) -> Self {
        Self {
            results: acc.res,
            counts: acc.counts,
            timings: acc.timings,
        }
    }
}

/// Scores coordinates against one run.
///
/// Spectra, configuration and weights are shared read-only by every
/// unit.
pub struct Pipeline<'a> {
    data: &'a SpectralData,
    config: &'a AnalysisConfig,
    context: RunContext,
}

impl<'a> Pipeline<'a> {
    pub fn new(data: &'a SpectralData, config: &'a AnalysisConfig) -> Self {
        Self {
            data,
            config,
            context: RunContext::from_config(config),
        }
    }

    /// Replaces the prior weights and threshold used by `Reselect` and
    /// [`Pipeline::predict_one`].
    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    fn ms1(&self) -> Option<&SpectrumMap> {
        if self.config.extraction.extract_precursor && !self.data.ms1.is_empty() {
            Some(&self.data.ms1)
        } else {
            None
        }
    }

    fn prepare(&self, coord: &PeptideCoordinate) -> PeptideCoordinate {
        let coord = match self.config.batch.rt_mapping {
            Some(mapping) => mapping.map_coordinate(coord.clone()),
            None => coord.clone(),
        };
        match self.config.batch.policy {
            BatchPolicy::CappedIon => coord.capped(self.config.batch.max_ions),
            BatchPolicy::Standard | BatchPolicy::Reselect => coord,
        }
    }

    /// Extracts and scores one fragment hypothesis.
    fn score_hypothesis(
        &self,
        coord: &PeptideCoordinate,
        ms2: &SpectrumMap,
        weights: &ClassifierWeights,
        timings: &mut PipelineTimings,
    ) -> Result<Option<ScoredPeptideResult>, DataProcessingError> {
        let st = Instant::now();
        let trace = extract(coord, self.ms1(), ms2, &self.config.extraction)?;
        timings.extraction += st.elapsed();
        let Some(trace) = trace else {
            return Ok(None);
        };

        let st = Instant::now();
        let mut result = score(trace, coord, &self.config.scoring);
        result.apply_weights(weights);
        timings.scoring += st.elapsed();
        Ok(Some(result))
    }

    /// Runs the configured search for a target that failed the context
    /// threshold. Returns the replacing hypothesis, if any.
    fn search_fallback(
        &self,
        target: &PeptideCoordinate,
        ms2: &SpectrumMap,
        direct: &ScoredPeptideResult,
        timings: &mut PipelineTimings,
    ) -> Result<Option<ScoredPeptideResult>, DataProcessingError> {
        if self.config.search.mode == SearchMode::Off {
            return Ok(None);
        }
        let direct_score = direct.best_total_score();
        let st = Instant::now();
        let hit = run_search(
            target,
            self.ms1(),
            ms2,
            self.config,
            &self.context.weights,
            direct_score,
        )?;
        timings.search += st.elapsed();
        Ok(hit.map(|hit| {
            debug!(
                "{:?} search replaced {} ({:?} -> {:?})",
                self.config.search.mode,
                target.peptide_ref,
                direct_score,
                hit.total_score()
            );
            hit.result
        }))
    }

    fn process_pair(
        &self,
        target: &PeptideCoordinate,
        decoy: &PeptideCoordinate,
        ms2: &SpectrumMap,
        out: &mut UnitOutcome,
    ) -> Result<(), DataProcessingError> {
        let policy = self.config.batch.policy;
        let weights = match policy {
            BatchPolicy::Standard | BatchPolicy::CappedIon => &self.config.scoring.weights,
            BatchPolicy::Reselect => self.context.weights.as_ref(),
        };
        let min_score = self.context.min_total_score;

        let mut target_res = self.score_hypothesis(target, ms2, weights, &mut out.timings)?;
        if policy == BatchPolicy::Reselect {
            if let Some(res) = target_res.as_mut() {
                if res.judge(min_score) != IdentifyStatus::Success {
                    let hit = self.search_fallback(target, ms2, res, &mut out.timings)?;
                    if let Some(mut alt) = hit {
                        alt.judge(min_score);
                        *res = alt;
                        out.counts.reselected += 1;
                    }
                }
            }
        }

        let score_decoy = match &target_res {
            Some(res) => policy == BatchPolicy::CappedIon || res.has_peak_groups(),
            None => {
                out.counts.empty += 1;
                policy == BatchPolicy::CappedIon
            }
        };
        let mut decoy_res = if score_decoy {
            self.score_hypothesis(decoy, ms2, weights, &mut out.timings)?
        } else {
            None
        };
        if policy == BatchPolicy::Reselect {
            if let Some(res) = decoy_res.as_mut() {
                res.judge(min_score);
            }
        }

        for mut res in [target_res, decoy_res].into_iter().flatten() {
            res.compress();
            out.results.push(res);
        }
        Ok(())
    }

    fn process_unit(&self, coord: &PeptideCoordinate) -> UnitOutcome {
        let mut out = UnitOutcome::default();
        let Some(ms2) = self.data.ms2_for_precursor(coord.precursor_mz) else {
            out.counts.skipped += 1;
            return out;
        };
        let target = self.prepare(coord);
        let decoy = match target.as_decoy() {
            Ok(decoy) => decoy,
            Err(e) => {
                warn!("No decoy for {}: {}", coord.peptide_ref, e);
                out.counts.decoy_failed += 1;
                return out;
            }
        };
        if let Err(e) = self.process_pair(&target, &decoy, ms2, &mut out) {
            warn!("Error scoring {}: {}", coord.peptide_ref, e);
            out.results.clear();
            out.counts.faulted += 1;
        }
        out
    }

    /// Phase 1: scores every coordinate and its decoy.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip(self, coords), level = "trace")
    )]
    pub fn score_batch(&self, coords: &[PeptideCoordinate]) -> BatchOutput {
        let num_input_items = coords.len();
        let start = Instant::now();

        #[cfg(not(feature = "serial_scoring"))]
        let acc: BatchAccumulator = coords
            .par_iter()
            .with_min_len(16)
            .map(|coord| self.process_unit(coord))
            .collect();

        #[cfg(feature = "serial_scoring")]
        let acc: BatchAccumulator = coords
            .iter()
            .map(|coord| self.process_unit(coord))
            .collect();

        let elapsed = start.elapsed();
        if num_input_items > 0 {
            let throughput = num_input_items as f64 / elapsed.as_secs_f64();
            info!(
                "Scoring {} coordinates took: {:?} throughput: {:#.1}/s",
                num_input_items, elapsed, throughput
            );
        }
        info!("{:?}", acc.counts);
        BatchOutput::from(acc)
    }

    /// Phase 2: sorts the results by (peptide ref, decoy flag) and runs
    /// the semi-supervised calibration over them.
    pub fn calibrate(
        &self,
        output: &mut BatchOutput,
    ) -> Result<CalibrationOutcome, CalibrationError> {
        let st = Instant::now();
        output.results.sort_by(|a, b| {
            a.peptide_ref
                .cmp(&b.peptide_ref)
                .then(a.decoy.cmp(&b.decoy))
        });
        let outcome = semi_supervised_calibration(&mut output.results, self.config)?;
        output.timings.calibration += st.elapsed();
        info!("{:?}", output.timings);
        Ok(outcome)
    }

    /// Both phases over one batch of coordinates.
    pub fn run(
        &self,
        coords: &[PeptideCoordinate],
    ) -> crate::errors::Result<(BatchOutput, CalibrationOutcome)> {
        let mut output = self.score_batch(coords);
        let outcome = self.calibrate(&mut output)?;
        Ok((output, outcome))
    }

    /// Scores a single coordinate against the run context, without
    /// recalibrating.
    ///
    /// The returned result keeps its trace. Coordinates outside every
    /// isolation window or without signal give `None`.
    pub fn predict_one(
        &self,
        coord: &PeptideCoordinate,
    ) -> Result<Option<ScoredPeptideResult>, DataProcessingError> {
        let Some(ms2) = self.data.ms2_for_precursor(coord.precursor_mz) else {
            return Ok(None);
        };
        let coord = self.prepare(coord);
        let ms1 = self.ms1();
        let Some(trace) = extract(&coord, ms1, ms2, &self.config.extraction)? else {
            return Ok(None);
        };
        let insufficient = has_insufficient_fragments(&trace);
        let mut result = score(trace, &coord, &self.config.scoring);
        result.apply_weights(&self.context.weights);
        if insufficient {
            return Ok(Some(result));
        }

        let min_score = self.context.min_total_score;
        if result.judge(min_score) == IdentifyStatus::Success
            || self.config.search.mode == SearchMode::Off
        {
            return Ok(Some(result));
        }
        let direct = result.best_total_score();
        let hit = run_search(&coord, ms1, ms2, self.config, &self.context.weights, direct)?;
        if let Some(hit) = hit {
            let mut alt = hit.result;
            if alt.judge(min_score) == IdentifyStatus::Success || result.best.is_none() {
                result = alt;
            }
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        IsolationWindow,
        ScoreType,
    };
    use crate::rt_mapping::SlopeIntercept;
    use crate::test_utils::SyntheticRun;

    fn run_data(coord: &PeptideCoordinate) -> SpectralData {
        let spectra = SyntheticRun::new(10.0, 50.0, 0.25)
            .with_fragments(coord, 30.0, 1000.0)
            .with_fragments(&coord.as_decoy().unwrap(), 25.0, 60.0)
            .build();
        single_window(spectra)
    }

    /// Target co-eluting with a broad interference on y5.
    fn interfered_data(coord: &PeptideCoordinate) -> SpectralData {
        let y5 = coord.fragments[2].mz;
        let spectra = SyntheticRun::new(10.0, 50.0, 0.2)
            .with_fragments(coord, 32.4, 1000.0)
            .with_wide_peak(y5, 32.4, 4.0, 3000.0)
            .with_fragments(&coord.as_decoy().unwrap(), 25.0, 60.0)
            .build();
        single_window(spectra)
    }

    fn shape_weights() -> ClassifierWeights {
        ClassifierWeights::new(
            [
                (ScoreType::XcorrShape, 1.0),
                (ScoreType::XcorrShapeWeighted, 1.0),
                (ScoreType::LibraryCorr, 1.0),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn single_window(spectra: SpectrumMap) -> SpectralData {
        SpectralData {
            ms1: SpectrumMap::default(),
            ms2_windows: vec![IsolationWindow {
                lower_mz: 400.0,
                upper_mz: 500.0,
                spectra,
            }],
        }
    }

    fn library() -> Vec<PeptideCoordinate> {
        let found = PeptideCoordinate::sample();
        let mut silent = PeptideCoordinate::sample();
        silent.peptide_ref = "SILENTK_2".into();
        for frag in silent.fragments.iter_mut() {
            frag.mz += 50.0;
        }
        let mut outside = PeptideCoordinate::sample();
        outside.peptide_ref = "OUTSIDEK_2".into();
        outside.precursor_mz = 900.0;
        vec![found, silent, outside]
    }

    #[test]
    fn test_standard_parity() {
        let data = run_data(&PeptideCoordinate::sample());
        let config = AnalysisConfig::default();
        let output = Pipeline::new(&data, &config).score_batch(&library());

        assert_eq!(output.counts.skipped, 1);
        assert_eq!(output.counts.empty, 1);
        assert_eq!(output.counts.faulted, 0);
        assert_eq!(output.results.len(), 2);
        for decoy in output.results.iter().filter(|r| r.decoy) {
            let target = output
                .results
                .iter()
                .find(|r| !r.decoy && r.peptide_ref == decoy.peptide_ref)
                .unwrap();
            assert!(target.has_peak_groups());
        }
        assert!(output.results.iter().all(|r| r.trace.is_none()));
    }

    #[test]
    fn test_capped_ion_scores_both() {
        let data = run_data(&PeptideCoordinate::sample());
        let mut config = AnalysisConfig::default();
        config.batch.policy = BatchPolicy::CappedIon;
        config.batch.max_ions = 3;
        let output = Pipeline::new(&data, &config).score_batch(&library()[..1]);
        assert_eq!(output.results.len(), 2);
        assert!(output.results.iter().all(|r| r.fragments.len() <= 3));
        assert_eq!(output.timings.search, std::time::Duration::ZERO);
    }

    #[test]
    fn test_standard_never_searches() {
        let coord = PeptideCoordinate::sample();
        let data = interfered_data(&coord);
        let mut config = AnalysisConfig::default();
        config.scoring.weights = shape_weights();
        config.scoring.min_total_score = 1e9;
        config.search.mode = SearchMode::Deletion;
        let output = Pipeline::new(&data, &config).score_batch(std::slice::from_ref(&coord));

        assert_eq!(output.timings.search, std::time::Duration::ZERO);
        assert_eq!(output.counts.reselected, 0);
        let labels: Vec<String> = coord.fragments.iter().map(|f| f.label.clone()).collect();
        let target = output.results.iter().find(|r| !r.decoy).unwrap();
        assert_eq!(target.fragments, labels);
        for decoy in output.results.iter().filter(|r| r.decoy) {
            assert_eq!(decoy.fragments.len(), coord.fragments.len());
        }
    }

    #[test]
    fn test_reselect_replaces_failing_target() {
        let coord = PeptideCoordinate::sample();
        let data = interfered_data(&coord);
        let mut config = AnalysisConfig::default();
        config.scoring.weights = shape_weights();
        config.batch.policy = BatchPolicy::Reselect;
        config.search.mode = SearchMode::Deletion;
        let context = RunContext::new(shape_weights(), 1e9);
        let output = Pipeline::new(&data, &config)
            .with_context(context)
            .score_batch(std::slice::from_ref(&coord));

        assert_eq!(output.counts.reselected, 1);
        assert!(output.timings.search > std::time::Duration::ZERO);
        let target = output.results.iter().find(|r| !r.decoy).unwrap();
        assert_eq!(target.fragments.len(), coord.fragments.len() - 1);
        assert!(!target.fragments.iter().any(|f| f == "y5"));
        // Decoys keep the full hypothesis.
        for decoy in output.results.iter().filter(|r| r.decoy) {
            assert_eq!(decoy.fragments.len(), coord.fragments.len());
        }
    }

    #[test]
    fn test_reselect_keeps_passing_targets() {
        let data = run_data(&PeptideCoordinate::sample());
        let mut config = AnalysisConfig::default();
        config.batch.policy = BatchPolicy::Reselect;
        let context = RunContext::new(ClassifierWeights::default(), f64::NEG_INFINITY);
        let output = Pipeline::new(&data, &config)
            .with_context(context)
            .score_batch(&library()[..1]);
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.counts.reselected, 0);
        assert_eq!(output.timings.search, std::time::Duration::ZERO);
        assert!(
            output
                .results
                .iter()
                .all(|r| r.status == IdentifyStatus::Success)
        );
    }

    #[test]
    fn test_unit_without_decoy_is_dropped() {
        let data = run_data(&PeptideCoordinate::sample());
        let config = AnalysisConfig::default();
        let mut broken = PeptideCoordinate::sample();
        broken.sequence = "PEPTC[+57.0215DEK".into();
        let output = Pipeline::new(&data, &config).score_batch(&[broken]);
        assert!(output.results.is_empty());
        assert_eq!(output.counts.decoy_failed, 1);
        assert_eq!(output.counts.faulted, 0);
    }

    #[test]
    fn test_rt_mapping_moves_window() {
        let mut coord = PeptideCoordinate::sample();
        let data = run_data(&coord);
        coord.rt += 100.0;
        coord.rt_start += 100.0;
        coord.rt_end += 100.0;

        let mut config = AnalysisConfig::default();
        let output = Pipeline::new(&data, &config).score_batch(std::slice::from_ref(&coord));
        assert_eq!(output.counts.empty, 1);

        config.batch.rt_mapping = Some(SlopeIntercept {
            slope: 1.0,
            intercept: 100.0,
        });
        let output = Pipeline::new(&data, &config).score_batch(std::slice::from_ref(&coord));
        assert_eq!(output.counts.empty, 0);
        let apex = output.results[0].best.as_ref().unwrap().apex_rt;
        assert!((apex - 30.0).abs() < 0.5);
    }

    #[test]
    fn test_predict_one() {
        let coord = PeptideCoordinate::sample();
        let data = run_data(&coord);
        let config = AnalysisConfig::default();
        let pipeline = Pipeline::new(&data, &config);

        let result = pipeline.predict_one(&coord).unwrap().unwrap();
        assert!(result.trace.is_some());
        assert_eq!(result.status, IdentifyStatus::Success);
        assert!((result.best.as_ref().unwrap().apex_rt - 30.0).abs() < 0.5);

        let mut outside = coord.clone();
        outside.precursor_mz = 900.0;
        assert!(pipeline.predict_one(&outside).unwrap().is_none());
    }

    #[test]
    fn test_run_calibrates_sorted_results() {
        let coord = PeptideCoordinate::sample();
        let data = run_data(&coord);
        let config = AnalysisConfig::default();
        let pipeline = Pipeline::new(&data, &config);
        let mut output = pipeline.score_batch(&library());
        // A single target/decoy pair is enough to train the linear model.
        let outcome = pipeline.calibrate(&mut output).unwrap();
        assert!(!output.results[0].decoy);
        assert!(output.results[1].decoy);
        assert_eq!(outcome.fine.n_targets, 1);
        assert!(output.results[0].fdr.is_some());
    }
}
