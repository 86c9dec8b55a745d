use xicseek::config::SearchMode;
use xicseek::fragment_mass::generate_by_ions;
use xicseek::models::{
    FragmentDescriptor,
    IsolationWindow,
    ScoreType,
    Spectrum,
    SpectrumMap,
};
use xicseek::{
    AnalysisConfig,
    BatchPolicy,
    ClassifierWeights,
    IdentifyStatus,
    PeptideCoordinate,
    PeptideSummary,
    Pipeline,
    RunContext,
    SpectralData,
};

const ALPHABET: &[u8] = b"ADEFGHINPQRSTVWY";

struct Peak {
    mz: f64,
    apex: f32,
    width: f32,
    height: f32,
}

/// Unique for `i < 256`: the first two residues spell `i` in base 16.
fn sequence(i: usize) -> String {
    let n = ALPHABET.len();
    let mut seq = String::new();
    seq.push(ALPHABET[i % n] as char);
    seq.push(ALPHABET[(i / n) % n] as char);
    for j in 2..7 {
        seq.push(ALPHABET[(i * 3 + j * 5) % n] as char);
    }
    seq.push('K');
    seq
}

fn coordinate(i: usize) -> PeptideCoordinate {
    let seq = sequence(i);
    let generated = generate_by_ions(&seq, 1, 3, 1).unwrap();
    let ys = generated.iter().filter(|f| f.label.starts_with('y')).take(4);
    let bs = generated.iter().filter(|f| f.label.starts_with('b')).take(2);
    let fragments: Vec<FragmentDescriptor> = ys
        .chain(bs)
        .enumerate()
        .map(|(rank, f)| FragmentDescriptor::new(f.label.clone(), f.mz, rank as u16 + 1, 1))
        .collect();
    // Half a dalton off keeps decoy fragments clear of every peptide fragment.
    let decoy_fragments = fragments
        .iter()
        .map(|f| FragmentDescriptor::new(f.label.clone(), f.mz + 0.5, f.rank, 1))
        .collect();
    let rt = 20.0 + i as f32 * 1.5;
    PeptideCoordinate {
        peptide_ref: format!("{}_2", seq),
        sequence: seq,
        precursor_mz: 450.0,
        charge: 2,
        rt,
        rt_start: rt - 10.0,
        rt_end: rt + 10.0,
        fragments,
        decoy_fragments,
        decoy: false,
    }
}

fn build_map(peaks: &[Peak], start: f32, end: f32, step: f32) -> SpectrumMap {
    let n = ((end - start) / step).round() as usize;
    let spectra = (0..=n)
        .map(|i| {
            let rt = start + i as f32 * step;
            let mut points: Vec<(f64, f32)> = peaks
                .iter()
                .flat_map(|p| {
                    let d = (rt - p.apex) / p.width;
                    let noise = 1.0 + ((i * 7) % 5) as f32 * 0.5;
                    [(p.mz, p.height * (-0.5 * d * d).exp()), (p.mz + 1e-4, noise)]
                })
                .collect();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            Spectrum {
                rt,
                mz: points.iter().map(|p| p.0).collect(),
                intensity: points.iter().map(|p| p.1).collect(),
            }
        })
        .collect();
    SpectrumMap::try_new(spectra).unwrap()
}

/// Every fourth target is absent from the run. Decoys elute away from
/// the predicted RT with three weak fragments.
fn synthetic_run(library: &[PeptideCoordinate]) -> SpectralData {
    let mut peaks = Vec::new();
    for (i, coord) in library.iter().enumerate() {
        if i % 4 != 0 {
            let height = 1000.0 * (1 + i % 3) as f32;
            for frag in coord.fragments.iter() {
                peaks.push(Peak {
                    mz: frag.mz,
                    apex: coord.rt,
                    width: 1.0,
                    height: height / frag.rank as f32,
                });
            }
        }
        for frag in coord.as_decoy().unwrap().fragments.iter().take(3) {
            peaks.push(Peak {
                mz: frag.mz,
                apex: coord.rt + 4.0 + (i % 3) as f32,
                width: 1.0,
                height: 40.0,
            });
        }
    }
    SpectralData {
        ms1: SpectrumMap::default(),
        ms2_windows: vec![IsolationWindow {
            lower_mz: 400.0,
            upper_mz: 500.0,
            spectra: build_map(&peaks, 0.0, 130.0, 0.5),
        }],
    }
}

#[test]
fn test_end_to_end_standard_policy() {
    let library: Vec<PeptideCoordinate> = (0..60).map(coordinate).collect();
    let data = synthetic_run(&library);
    let config = AnalysisConfig::default();
    let pipeline = Pipeline::new(&data, &config);
    let (output, outcome) = pipeline.run(&library).unwrap();

    assert_eq!(output.counts.skipped, 0);
    assert_eq!(output.counts.faulted, 0);
    assert!(output.results.iter().all(|r| r.trace.is_none()));

    // Every decoy comes with a target that produced peak groups.
    for decoy in output.results.iter().filter(|r| r.decoy) {
        let target = output
            .results
            .iter()
            .find(|r| !r.decoy && r.peptide_ref == decoy.peptide_ref)
            .unwrap();
        assert!(target.has_peak_groups());
    }
    assert!(
        output
            .results
            .iter()
            .filter(|r| !r.decoy && r.best.is_some())
            .all(|r| r.fdr.is_some() && r.q_value.is_some())
    );
    assert!(outcome.min_score().is_some());
    assert!(outcome.fine.n_accepted >= 40, "{:?}", outcome.fine);
    let n_success = output
        .results
        .iter()
        .filter(|r| r.status == IdentifyStatus::Success)
        .count();
    assert_eq!(n_success, outcome.fine.n_accepted);

    let summaries: Vec<PeptideSummary> = output.results.iter().map(PeptideSummary::from).collect();
    assert_eq!(summaries.len(), output.results.len());
    assert!(summaries.iter().all(|s| !s.fragments.is_empty()));
}

#[test]
fn test_calibration_is_deterministic() {
    let library: Vec<PeptideCoordinate> = (0..40).map(coordinate).collect();
    let data = synthetic_run(&library);
    let config = AnalysisConfig::default();
    let pipeline = Pipeline::new(&data, &config);

    let (first, _) = pipeline.run(&library).unwrap();
    let (second, _) = pipeline.run(&library).unwrap();
    assert_eq!(first.results.len(), second.results.len());
    for (a, b) in first.results.iter().zip(second.results.iter()) {
        assert_eq!(a.peptide_ref, b.peptide_ref);
        assert_eq!(a.decoy, b.decoy);
        assert_eq!(a.fdr, b.fdr);
        assert_eq!(a.status, b.status);
    }
}

#[test]
fn test_reselect_falls_back_to_deletion() {
    let coord = coordinate(1);
    let interfered = coord.fragments[2].clone();
    let mut peaks: Vec<Peak> = coord
        .fragments
        .iter()
        .map(|f| Peak {
            mz: f.mz,
            apex: coord.rt,
            width: 1.0,
            height: 1000.0 / f.rank as f32,
        })
        .collect();
    // Broad co-eluting interference on the third fragment.
    peaks.push(Peak {
        mz: interfered.mz,
        apex: coord.rt,
        width: 4.0,
        height: 3000.0,
    });
    let data = SpectralData {
        ms1: SpectrumMap::default(),
        ms2_windows: vec![IsolationWindow {
            lower_mz: 400.0,
            upper_mz: 500.0,
            spectra: build_map(&peaks, 0.0, 60.0, 0.5),
        }],
    };

    let weights = ClassifierWeights::new(
        [
            (ScoreType::XcorrShape, 1.0),
            (ScoreType::XcorrShapeWeighted, 1.0),
            (ScoreType::LibraryCorr, 1.0),
        ]
        .into_iter()
        .collect(),
    );
    let mut config = AnalysisConfig::default();
    config.scoring.weights = weights.clone();
    config.batch.policy = BatchPolicy::Reselect;
    config.search.mode = SearchMode::Deletion;
    // Nothing reaches the prior threshold, so the direct score always fails.
    let context = RunContext::new(weights, 1e9);
    let output = Pipeline::new(&data, &config)
        .with_context(context)
        .score_batch(std::slice::from_ref(&coord));

    assert_eq!(output.counts.faulted, 0);
    assert_eq!(output.counts.reselected, 1);
    let target = output.results.iter().find(|r| !r.decoy).unwrap();
    assert!(target.has_peak_groups());
    assert_eq!(target.fragments.len(), coord.fragments.len() - 1);
    assert!(!target.fragments.contains(&interfered.label));
    assert_ne!(target.status, IdentifyStatus::Success);
}
