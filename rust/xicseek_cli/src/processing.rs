use super::config::OutputConfig;
use crate::errors::CliError;
use csv::WriterBuilder;
use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{
    debug,
    info,
};
use xicseek::fdr::FdrReport;
use xicseek::ml::CalibrationOutcome;
use xicseek::pipeline::{
    BatchCounts,
    PipelineTimings,
};
use xicseek::{
    BatchOutput,
    BatchPolicy,
    ClassifierWeights,
    CoordinateLibrary,
    PeptideSummary,
    Pipeline,
};

#[derive(Debug, Serialize)]
struct CalibrationReport<'a> {
    policy: BatchPolicy,
    weights: Option<&'a ClassifierWeights>,
    coarse: &'a FdrReport,
    fine: &'a FdrReport,
    counts: BatchCounts,
    timings: &'a PipelineTimings,
}

pub fn main_loop(
    library: &CoordinateLibrary,
    pipeline: &Pipeline,
    policy: BatchPolicy,
    chunk_size: usize,
    out_path: &OutputConfig,
) -> std::result::Result<(), CliError> {
    let start = Instant::now();
    let mut chunk_num = 0;
    let mut output = BatchOutput::default();

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::Config {
        source: e.to_string(),
    })?;
    library
        .as_slice()
        .chunks(chunk_size.max(1))
        .progress_with_style(style)
        .for_each(|chunk| {
            // Parallelism happens within score_batch
            let out = pipeline.score_batch(chunk);
            debug!("Chunk {} gave {} results", chunk_num, out.results.len());
            output.merge(out);
            chunk_num += 1;
        });
    info!(
        "Scored {} coordinates in {} chunks, {:?}",
        library.len(),
        chunk_num,
        output.counts
    );

    let outcome = pipeline.calibrate(&mut output)?;
    write_summaries(&output, &out_path.directory.join("summaries.csv"))?;
    write_calibration(
        &output,
        &outcome,
        policy,
        &out_path.directory.join("calibration.json"),
    )?;
    println!(
        "Accepted {} targets at FDR {} (min score {:?})",
        outcome.fine.n_accepted, outcome.fine.fdr_target, outcome.fine.min_score
    );
    println!("Finished processing in {:?}", start.elapsed());
    Ok(())
}

fn write_summaries(output: &BatchOutput, out_path: &Path) -> std::result::Result<(), CliError> {
    let start = Instant::now();
    let mut writer = WriterBuilder::default()
        .has_headers(true)
        .from_path(out_path)?;
    for result in output.results.iter() {
        writer.serialize(PeptideSummary::from(result))?;
    }
    writer.flush().map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(out_path.to_string_lossy().to_string()),
    })?;
    info!("Writing took {:?} -> {:?}", start.elapsed(), out_path);
    Ok(())
}

fn write_calibration(
    output: &BatchOutput,
    outcome: &CalibrationOutcome,
    policy: BatchPolicy,
    out_path: &Path,
) -> std::result::Result<(), CliError> {
    let report = CalibrationReport {
        policy,
        weights: outcome.model.weights(),
        coarse: &outcome.coarse,
        fine: &outcome.fine,
        counts: output.counts,
        timings: &output.timings,
    };
    let file = std::fs::File::create(out_path).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(out_path.to_string_lossy().to_string()),
    })?;
    serde_json::to_writer_pretty(file, &report)?;
    info!("Wrote calibration report to {:?}", out_path);
    Ok(())
}
