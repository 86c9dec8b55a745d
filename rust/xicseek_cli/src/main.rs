mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use xicseek::data_sources::read_spectral_data;
use xicseek::{
    CoordinateLibrary,
    Pipeline,
    RunContext,
};

use cli::Cli;
use config::{
    Config,
    InputConfig,
    OutputConfig,
};

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();

    let conf = match std::fs::File::open(args.config.clone()) {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::Io {
                source: e.to_string(),
                path: Some(args.config.to_string_lossy().to_string()),
            });
        }
    };
    let config: Result<Config, _> = serde_json::from_reader(conf);
    let mut config = match config {
        Ok(x) => x,
        Err(e) => {
            return Err(errors::CliError::ParseError { msg: e.to_string() });
        }
    };

    // Override config with command line arguments if provided
    let (mut spectra, mut library) = match config.input.take() {
        Some(InputConfig::Json { spectra, library }) => (Some(spectra), Some(library)),
        None => (None, None),
    };
    if let Some(spectra_file) = args.spectra_file {
        spectra = Some(spectra_file);
    }
    if let Some(library_file) = args.library_file {
        library = Some(library_file);
    }
    let (Some(spectra), Some(library)) = (spectra, library) else {
        return Err(errors::CliError::Config {
            source: "No input provided, please provide spectra and a library in either the \
                     config file or with the --spectra-file and --library-file flags"
                .to_string(),
        });
    };
    config.input = Some(InputConfig::Json {
        spectra: spectra.clone(),
        library: library.clone(),
    });
    if let Some(output_dir) = args.output_dir {
        config.output = Some(OutputConfig {
            directory: output_dir,
        });
    }
    let Some(output_config) = config.output.clone() else {
        return Err(errors::CliError::Config {
            source: "No output directory provided, please provide one in either the config \
                     file or with the --output-dir flag"
                .to_string(),
        });
    };
    info!("Parsed configuration: {:#?}", config);

    if let Err(e) = std::fs::create_dir_all(&output_config.directory) {
        return Err(errors::CliError::Io {
            source: e.to_string(),
            path: Some(output_config.directory.to_string_lossy().to_string()),
        });
    }

    let data = read_spectral_data(&spectra)?;
    let coordinates = CoordinateLibrary::from_file(&library)?;

    let mut pipeline = Pipeline::new(&data, &config.analysis);
    if let Some(context) = config.context.clone() {
        pipeline = pipeline.with_context(RunContext::from(context));
    }
    processing::main_loop(
        &coordinates,
        &pipeline,
        config.analysis.batch.policy,
        config.chunk_size,
        &output_config,
    )
}
