use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the spectral data JSON (will over-write the config file)
    #[arg(short, long)]
    pub spectra_file: Option<PathBuf>,

    /// Path to the coordinate library (will over-write the config file)
    #[arg(short, long)]
    pub library_file: Option<PathBuf>,

    /// Path to the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
