//! A CLI tool for converting a tree of DICOM files
//! into per-patient folders of grayscale JPEG images.
//!
//! Files are expected exactly three directory levels below the input
//! directory (`<patient>/<study>/<series>/<file>`).
//! Each image is written to `<output>/<patient>/<NN>.jpg`.
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use dicom_tojpeg::{run_batch, BatchOptions};
use snafu::{Report, ResultExt, Whatever};
use tracing::{error, Level};

/// Convert DICOM files to JPEG
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// Absolute path to the input DICOM directory
    #[arg(long = "input-dir")]
    input_dir: PathBuf,

    /// Absolute path to the output directory for JPEGs
    #[arg(long = "output-dir")]
    output_dir: PathBuf,

    /// Number of threads for parallel processing
    #[arg(long = "threads", default_value = "4")]
    threads: NonZeroUsize,

    /// Log each file as it is converted instead of showing a progress bar
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let App {
        input_dir,
        output_dir,
        threads,
        verbose,
    } = App::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .with_writer(std::io::stderr)
            .finish(),
    )
    .whatever_context("Could not set up global logging subscriber")
    .unwrap_or_else(|e: Whatever| {
        eprintln!("[ERROR] {}", Report::from_error(e));
    });

    let options = BatchOptions {
        threads,
        progress: !verbose,
        ..BatchOptions::default()
    };

    run_batch(&input_dir, &output_dir, &options).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-2);
    });
}
