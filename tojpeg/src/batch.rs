//! Batch conversion of a whole input tree on a fixed-size worker pool.
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::convert::{Converter, Outcome, DEFAULT_LEVELS_UP, DEFAULT_QUALITY};
use crate::discover::{self, find_files_at_depth};

/// Directory depth below the input root at which files are collected.
pub const DEFAULT_DEPTH: usize = 3;

/// Number of worker threads.
pub const DEFAULT_THREADS: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not resolve input directory {}", path.display()))]
    ResolveInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not resolve output directory {}", path.display()))]
    ResolveOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not collect input files"))]
    Discover { source: discover::Error },

    #[snafu(display("Could not start worker pool"))]
    BuildPool { source: rayon::ThreadPoolBuildError },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Settings of a batch conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// depth below the input root of the directories holding the files
    pub depth: usize,
    /// levels above a file's directory where the patient folder is
    pub levels_up: usize,
    /// number of worker threads
    pub threads: NonZeroUsize,
    /// JPEG quality
    pub quality: u8,
    /// draw a progress bar while converting
    pub progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            depth: DEFAULT_DEPTH,
            levels_up: DEFAULT_LEVELS_UP,
            threads: DEFAULT_THREADS,
            quality: DEFAULT_QUALITY,
            progress: false,
        }
    }
}

/// The outcomes of a batch, in the order the files were submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Convert every file found in the input tree,
/// printing the outcome of each file once the batch is over.
///
/// Only a failure to resolve the directories, to walk the input tree
/// or to start the worker pool aborts the batch.
/// Problems with individual files are reported in their outcome.
pub fn run_batch(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    options: &BatchOptions,
) -> Result<BatchReport> {
    let input_dir = input_dir.as_ref();
    let output_dir = output_dir.as_ref();
    let input_path =
        std::fs::canonicalize(input_dir).context(ResolveInputSnafu { path: input_dir })?;
    let output_path =
        std::path::absolute(output_dir).context(ResolveOutputSnafu { path: output_dir })?;

    let files = find_files_at_depth(&input_path, options.depth).context(DiscoverSnafu)?;
    if files.is_empty() {
        println!("❌ No DICOM files found.");
        return Ok(BatchReport::default());
    }

    println!(
        "🚀 Starting DICOM to JPEG conversion with {} threads...",
        options.threads
    );
    println!("📂 Found {} DICOM files.", files.len());
    println!("📂 Input Directory: {}", input_path.display());
    println!("💾 Output Directory: {}", output_path.display());

    let converter = Converter::new(output_path)
        .levels_up(options.levels_up)
        .quality(options.quality);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.threads.get())
        .thread_name(|i| format!("tojpeg-worker-{i}"))
        .build()
        .context(BuildPoolSnafu)?;

    let progress_bar = options.progress.then(|| {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")
                .expect("Invalid progress bar template"),
        );
        pb.enable_steady_tick(Duration::new(0, 480_000_000));
        pb
    });

    let outcomes: Vec<Outcome> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let outcome = converter.convert(file);
                if let Some(pb) = &progress_bar {
                    pb.inc(1);
                }
                outcome
            })
            .collect()
    });

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    for outcome in &outcomes {
        println!("{outcome}");
    }

    let report = BatchReport { outcomes };
    info!(
        "{} saved, {} skipped, {} failed",
        report.saved(),
        report.skipped(),
        report.failed()
    );
    debug!("Batch of {} files finished", report.outcomes.len());
    println!("✅ Conversion complete!");

    Ok(report)
}
