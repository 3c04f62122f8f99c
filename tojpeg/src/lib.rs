//! Batch conversion of DICOM file trees into grayscale JPEG images.
//!
//! The input tree is expected to follow a fixed layout,
//! such as `<root>/<patient>/<study>/<series>/<file>`.
//! Every file found at the configured depth is opened as DICOM,
//! its first frame is linearly rescaled to the full 8-bit range,
//! and the result is saved as `<output>/<patient>/<NN>.jpg`.
//!
//! # Example
//!
//! ```no_run
//! # use std::error::Error;
//! use dicom_tojpeg::{BatchOptions, run_batch};
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let report = run_batch("/data/dicom", "/data/jpeg", &BatchOptions::default())?;
//! println!("{} images saved", report.saved());
//! #   Ok(())
//! # }
//! ```
pub mod batch;
pub mod convert;
pub mod discover;
pub mod patient;
pub mod sequence;

pub use batch::{run_batch, BatchOptions, BatchReport};
pub use convert::{convert_file, rescale_to_u8, Outcome};
pub use discover::find_files_at_depth;
pub use patient::patient_folder;
pub use sequence::SequenceAllocator;
