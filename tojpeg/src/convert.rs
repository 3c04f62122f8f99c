//! Conversion of a single DICOM file into a grayscale JPEG image.
//!
//! The first frame of the pixel data is read as raw stored values
//! (no modality or VOI LUT is applied),
//! rescaled so that its minimum becomes 0 and its maximum 255,
//! and encoded as a single channel JPEG.
//! The image is saved in the patient's output folder
//! under the next free sequence number.
use std::fmt;
use std::path::{Path, PathBuf};

use dicom_dictionary_std::{tags, uids};
use dicom_object::{
    file::ReadPreamble, DefaultDicomObject, FileMetaTableBuilder, InMemDicomObject,
    OpenFileOptions,
};
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use dicom_transfer_syntax_registry::entries::IMPLICIT_VR_LITTLE_ENDIAN;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use snafu::{ensure, ErrorCompat, ResultExt, Snafu};
use tracing::debug;

use crate::patient::{self, patient_folder};
use crate::sequence::{self, SequenceAllocator};

/// Number of directories between a file's parent and its patient folder.
pub const DEFAULT_LEVELS_UP: usize = 2;

/// JPEG quality of the output images.
pub const DEFAULT_QUALITY: u8 = 95;

/// SOP class recorded for data sets read without a file meta group
/// and without a SOP Class UID of their own (Secondary Capture).
const FALLBACK_SOP_CLASS_UID: &str = "1.2.840.10008.5.1.4.1.1.7";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read DICOM file"))]
    OpenFile { source: dicom_object::ReadError },

    #[snafu(display("Could not resolve patient folder"))]
    ResolvePatient { source: patient::Error },

    #[snafu(display("Could not create output directory {}", path.display()))]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not decode pixel data"))]
    DecodePixelData { source: dicom_pixeldata::Error },

    #[snafu(display("Could not convert pixel data samples"))]
    ConvertPixelData { source: dicom_pixeldata::Error },

    #[snafu(display("Unsupported samples per pixel {spp}, only grayscale images are converted"))]
    UnsupportedSamplesPerPixel { spp: u16 },

    #[snafu(display("Frame of {columns}x{rows} pixels holds {len} samples"))]
    BadDimensions { columns: u32, rows: u32, len: usize },

    #[snafu(display("Could not encode JPEG image"))]
    EncodeJpeg { source: image::ImageError },

    #[snafu(display("Could not name output image"))]
    AllocateName { source: sequence::Error },

    #[snafu(display("Could not write image to {}", path.display()))]
    WriteImage {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The result of converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The image was written to `path`
    Saved { path: PathBuf },
    /// The file has no pixel data, nothing was written
    Skipped { file: PathBuf },
    /// The conversion failed with the given error message
    Failed { file: PathBuf, message: String },
}

impl Outcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Outcome::Saved { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Saved { path } => write!(f, "✔ Saved: {}", path.display()),
            Outcome::Skipped { file } => {
                write!(f, "Skipping {} - No Pixel Data Found", file.display())
            }
            Outcome::Failed { file, message } => {
                write!(f, "❌ Error processing {}: {}", file.display(), message)
            }
        }
    }
}

/// Converts DICOM files into JPEG images
/// placed in per-patient folders under a common output directory.
///
/// A single converter should be shared by all workers of a batch,
/// so that sequence numbers are allocated consistently.
#[derive(Debug)]
pub struct Converter {
    output_root: PathBuf,
    levels_up: usize,
    quality: u8,
    sequence: SequenceAllocator,
}

impl Converter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Converter {
            output_root: output_root.into(),
            levels_up: DEFAULT_LEVELS_UP,
            quality: DEFAULT_QUALITY,
            sequence: SequenceAllocator::new(),
        }
    }

    /// Set how many levels above the file's parent directory
    /// the patient folder is found.
    pub fn levels_up(mut self, levels_up: usize) -> Self {
        self.levels_up = levels_up;
        self
    }

    /// Set the JPEG quality (1 to 100).
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Convert one file.
    ///
    /// Errors are never propagated,
    /// they are turned into an [`Outcome::Failed`] for the file instead.
    pub fn convert(&self, file: &Path) -> Outcome {
        debug!("Converting {}", file.display());
        match self.try_convert(file) {
            Ok(Some(path)) => {
                debug!("{} saved to {}", file.display(), path.display());
                Outcome::Saved { path }
            }
            Ok(None) => {
                debug!("{} has no pixel data", file.display());
                Outcome::Skipped {
                    file: file.to_path_buf(),
                }
            }
            Err(e) => {
                let message = error_chain(&e);
                debug!("Failed to convert {}: {}", file.display(), message);
                Outcome::Failed {
                    file: file.to_path_buf(),
                    message,
                }
            }
        }
    }

    fn try_convert(&self, file: &Path) -> Result<Option<PathBuf>> {
        let obj = open_dicom(file)?;

        if obj.get(tags::PIXEL_DATA).is_none() {
            return Ok(None);
        }

        let patient = patient_folder(file, self.levels_up).context(ResolvePatientSnafu)?;
        let folder = self.output_root.join(patient);
        std::fs::create_dir_all(&folder).context(CreateDirectorySnafu { path: &folder })?;

        let pixel = obj.decode_pixel_data().context(DecodePixelDataSnafu)?;
        let spp = pixel.samples_per_pixel();
        ensure!(spp == 1, UnsupportedSamplesPerPixelSnafu { spp });

        let (columns, rows) = (pixel.columns(), pixel.rows());
        let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
        let samples: Vec<f64> = pixel
            .to_vec_frame_with_options(0, &options)
            .context(ConvertPixelDataSnafu)?;
        ensure!(
            samples.len() as u64 == u64::from(columns) * u64::from(rows),
            BadDimensionsSnafu {
                columns,
                rows,
                len: samples.len(),
            }
        );

        let jpeg = encode_jpeg(&rescale_to_u8(&samples), columns, rows, self.quality)?;

        // only claim a name once there is something to write
        let path = self.sequence.next_path(&folder).context(AllocateNameSnafu)?;
        std::fs::write(&path, jpeg).context(WriteImageSnafu { path: &path })?;
        Ok(Some(path))
    }
}

/// Open a DICOM file, with or without preamble.
///
/// Files lacking the file meta group altogether are read as a bare
/// data set in implicit VR little endian, provided that they start
/// with a group 0008 element.
fn open_dicom(file: &Path) -> Result<DefaultDicomObject> {
    let err = match OpenFileOptions::new()
        .read_preamble(ReadPreamble::Auto)
        .open_file(file)
    {
        Ok(obj) => return Ok(obj),
        Err(e) => e,
    };

    match read_bare_dataset(file) {
        Some(obj) => {
            debug!(
                "{} has no file meta group, read as implicit VR little endian",
                file.display()
            );
            Ok(obj)
        }
        None => Err(err).context(OpenFileSnafu),
    }
}

fn read_bare_dataset(file: &Path) -> Option<DefaultDicomObject> {
    let bytes = std::fs::read(file).ok()?;
    if !bytes.starts_with(&[0x08, 0x00]) {
        return None;
    }
    let obj =
        InMemDicomObject::read_dataset_with_ts(&bytes[..], &IMPLICIT_VR_LITTLE_ENDIAN.erased())
            .ok()?;

    let uid = |tag| {
        obj.get(tag)
            .and_then(|e| e.value().to_str().ok())
            .map(|uid| uid.trim_end_matches(['\0', ' ']).to_string())
    };
    let sop_class_uid =
        uid(tags::SOP_CLASS_UID).unwrap_or_else(|| FALLBACK_SOP_CLASS_UID.to_string());
    // the file meta group is never written out
    let sop_instance_uid = uid(tags::SOP_INSTANCE_UID).unwrap_or_else(|| "2.25.0".to_string());

    obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(sop_class_uid)
            .media_storage_sop_instance_uid(sop_instance_uid),
    )
    .ok()
}

/// Convert one file into the given output directory
/// with the default settings.
///
/// The sequence number is derived from the images already in the
/// patient folder. Use a shared [`Converter`] when converting
/// several files concurrently.
pub fn convert_file(file: &Path, output_root: &Path) -> Outcome {
    Converter::new(output_root).convert(file)
}

/// Linearly map the samples so that the minimum becomes 0
/// and the maximum becomes 255, truncating towards zero.
///
/// Constant (or empty) input yields all zeros.
pub fn rescale_to_u8(samples: &[f64]) -> Vec<u8> {
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
    let range = max - min;
    if !(range > 0.) {
        return vec![0; samples.len()];
    }
    samples
        .iter()
        .map(|&v| ((v - min) / range * 255.) as u8)
        .collect()
}

fn encode_jpeg(gray: &[u8], columns: u32, rows: u32, quality: u8) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode(gray, columns, rows, ExtendedColorType::L8)
        .context(EncodeJpegSnafu)?;
    Ok(jpeg)
}

/// Render an error and its causes in a single line.
fn error_chain(e: &Error) -> String {
    e.iter_chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
