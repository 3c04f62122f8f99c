//! Resolution of the patient folder name from a file's position in the tree.
use snafu::{OptionExt, Snafu};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[derive(Debug, Snafu)]
pub enum Error {
    /// The path does not have enough ancestor directories
    #[snafu(display(
        "Path {} has no named ancestor {} levels above its parent directory",
        path.display(),
        levels_up
    ))]
    PathTooShallow { path: PathBuf, levels_up: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Obtain the name of the directory `levels_up` levels
/// above the directory containing `file`.
///
/// This is purely syntactic and does not touch the file system.
/// For `/in/patient/study/series/img` and `levels_up = 2`,
/// the result is `patient`.
pub fn patient_folder(file: &Path, levels_up: usize) -> Result<&OsStr> {
    // ancestors() starts at the file itself
    file.ancestors()
        .nth(levels_up + 1)
        .and_then(Path::file_name)
        .context(PathTooShallowSnafu {
            path: file,
            levels_up,
        })
}
