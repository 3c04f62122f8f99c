//! Allocation of output file sequence numbers per patient folder.
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not list existing images in {}", path.display()))]
    ListDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Hands out sequence numbers for the images written into each output folder.
///
/// The first request for a folder counts the `.jpg` files already there,
/// so that numbering continues after images from earlier runs.
/// Every following request for the same folder increments under a lock,
/// which keeps names unique and gap-free when several workers
/// write into the same folder at once.
///
/// The folder is listed without holding the lock.
/// When several workers race on a new folder, the first count stored wins;
/// no image can have been written there by this allocator before that.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: Mutex<HashMap<PathBuf, u32>>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next sequence number for the given folder.
    pub fn allocate(&self, folder: &Path) -> Result<u32> {
        if let Some(n) = self.bump(folder) {
            return Ok(n);
        }

        let existing = count_jpeg_files(folder)?;
        debug!(
            "{} already holds {} JPEG files",
            folder.display(),
            existing
        );
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = next.entry(folder.to_path_buf()).or_insert(existing);
        let n = *counter;
        *counter += 1;
        Ok(n)
    }

    /// Take the next number of a folder seen before.
    fn bump(&self, folder: &Path) -> Option<u32> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = next.get_mut(folder)?;
        let n = *counter;
        *counter += 1;
        Some(n)
    }

    /// Reserve the next output file path in the given folder,
    /// named after its zero-padded sequence number (`00.jpg`, `01.jpg`, ...).
    pub fn next_path(&self, folder: &Path) -> Result<PathBuf> {
        let n = self.allocate(folder)?;
        Ok(folder.join(format!("{n:02}.jpg")))
    }
}

/// Count the regular files with the `jpg` extension directly inside `folder`.
fn count_jpeg_files(folder: &Path) -> Result<u32> {
    let mut count = 0;
    let entries = std::fs::read_dir(folder).context(ListDirectorySnafu { path: folder })?;
    for entry in entries {
        let entry = entry.context(ListDirectorySnafu { path: folder })?;
        let path = entry.path();
        if path.extension() == Some(OsStr::new("jpg")) && path.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
