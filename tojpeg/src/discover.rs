//! Depth-limited file discovery.
use snafu::{ResultExt, Snafu};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read directory {}", path.display()))]
    ReadDirectory {
        path: PathBuf,
        source: walkdir::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Collect every regular file contained in a directory
/// which is exactly `depth` levels below `root`.
///
/// With `depth = 0`, these are the files directly inside `root`.
/// With `depth = 3`, a file at `root/a/b/c/file` is collected,
/// whereas `root/a/b/file` and `root/a/b/c/d/file` are not.
///
/// Symbolic links are followed.
/// Dangling links and link cycles are skipped,
/// any other failure to read the tree is an error.
/// The order of the returned paths is that of the file system
/// and must not be relied upon.
pub fn find_files_at_depth(root: &Path, depth: usize) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .min_depth(depth + 1)
        .max_depth(depth + 1)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_broken_link(&e) => {
                debug!("Skipping unreachable link: {}", e);
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(e).context(ReadDirectorySnafu { path });
            }
        };
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Whether the walk failed on a link pointing nowhere or back at an ancestor.
fn is_broken_link(err: &walkdir::Error) -> bool {
    if err.loop_ancestor().is_some() {
        return true;
    }
    let not_found = err.io_error().map(std::io::Error::kind) == Some(ErrorKind::NotFound);
    not_found
        && err
            .path()
            .and_then(|path| path.symlink_metadata().ok())
            .is_some_and(|meta| meta.file_type().is_symlink())
}
