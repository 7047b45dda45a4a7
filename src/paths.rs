/// Repository-relative path computation with the symlink boundary rule.
use std::path::{Component, Path};

use crate::error::Error;

/// Compute the repository-relative path of `file` under `root`, with
/// forward slashes, resolving symlinks only within the repository tree.
///
/// When the repository root itself is reached through a symlink, the link
/// target becomes the base and nothing above it is resolved further: both
/// sides are canonicalized, so a file addressed through the symlinked root
/// still lands inside the canonical root. A file whose canonical location
/// escapes the root is rejected.
///
/// # Errors
///
/// Returns `Error::Io` when the file does not exist, or
/// `Error::FileOutsideRepository` when it resolves outside the root.
pub fn repo_relative(root: &Path, file: &Path) -> Result<String, Error> {
    let canonical_root = root.canonicalize()?;
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };
    let canonical_file = absolute.canonicalize()?;

    let relative = canonical_file
        .strip_prefix(&canonical_root)
        // A path given through the symlinked root but not fully resolvable
        // under the canonical root: fall back to the unresolved spelling.
        .or_else(|_| absolute.strip_prefix(root))
        .map_err(|_e| Error::FileOutsideRepository {
            path: file.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    Ok(forward_slashes(relative))
}

/// Join path components with `/` regardless of platform.
fn forward_slashes(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}
