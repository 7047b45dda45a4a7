/// Thin wrapper around the `git` binary: repository discovery, remote
/// lookup, and the ref queries the resolver needs.
///
/// The rest of the crate only ever sees clean, trimmed strings from here;
/// nothing downstream parses raw plumbing output.
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;
use crate::types::Remote;

/// Run `git <args>` in `repo_path` and return trimmed stdout.
///
/// # Errors
///
/// Returns `Error::ExternalCommand` when git cannot be spawned or exits
/// non-zero; the captured stderr becomes the detail.
pub fn run(repo_path: &Path, args: &[&str]) -> Result<String, Error> {
    let command = format!("git {}", args.join(" "));
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .map_err(|e| Error::ExternalCommand {
            command: command.clone(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::ExternalCommand {
            command,
            detail: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Find the working copy root containing `dir`.
///
/// # Errors
///
/// Returns `Error::NotARepository` when `dir` is not inside a git repository.
pub fn discover_root(dir: &Path) -> Result<PathBuf, Error> {
    run(dir, &["rev-parse", "--show-toplevel"])
        .map(PathBuf::from)
        .map_err(|_e| Error::NotARepository {
            path: dir.to_path_buf(),
        })
}

/// Pick the remote to link against: the preferred name when it has a URL,
/// otherwise the first remote git lists.
///
/// # Errors
///
/// Returns `Error::NoRemote` when the repository has no remotes at all,
/// or `Error::ExternalCommand` if git itself fails.
pub fn select_remote(root: &Path, preferred: &str) -> Result<Remote, Error> {
    if let Ok(url) = run(root, &["remote", "get-url", preferred])
        && !url.is_empty()
    {
        return Ok(Remote {
            name: preferred.to_string(),
            url,
        });
    }

    let listed = run(root, &["remote"])?;
    let Some(first) = listed.lines().next().map(str::trim).filter(|n| !n.is_empty()) else {
        return Err(Error::NoRemote {
            root: root.to_path_buf(),
        });
    };

    let url = run(root, &["remote", "get-url", first])?;
    Ok(Remote {
        name: first.to_string(),
        url,
    })
}

/// The current commit hash, short or full.
///
/// # Errors
///
/// Returns `Error::ExternalCommand` if git fails (e.g. an unborn branch).
pub fn commit_hash(root: &Path, short: bool) -> Result<String, Error> {
    if short {
        run(root, &["rev-parse", "--short", "HEAD"])
    } else {
        run(root, &["rev-parse", "HEAD"])
    }
}

/// The abbreviated name of the current branch.
///
/// # Errors
///
/// Returns `Error::DetachedHead` when HEAD is not on a branch.
pub fn current_branch(root: &Path) -> Result<String, Error> {
    let name = run(root, &["rev-parse", "--abbrev-ref", "HEAD"])?;
    if name == "HEAD" {
        return Err(Error::DetachedHead);
    }
    Ok(name)
}

/// The branch name recorded as the remote's HEAD, e.g. `main`.
///
/// # Errors
///
/// Returns `Error::NoRemoteHead` when the remote has no recorded HEAD
/// (common for repositories cloned without `origin/HEAD`, or bare remotes).
pub fn remote_head_branch(root: &Path, remote: &str) -> Result<String, Error> {
    let full = run(root, &["symbolic-ref", &format!("refs/remotes/{remote}/HEAD")]).map_err(
        |_e| Error::NoRemoteHead {
            remote: remote.to_string(),
        },
    )?;

    let prefix = format!("refs/remotes/{remote}/");
    match full.strip_prefix(&prefix) {
        Some(branch) if !branch.is_empty() => Ok(branch.to_string()),
        _ => Err(Error::NoRemoteHead {
            remote: remote.to_string(),
        }),
    }
}
