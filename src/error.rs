/// Crate-level error types for gitlink failures.
use std::path::PathBuf;

/// All errors in gitlink carry enough context to produce a useful diagnostic
/// without a debugger. Callers branch on the variant: a detached HEAD and an
/// unrecognized remote call for different advice.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider definition failed to compile (bad pattern or template).
    #[error("invalid handler `{handler}`: {reason}")]
    CatalogInvalid {
        /// Name of the provider definition that failed to compile.
        handler: String,
        /// Description of the compile failure.
        reason: String,
    },

    /// A current-branch link was requested while HEAD is detached.
    #[error("HEAD is detached; not on a branch (try a commit link)")]
    DetachedHead,

    /// An external git invocation failed, timed out, or exited non-zero.
    #[error("`{command}` failed: {detail}")]
    ExternalCommand {
        /// The command line that was run.
        command: String,
        /// Captured stderr or spawn failure description.
        detail: String,
    },

    /// The target file does not live under the repository root.
    #[error("{} is outside the repository at {}", path.display(), root.display())]
    FileOutsideRepository {
        /// The file that was requested.
        path: PathBuf,
        /// The repository root it falls outside of.
        root: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The repository has no remote to link against.
    #[error("no remote configured in {}", root.display())]
    NoRemote {
        /// Root of the repository that has no remotes.
        root: PathBuf,
    },

    /// A default-branch link was requested, none is configured, and the
    /// remote has no recorded HEAD.
    #[error("remote `{remote}` has no recorded HEAD and no default branch is configured")]
    NoRemoteHead {
        /// Name of the remote that was queried.
        remote: String,
    },

    /// The working directory is not inside a git repository.
    #[error("not a git repository: {}", path.display())]
    NotARepository {
        /// The directory that was probed.
        path: PathBuf,
    },

    /// No configured provider's server list matches the remote URL.
    #[error("no link handler matches remote `{remote}`")]
    ServerNotMatched {
        /// The remote URL that failed to match.
        remote: String,
    },

    /// A template failed to render at request time.
    #[error("template `{template}` failed to render: {reason}")]
    Template {
        /// Reason tera reported for the failure.
        reason: String,
        /// Name of the template within its handler.
        template: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A custom server entry names a handler that is not in the catalog.
    #[error("unknown handler in custom server entry: `{name}`")]
    UnknownHandler {
        /// Handler name that was not found.
        name: String,
    },
}
