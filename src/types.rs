/// Core domain types for links, selections, and reverse-parse results.
use std::path::PathBuf;

/// How a handler wants branch names spelled in rendered URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchRef {
    /// Short name, e.g. `main`.
    #[default]
    Abbreviated,
    /// Full ref, e.g. `refs/heads/main`.
    Full,
}

/// The file being linked, with an optional selection range.
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Repository-relative path with forward slashes.
    pub path: String,
    /// Selected range within the file, if any.
    pub selection: Option<SelectedRange>,
}

/// Which git ref a link should pin to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    /// Pin to the current commit hash.
    Commit,
    /// Pin to the currently checked-out branch.
    #[serde(rename = "branch")]
    #[value(name = "branch")]
    CurrentBranch,
    /// Pin to the remote's default branch.
    DefaultBranch,
}

impl LinkType {
    /// The serialized name exposed to templates as `type`.
    pub fn label(self) -> &'static str {
        return match self {
            LinkType::Commit => "commit",
            LinkType::CurrentBranch => "branch",
            LinkType::DefaultBranch => "default-branch",
        };
    }
}

/// A configured remote of the working copy.
#[derive(Debug, Clone)]
pub struct Remote {
    /// Remote name, e.g. `origin`.
    pub name: String,
    /// Remote URL exactly as git reports it. Never empty.
    pub url: String,
}

/// Read-only snapshot of the working copy being linked.
#[derive(Debug, Clone)]
pub struct Repository {
    /// The remote links are built against.
    pub remote: Remote,
    /// Absolute path of the working copy root.
    pub root: PathBuf,
}

/// A line/column selection. All fields optional; absence means
/// "not specified", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SelectedRange {
    /// One-based end column.
    pub end_column: Option<u32>,
    /// One-based end line.
    pub end_line: Option<u32>,
    /// One-based start column.
    pub start_column: Option<u32>,
    /// One-based start line.
    pub start_line: Option<u32>,
}

impl SelectedRange {
    /// Whether any field is set.
    pub fn is_empty(&self) -> bool {
        return self.start_line.is_none()
            && self.start_column.is_none()
            && self.end_line.is_none()
            && self.end_column.is_none();
    }
}

/// Normalized web and SSH identity of a matched server.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ServerUrls {
    /// HTTP base URL without a trailing slash.
    pub http: String,
    /// SSH form that matched, or the server's first configured form.
    /// Empty when the server has no SSH forms.
    pub ssh: String,
}

/// Result of reverse-parsing a provider URL.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UrlInfo {
    /// Repository-relative file path extracted from the URL.
    pub file_path: String,
    /// Selection range extracted from the URL, field by field.
    pub selection: SelectedRange,
    /// Server identity rendered from the reverse templates.
    pub server: ServerUrls,
}
