use std::path::Path;

use crate::error::Error;
use crate::types::LinkType;

/// Settings loaded from `.gitlink.toml` at the repository root.
/// A missing file yields defaults; a malformed file is an error, never a
/// silent fallback.
pub struct Config {
    /// Default branch used verbatim for default-branch links. Empty = unset,
    /// meaning "ask the remote for its recorded HEAD".
    pub default_branch: String,
    /// Default link type when a request doesn't specify one.
    pub link_type: Option<LinkType>,
    /// Preferred remote name.
    pub remote: String,
    /// Custom servers grafted onto named handlers (self-hosted instances).
    pub servers: Vec<CustomServer>,
    /// Use short commit hashes in commit links.
    pub short_hashes: bool,
}

/// One custom server entry from `[[servers]]`.
#[derive(serde::Deserialize)]
pub struct CustomServer {
    /// Name of the catalog handler this server belongs to.
    pub handler: String,
    /// HTTP base URL of the self-hosted instance.
    pub http: String,
    /// SSH forms of the self-hosted instance.
    #[serde(default)]
    pub ssh: Vec<String>,
}

/// Raw TOML structure for `.gitlink.toml`.
#[derive(serde::Deserialize)]
struct GitlinkTomlConfig {
    #[serde(default)]
    default_branch: String,
    #[serde(default)]
    link_type: Option<LinkType>,
    #[serde(default = "default_remote")]
    remote: String,
    #[serde(default)]
    servers: Vec<CustomServer>,
    #[serde(default)]
    short_hashes: bool,
}

/// The conventional remote name.
fn default_remote() -> String {
    "origin".to_string()
}

impl Default for Config {
    /// Defaults used when no config file exists: current-branch links, full
    /// hashes, `origin`, no custom servers.
    fn default() -> Self {
        Self {
            default_branch: String::new(),
            link_type: None,
            remote: default_remote(),
            servers: Vec::new(),
            short_hashes: false,
        }
    }
}

impl Config {
    /// Load config from `.gitlink.toml` in the given root directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".gitlink.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: GitlinkTomlConfig = toml::from_str(&content)?;
        Ok(Self {
            default_branch: raw.default_branch,
            link_type: raw.link_type,
            remote: raw.remote,
            servers: raw.servers,
            short_hashes: raw.short_hashes,
        })
    }
}
