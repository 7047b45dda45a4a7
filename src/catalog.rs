/// The provider catalog: every known handler, compiled once, tried in order.
use serde::Deserialize;

use crate::config::Config;
use crate::error::Error;
use crate::handler::{HandlerDefinition, LinkHandler};
use crate::refs;
use crate::server::{ServerDefinition, ServerMatch};
use crate::types::{FileInfo, LinkType, Repository, UrlInfo};

/// Built-in provider definitions, embedded at compile time.
const BUILTIN: &str = include_str!("handlers.toml");

/// Top-level structure of the catalog TOML.
#[derive(Deserialize)]
struct CatalogFile {
    /// Handler definitions in priority order.
    handlers: Vec<HandlerDefinition>,
}

/// The ordered collection of compiled link handlers.
pub struct Catalog {
    /// Handlers in match priority order.
    handlers: Vec<LinkHandler>,
}

impl Catalog {
    /// Load the built-in catalog and graft on any custom servers from the
    /// config. Custom servers are appended after the built-in servers of
    /// their handler, so stock hosts keep priority.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` for malformed catalog data,
    /// `Error::UnknownHandler` when a custom server names a handler the
    /// catalog doesn't have, or `Error::CatalogInvalid` when a definition
    /// fails to compile.
    pub fn load(config: &Config) -> Result<Self, Error> {
        let mut file: CatalogFile = toml::from_str(BUILTIN)?;

        for custom in &config.servers {
            let Some(definition) = file.handlers.iter_mut().find(|h| h.name == custom.handler)
            else {
                return Err(Error::UnknownHandler {
                    name: custom.handler.clone(),
                });
            };
            definition.servers.push(ServerDefinition {
                http: custom.http.clone(),
                ssh: custom.ssh.clone(),
            });
        }

        let handlers = file
            .handlers
            .into_iter()
            .map(LinkHandler::compile)
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self { handlers })
    }

    /// Find the first handler whose servers match the remote URL.
    pub fn find_handler(&self, remote_url: &str) -> Option<(&LinkHandler, ServerMatch)> {
        self.handlers
            .iter()
            .find_map(|h| h.match_remote(remote_url).map(|m| return (h, m)))
    }

    /// Reverse-lookup: the first handler that parses the URL.
    pub fn find_for_url(&self, url: &str, strict: bool) -> Option<(&LinkHandler, UrlInfo)> {
        self.handlers
            .iter()
            .find_map(|h| h.url_info(url, strict).map(|info| return (h, info)))
    }

    /// Handlers in catalog order.
    pub fn handlers(&self) -> &[LinkHandler] {
        &self.handlers
    }
}

/// Build the web URL for a file in the working copy: pick the handler for
/// the remote, resolve the ref, render.
///
/// # Errors
///
/// Returns `Error::ServerNotMatched` when no handler recognizes the remote,
/// plus anything ref resolution or rendering can fail with: `DetachedHead`,
/// `NoRemoteHead`, `ExternalCommand`, `Template`.
pub fn create_url(
    catalog: &Catalog,
    repo: &Repository,
    config: &Config,
    file: &FileInfo,
    requested: Option<LinkType>,
) -> Result<String, Error> {
    let Some((handler, matched)) = catalog.find_handler(&repo.remote.url) else {
        return Err(Error::ServerNotMatched {
            remote: repo.remote.url.clone(),
        });
    };
    let reference = refs::resolve(repo, config, handler.branch_ref(), requested)?;
    handler.create_url(&matched, &reference, file)
}
