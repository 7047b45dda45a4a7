/// Server matching: map a git remote URL onto a configured server definition.
use serde::Deserialize;

use crate::types::ServerUrls;

/// A hosting server: one web base URL plus the SSH host forms that map to it.
/// Static provider data, shared read-only across calls.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDefinition {
    /// HTTP(S) base URL, with or without a trailing slash.
    pub http: String,
    /// SSH forms in any of the accepted surface syntaxes:
    /// `ssh://user@host[:port]/path`, `ssh://user@host[:port]:path`,
    /// `user@host:path`, or bare `host`.
    #[serde(default)]
    pub ssh: Vec<String>,
}

/// A successful match of a remote URL against a server definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMatch {
    /// Repository path remainder: no leading `/` or `:`, no trailing `.git`.
    pub repository: String,
    /// Normalized server identity.
    pub urls: ServerUrls,
}

/// Match a remote URL against a list of servers in order; first match wins.
/// No partial or fuzzy matching. Pure function, no side effects.
pub fn match_remote(remote_url: &str, servers: &[ServerDefinition]) -> Option<ServerMatch> {
    let remote = strip_git_suffix(remote_url);
    let remote_ssh = canonical_ssh(remote);

    for server in servers {
        if let Some(found) = match_one(remote, &remote_ssh, server) {
            return Some(found);
        }
    }
    None
}

/// Try a single server definition: HTTP base first, then each SSH form.
fn match_one(remote: &str, remote_ssh: &str, server: &ServerDefinition) -> Option<ServerMatch> {
    let http_base = server.http.trim_end_matches('/');

    if let Some(rest) = strip_prefix_at_boundary(remote, http_base) {
        return Some(ServerMatch {
            repository: rest.to_string(),
            urls: ServerUrls {
                http: http_base.to_string(),
                ssh: server.ssh.first().cloned().unwrap_or_default(),
            },
        });
    }

    for ssh_form in &server.ssh {
        let canonical = canonical_ssh(ssh_form);
        if let Some(rest) = strip_prefix_at_boundary(remote_ssh, &canonical) {
            return Some(ServerMatch {
                repository: rest.to_string(),
                urls: ServerUrls {
                    http: http_base.to_string(),
                    ssh: ssh_form.clone(),
                },
            });
        }
    }
    None
}

/// Strip a trailing `.git` suffix and any trailing path separator.
fn strip_git_suffix(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed.trim_end_matches('/')
}

/// Reduce an SSH URL (or configured SSH form) to `host[:port]/path`.
///
/// The `ssh://` scheme and `user@` segment are optional and interchangeable;
/// a colon introducing the path is equivalent to a slash. A colon followed by
/// digits (up to a `/`, `:`, or end) is kept as a port so `host:2222/path`
/// and a server configured as `ssh://host:2222` line up.
fn canonical_ssh(url: &str) -> String {
    let rest = url.strip_prefix("ssh://").unwrap_or(url);
    let rest = strip_user(rest);

    let Some(colon) = rest.find(':') else {
        return rest.trim_end_matches('/').to_string();
    };

    let (host, after) = rest.split_at(colon);
    let after = after.trim_start_matches(':');
    let digits = after.bytes().take_while(u8::is_ascii_digit).count();
    let is_port = digits > 0
        && after
            .as_bytes()
            .get(digits)
            .is_none_or(|b| *b == b'/' || *b == b':');

    if is_port {
        let (port, path) = after.split_at(digits);
        let path = path.trim_start_matches([':', '/']).trim_end_matches('/');
        if path.is_empty() {
            format!("{host}:{port}")
        } else {
            format!("{host}:{port}/{path}")
        }
    } else {
        let path = after.trim_start_matches('/').trim_end_matches('/');
        if path.is_empty() {
            host.trim_end_matches('/').to_string()
        } else {
            format!("{host}/{path}")
        }
    }
}

/// Drop a `user@` prefix when the `@` sits before the host ends.
fn strip_user(rest: &str) -> &str {
    let Some(at) = rest.find('@') else {
        return rest;
    };
    let host_end = rest.find(['/', ':']).unwrap_or(rest.len());
    if at < host_end {
        rest.get(at.saturating_add(1)..).unwrap_or(rest)
    } else {
        rest
    }
}

/// Strip `prefix` from `s` only at a path-component boundary.
/// The remainder comes back with leading separators removed, so a matched
/// remote yields a clean repository path fragment like `foo/bar`.
///
/// Both sides are already canonical here: path separators are `/` and any
/// remaining `:` marks a port, which must be part of the matched prefix.
fn strip_prefix_at_boundary<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let rest = s.strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some("");
    }
    if rest.starts_with('/') {
        return Some(rest.trim_start_matches('/'));
    }
    None
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    fn server(http: &str, ssh: &[&str]) -> ServerDefinition {
        ServerDefinition {
            http: http.to_string(),
            ssh: ssh.iter().map(|s| return (*s).to_string()).collect(),
        }
    }

    #[test]
    fn http_base_with_and_without_trailing_slash() {
        for base in ["http://example.com/", "http://example.com"] {
            let found = match_remote("http://example.com/foo/bar", &[server(base, &[])])
                .expect("should match");
            assert_eq!(found.repository, "foo/bar");
            assert_eq!(found.urls.http, "http://example.com");
        }
    }

    #[test]
    fn ssh_surface_forms_are_equivalent() {
        let remotes = [
            "ssh://git@example.com:foo/bar",
            "ssh://git@example.com/foo/bar",
            "git@example.com:foo/bar",
        ];
        let prefixes = [
            "ssh://git@example.com",
            "ssh://git@example.com/",
            "ssh://git@example.com:",
            "example.com",
        ];
        for remote in remotes {
            for prefix in prefixes {
                let found = match_remote(remote, &[server("https://example.com", &[prefix])])
                    .unwrap_or_else(|| panic!("{remote} should match prefix {prefix}"));
                assert_eq!(found.repository, "foo/bar", "{remote} vs {prefix}");
                assert_eq!(found.urls.http, "https://example.com");
            }
        }
    }

    #[test]
    fn git_suffix_is_always_stripped() {
        let servers = [server("https://example.com", &["git@example.com"])];
        let http = match_remote("https://example.com/foo/bar.git", &servers).expect("http form");
        assert_eq!(http.repository, "foo/bar");
        let ssh = match_remote("git@example.com:foo/bar.git", &servers).expect("ssh form");
        assert_eq!(ssh.repository, "foo/bar");
    }

    #[test]
    fn port_is_part_of_the_host() {
        let servers = [server("https://example.com", &["ssh://git@example.com:2222"])];
        let found =
            match_remote("ssh://git@example.com:2222/foo/bar", &servers).expect("port form");
        assert_eq!(found.repository, "foo/bar");

        // Without the port in the configured form there is no match.
        let plain = [server("https://example.com", &["ssh://git@example.com"])];
        assert!(match_remote("ssh://git@example.com:2222/foo/bar", &plain).is_none());
    }

    #[test]
    fn host_prefix_requires_component_boundary() {
        let servers = [server("https://example.com", &["example.com"])];
        assert!(match_remote("git@example.company.com:foo/bar", &servers).is_none());
    }

    #[test]
    fn first_server_in_list_order_wins() {
        let servers = [
            server("https://one.example.com", &["example.com"]),
            server("https://two.example.com", &["example.com"]),
        ];
        let found = match_remote("git@example.com:foo/bar", &servers).expect("should match");
        assert_eq!(found.urls.http, "https://one.example.com");
    }

    #[test]
    fn unrecognized_remote_does_not_match() {
        let servers = [server("https://example.com", &["git@example.com"])];
        assert!(match_remote("https://other.example.org/foo/bar", &servers).is_none());
    }

    #[test]
    fn matched_ssh_form_is_reported() {
        let servers = [server(
            "https://example.com",
            &["ssh://git@example.com", "git@example.com"],
        )];
        let found = match_remote("git@example.com:foo/bar", &servers).expect("should match");
        assert_eq!(found.urls.ssh, "ssh://git@example.com");
    }
}
