/// The link handler: one provider's compiled matching and rendering rules.
use regex::{Captures, Regex};
use serde::Deserialize;
use tera::Context;

use crate::error::Error;
use crate::refs::ResolvedRef;
use crate::server::{self, ServerDefinition, ServerMatch};
use crate::template::TemplateSet;
use crate::types::{BranchRef, FileInfo, LinkType, SelectedRange, ServerUrls, UrlInfo};

/// Template name for the forward URL body.
const URL: &str = "url";
/// Template name for the reverse file path.
const REVERSE_FILE: &str = "reverse.file";
/// Template name for the reverse HTTP server identity.
const REVERSE_HTTP: &str = "reverse.server.http";
/// Template name for the reverse SSH server identity.
const REVERSE_SSH: &str = "reverse.server.ssh";
/// Template names for the four reverse selection fields, in
/// (start_line, start_column, end_line, end_column) order.
const REVERSE_SELECTION: [&str; 4] = [
    "reverse.selection.start_line",
    "reverse.selection.start_column",
    "reverse.selection.end_line",
    "reverse.selection.end_column",
];

/// Declarative handler definition as it appears in the catalog TOML.
/// Loaded once at startup, immutable, reused across every request.
#[derive(Debug, Deserialize)]
pub struct HandlerDefinition {
    /// How this provider spells branch refs.
    #[serde(default)]
    pub branch_ref: BranchRef,
    /// Provider name, e.g. `github`.
    pub name: String,
    /// Link types whose selection range is left out of the rendered URL.
    #[serde(default)]
    pub omit_selection_for: Vec<LinkType>,
    /// Conditional query parameters, applied in declaration order.
    #[serde(default)]
    pub query: Vec<QueryModification>,
    /// Settings for reverse URL parsing.
    pub reverse: ReverseSettings,
    /// Servers this provider is reachable at. Never empty.
    pub servers: Vec<ServerDefinition>,
    /// Forward URL template.
    pub url: String,
}

/// A query parameter appended when the file path matches a pattern.
#[derive(Debug, Deserialize)]
pub struct QueryModification {
    /// Query parameter name.
    pub param: String,
    /// Pattern tested against the repository-relative file path.
    pub pattern: String,
    /// Template for the parameter value.
    pub value: String,
}

/// Reverse-parse settings: pattern plus field extraction templates.
#[derive(Debug, Deserialize)]
pub struct ReverseSettings {
    /// Template producing the repository-relative file path.
    pub file: String,
    /// Regex with named capture groups, tested against candidate URLs.
    pub pattern: String,
    /// Templates for selection fields; each independently optional.
    #[serde(default)]
    pub selection: ReverseSelection,
    /// Templates for the matched server identity.
    pub server: ReverseServer,
}

/// Optional templates for the four selection fields.
#[derive(Debug, Default, Deserialize)]
pub struct ReverseSelection {
    /// Template for the end column.
    pub end_column: Option<String>,
    /// Template for the end line.
    pub end_line: Option<String>,
    /// Template for the start column.
    pub start_column: Option<String>,
    /// Template for the start line.
    pub start_line: Option<String>,
}

/// Templates for the server identity recovered from a URL.
#[derive(Debug, Deserialize)]
pub struct ReverseServer {
    /// Template for the HTTP base.
    pub http: String,
    /// Template for the SSH form.
    pub ssh: String,
}

/// A compiled handler: definition data with patterns and templates parsed,
/// ready to serve any number of concurrent requests.
pub struct LinkHandler {
    /// How this provider spells branch refs.
    branch_ref: BranchRef,
    /// Provider name.
    name: String,
    /// Link types that drop the selection from the URL.
    omit_selection_for: Vec<LinkType>,
    /// Compiled query modification patterns, paired with parameter names.
    /// Value templates live in `templates` under `query.<index>`.
    query: Vec<(Regex, String)>,
    /// Compiled reverse pattern.
    reverse_pattern: Regex,
    /// Server list, in match priority order.
    servers: Vec<ServerDefinition>,
    /// All templates of this handler, parsed once.
    templates: TemplateSet,
}

impl LinkHandler {
    /// Compile a definition: parse every pattern and template up front so
    /// request-time work is pure rendering.
    ///
    /// # Errors
    ///
    /// Returns `Error::CatalogInvalid` naming the handler when any pattern
    /// or template fails to compile, or when the server list is empty.
    pub fn compile(def: HandlerDefinition) -> Result<Self, Error> {
        if def.servers.is_empty() {
            return Err(Error::CatalogInvalid {
                handler: def.name,
                reason: "server list is empty".to_string(),
            });
        }

        let mut templates = TemplateSet::new(&def.name);
        templates.add(URL, &def.url)?;
        templates.add(REVERSE_FILE, &def.reverse.file)?;
        templates.add(REVERSE_HTTP, &def.reverse.server.http)?;
        templates.add(REVERSE_SSH, &def.reverse.server.ssh)?;

        let selection = [
            def.reverse.selection.start_line.as_deref(),
            def.reverse.selection.start_column.as_deref(),
            def.reverse.selection.end_line.as_deref(),
            def.reverse.selection.end_column.as_deref(),
        ];
        for (name, source) in REVERSE_SELECTION.iter().zip(selection) {
            if let Some(source) = source {
                templates.add(name, source)?;
            }
        }

        let mut query = Vec::with_capacity(def.query.len());
        for (index, modification) in def.query.iter().enumerate() {
            let pattern = compile_pattern(&def.name, &modification.pattern)?;
            templates.add(&format!("query.{index}"), &modification.value)?;
            query.push((pattern, modification.param.clone()));
        }

        let reverse_pattern = compile_pattern(&def.name, &def.reverse.pattern)?;

        Ok(Self {
            branch_ref: def.branch_ref,
            name: def.name,
            omit_selection_for: def.omit_selection_for,
            query,
            reverse_pattern,
            servers: def.servers,
            templates,
        })
    }

    /// Branch ref spelling for this provider.
    pub fn branch_ref(&self) -> BranchRef {
        self.branch_ref
    }

    /// Provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match a remote URL against this handler's servers.
    pub fn match_remote(&self, remote_url: &str) -> Option<ServerMatch> {
        server::match_remote(remote_url, &self.servers)
    }

    /// Build the forward URL for a file at a resolved ref.
    ///
    /// All-or-nothing: any failure surfaces as an error, never as a partial
    /// or guessed URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` if a template fails to render.
    pub fn create_url(
        &self,
        matched: &ServerMatch,
        reference: &ResolvedRef,
        file: &FileInfo,
    ) -> Result<String, Error> {
        let context = self.forward_context(matched, reference, file);
        let url = self.templates.render(URL, &context)?;
        self.apply_query_modifications(url, &file.path, &context)
    }

    /// Reverse-parse a URL into file path, server identity and selection.
    ///
    /// In strict mode the URL must first match one of this handler's servers
    /// before the pattern is even tried. Malformed selection values degrade
    /// to absent per field; they never fail the parse.
    pub fn url_info(&self, url: &str, strict: bool) -> Option<UrlInfo> {
        if strict && server::match_remote(url, &self.servers).is_none() {
            return None;
        }

        let captures = self.reverse_pattern.captures(url)?;
        let context = reverse_context(&self.reverse_pattern, &captures);

        let file_path = self.templates.render(REVERSE_FILE, &context).ok()?;
        let server = ServerUrls {
            http: self
                .templates
                .render(REVERSE_HTTP, &context)
                .unwrap_or_default(),
            ssh: self
                .templates
                .render(REVERSE_SSH, &context)
                .unwrap_or_default(),
        };
        let [start_line, start_column, end_line, end_column] =
            REVERSE_SELECTION.map(|name| return self.templates.render_field(name, &context));

        Some(UrlInfo {
            file_path,
            selection: SelectedRange {
                end_column,
                end_line,
                start_column,
                start_line,
            },
            server,
        })
    }

    /// Build the forward rendering context. Selection fields are populated
    /// as numbers when present and empty strings otherwise, so conditionals
    /// test them safely and nothing in the vocabulary is ever undefined.
    fn forward_context(
        &self,
        matched: &ServerMatch,
        reference: &ResolvedRef,
        file: &FileInfo,
    ) -> Context {
        let mut context = Context::new();
        context.insert("base", &matched.urls.http);
        context.insert("ssh", &matched.urls.ssh);
        context.insert("repository", &matched.repository);
        context.insert("ref", &reference.name);
        context.insert("type", reference.link_type.label());
        context.insert("file", &file.path);

        let selection = file
            .selection
            .filter(|_s| !self.omit_selection_for.contains(&reference.link_type))
            .unwrap_or_default();
        insert_field(&mut context, "start_line", selection.start_line);
        insert_field(&mut context, "start_column", selection.start_column);
        insert_field(&mut context, "end_line", selection.end_line);
        insert_field(&mut context, "end_column", selection.end_column);
        context
    }

    /// Append each matching query modification, in declaration order.
    /// Parameters land before any URL fragment; duplicate keys are allowed.
    fn apply_query_modifications(
        &self,
        mut url: String,
        file_path: &str,
        context: &Context,
    ) -> Result<String, Error> {
        for (index, (pattern, param)) in self.query.iter().enumerate() {
            if !pattern.is_match(file_path) {
                continue;
            }
            let value = self.templates.render(&format!("query.{index}"), context)?;
            url = insert_query_param(&url, param, &value);
        }
        Ok(url)
    }
}

/// Insert a selection field as a number when present, or an empty string
/// so template conditionals see a defined, falsy value.
fn insert_field(context: &mut Context, name: &str, value: Option<u32>) {
    match value {
        Some(number) => context.insert(name, &number),
        None => context.insert(name, ""),
    }
}

/// Compile one regex, attributing failures to the handler.
fn compile_pattern(handler: &str, pattern: &str) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|e| Error::CatalogInvalid {
        handler: handler.to_string(),
        reason: format!("pattern `{pattern}`: {e}"),
    })
}

/// Insert `key=value` into a URL's query string, before any `#` fragment.
fn insert_query_param(url: &str, key: &str, value: &str) -> String {
    let (head, fragment) = match url.find('#') {
        Some(index) => url.split_at(index),
        None => (url, ""),
    };
    let separator = if head.contains('?') { '&' } else { '?' };
    format!("{head}{separator}{key}={value}{fragment}")
}

/// Build the reverse rendering context: every named capture group of the
/// pattern appears under `match.groups.<name>`, with non-participating
/// groups as empty strings so no lookup is ever undefined.
fn reverse_context(pattern: &Regex, captures: &Captures<'_>) -> Context {
    let groups: std::collections::HashMap<&str, &str> = pattern
        .capture_names()
        .flatten()
        .map(|name| {
            let value = captures.name(name).map_or("", |m| return m.as_str());
            (name, value)
        })
        .collect();

    let mut context = Context::new();
    context.insert("match", &serde_json::json!({ "groups": groups }));
    context
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc)]
mod tests {
    use super::*;

    fn test_definition() -> HandlerDefinition {
        let toml = r#"
name = "example"
url = '{{ base }}/{{ repository }}/blob/{{ ref }}/{{ file }}{% if start_line %}#L{{ start_line }}{% if end_line %}-L{{ end_line }}{% endif %}{% endif %}'

[[query]]
pattern = '\.txt$'
param = "first"
value = "yes"

[[query]]
pattern = '\.txt$'
param = "second"
value = "no"

[reverse]
pattern = '^https?://(?P<host>[^/]+)/(?P<org>[^/]+)/(?P<repo>[^/]+)/blob/[^/]+/(?P<path>[^?#]+)(?:\?[^#]*)?(?:#L(?P<start>\d+)(?:-L(?P<end>\d+))?)?'
file = '{{ match.groups.path }}'

[reverse.server]
http = 'https://{{ match.groups.host }}'
ssh = 'git@{{ match.groups.host }}'

[reverse.selection]
start_line = '{{ match.groups.start }}'
end_line = '{{ match.groups.end }}'

[[servers]]
http = "https://example.com"
ssh = ["git@example.com"]
"#;
        toml::from_str(toml).expect("definition should parse")
    }

    fn handler() -> LinkHandler {
        LinkHandler::compile(test_definition()).expect("definition should compile")
    }

    fn reference(link_type: LinkType, name: &str) -> ResolvedRef {
        ResolvedRef {
            link_type,
            name: name.to_string(),
        }
    }

    fn file(path: &str, selection: Option<SelectedRange>) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            selection,
        }
    }

    fn matched() -> ServerMatch {
        server::match_remote("git@example.com:foo/bar.git", &handler().servers)
            .expect("remote should match")
    }

    #[test]
    fn renders_forward_url_without_selection() {
        let url = handler()
            .create_url(
                &matched(),
                &reference(LinkType::CurrentBranch, "main"),
                &file("src/lib.rs", None),
            )
            .expect("create_url");
        assert_eq!(url, "https://example.com/foo/bar/blob/main/src/lib.rs");
    }

    #[test]
    fn renders_selection_suffix() {
        let selection = SelectedRange {
            start_line: Some(3),
            end_line: Some(7),
            ..SelectedRange::default()
        };
        let url = handler()
            .create_url(
                &matched(),
                &reference(LinkType::CurrentBranch, "main"),
                &file("src/lib.rs", Some(selection)),
            )
            .expect("create_url");
        assert_eq!(url, "https://example.com/foo/bar/blob/main/src/lib.rs#L3-L7");
    }

    #[test]
    fn query_modifications_append_in_declaration_order() {
        let url = handler()
            .create_url(
                &matched(),
                &reference(LinkType::CurrentBranch, "main"),
                &file("foo/bar.txt", None),
            )
            .expect("create_url");
        assert_eq!(
            url,
            "https://example.com/foo/bar/blob/main/foo/bar.txt?first=yes&second=no"
        );
    }

    #[test]
    fn query_lands_before_the_fragment() {
        let selection = SelectedRange {
            start_line: Some(1),
            end_line: Some(10),
            ..SelectedRange::default()
        };
        let url = handler()
            .create_url(
                &matched(),
                &reference(LinkType::CurrentBranch, "main"),
                &file("foo/bar.txt", Some(selection)),
            )
            .expect("create_url");
        assert_eq!(
            url,
            "https://example.com/foo/bar/blob/main/foo/bar.txt?first=yes&second=no#L1-L10"
        );
    }

    #[test]
    fn insert_query_param_cases() {
        assert_eq!(
            insert_query_param("http://example.com/file", "first", "yes"),
            "http://example.com/file?first=yes"
        );
        assert_eq!(
            insert_query_param("http://example.com/file?first=yes", "second", "no"),
            "http://example.com/file?first=yes&second=no"
        );
        assert_eq!(
            insert_query_param("http://example.com/file#L1-10", "first", "yes"),
            "http://example.com/file?first=yes#L1-10"
        );
    }

    #[test]
    fn selection_can_be_omitted_per_link_type() {
        let mut def = test_definition();
        def.omit_selection_for = vec![LinkType::DefaultBranch];
        let handler = LinkHandler::compile(def).expect("compile");
        let selection = SelectedRange {
            start_line: Some(3),
            ..SelectedRange::default()
        };

        let url = handler
            .create_url(
                &matched(),
                &reference(LinkType::DefaultBranch, "main"),
                &file("src/lib.rs", Some(selection)),
            )
            .expect("create_url");
        assert_eq!(url, "https://example.com/foo/bar/blob/main/src/lib.rs");

        let url = handler
            .create_url(
                &matched(),
                &reference(LinkType::CurrentBranch, "main"),
                &file("src/lib.rs", Some(selection)),
            )
            .expect("create_url");
        assert_eq!(url, "https://example.com/foo/bar/blob/main/src/lib.rs#L3");
    }

    #[test]
    fn reverse_extracts_path_server_and_selection() {
        let info = handler()
            .url_info("https://example.com/foo/bar/blob/main/src/lib.rs#L3-L7", true)
            .expect("should parse");
        assert_eq!(info.file_path, "src/lib.rs");
        assert_eq!(info.server.http, "https://example.com");
        assert_eq!(info.server.ssh, "git@example.com");
        assert_eq!(info.selection.start_line, Some(3));
        assert_eq!(info.selection.end_line, Some(7));
        assert_eq!(info.selection.start_column, None);
        assert_eq!(info.selection.end_column, None);
    }

    #[test]
    fn reverse_selection_fields_degrade_independently() {
        // End group absent: start parses, end is None.
        let info = handler()
            .url_info("https://example.com/foo/bar/blob/main/src/lib.rs#L3", true)
            .expect("should parse");
        assert_eq!(info.selection.start_line, Some(3));
        assert_eq!(info.selection.end_line, None);
    }

    #[test]
    fn strict_mode_requires_a_server_match() {
        // Same shape, different host: strict refuses before the pattern runs.
        let url = "https://other.example.org/foo/bar/blob/main/src/lib.rs";
        assert!(handler().url_info(url, true).is_none());
        // Non-strict mode lets the pattern decide.
        let info = handler().url_info(url, false).expect("loose parse");
        assert_eq!(info.file_path, "src/lib.rs");
        assert_eq!(info.server.http, "https://other.example.org");
    }

    #[test]
    fn reverse_returns_none_when_pattern_fails() {
        assert!(handler()
            .url_info("https://example.com/not-a-file-url", false)
            .is_none());
    }

    #[test]
    fn empty_server_list_fails_to_compile() {
        let mut def = test_definition();
        def.servers.clear();
        assert!(matches!(
            LinkHandler::compile(def),
            Err(Error::CatalogInvalid { .. })
        ));
    }

    #[test]
    fn bad_reverse_pattern_fails_to_compile() {
        let mut def = test_definition();
        def.reverse.pattern = "(".to_string();
        assert!(matches!(
            LinkHandler::compile(def),
            Err(Error::CatalogInvalid { .. })
        ));
    }

    #[test]
    fn non_numeric_selection_render_degrades_to_absent() {
        let mut def = test_definition();
        // A template that renders a non-numeric value for the start line.
        def.reverse.selection.start_line = Some("x".to_string());
        let handler = LinkHandler::compile(def).expect("compile");
        let info = handler
            .url_info("https://example.com/foo/bar/blob/main/src/lib.rs#L3-L7", true)
            .expect("should parse");
        assert_eq!(info.selection.start_line, None);
        assert_eq!(info.selection.end_line, Some(7));
    }
}
