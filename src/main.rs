mod catalog;
mod config;
mod error;
mod git;
mod handler;
mod paths;
mod refs;
mod server;
mod template;
mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::types::{FileInfo, LinkType, Repository, SelectedRange};

#[derive(Parser)]
#[command(name = "gitlink", about = "Web links for files in a git working copy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a web link for a file in the current repository
    Url {
        /// File to link to
        file: PathBuf,
        /// Start of the selection, as LINE or LINE:COLUMN
        #[arg(short, long)]
        line: Option<String>,
        /// End of the selection, as LINE or LINE:COLUMN
        #[arg(short, long)]
        end: Option<String>,
        /// Which ref to pin the link to (defaults to the configured type)
        #[arg(long = "type", value_name = "TYPE")]
        link_type: Option<LinkType>,
        /// Remote to link against (defaults to the configured remote)
        #[arg(long)]
        remote: Option<String>,
    },
    /// Parse a provider URL back into a file path and selection
    Parse {
        /// The URL to parse
        url: String,
        /// Try reverse patterns even when no configured server matches
        #[arg(long)]
        loose: bool,
        /// Emit the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the known link handlers in match order
    Handlers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Url {
            file,
            line,
            end,
            link_type,
            remote,
        } => cmd_url(&file, line.as_deref(), end.as_deref(), link_type, remote),
        Commands::Parse { url, loose, json } => cmd_parse(&url, loose, json),
        Commands::Handlers => cmd_handlers(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Build and print the forward link.
///
/// # Errors
///
/// Returns errors from repository discovery, ref resolution, or rendering.
fn cmd_url(
    file: &Path,
    line: Option<&str>,
    end: Option<&str>,
    link_type: Option<LinkType>,
    remote: Option<String>,
) -> Result<(), error::Error> {
    let cwd = std::env::current_dir()?;
    let root = git::discover_root(&cwd)?;
    let config = Config::load(&root)?;
    let catalog = Catalog::load(&config)?;

    let remote_name = remote.unwrap_or_else(|| return config.remote.clone());
    let remote = git::select_remote(&root, &remote_name)?;
    let repo = Repository {
        remote,
        root: root.clone(),
    };

    let info = FileInfo {
        path: paths::repo_relative(&root, file)?,
        selection: parse_selection(line, end),
    };

    let url = catalog::create_url(&catalog, &repo, &config, &info, link_type)?;
    println!("{url}");
    Ok(())
}

/// Reverse-parse a URL and print what it points at.
///
/// # Errors
///
/// Returns errors from catalog loading; an unparseable URL is a failure too.
fn cmd_parse(url: &str, loose: bool, json: bool) -> Result<(), error::Error> {
    // Custom servers only apply when run inside a repository with a config.
    let config = match std::env::current_dir().map_err(error::Error::Io).and_then(
        |cwd| return git::discover_root(&cwd),
    ) {
        Ok(root) => Config::load(&root)?,
        Err(_) => Config::default(),
    };
    let catalog = Catalog::load(&config)?;

    let Some((handler, info)) = catalog.find_for_url(url, !loose) else {
        return Err(error::Error::ServerNotMatched {
            remote: url.to_string(),
        });
    };

    if json {
        let payload = serde_json::json!({
            "handler": handler.name(),
            "file": info.file_path,
            "selection": info.selection,
            "server": info.server,
        });
        println!("{payload}");
        return Ok(());
    }

    println!("handler: {}", handler.name());
    println!("file:    {}", info.file_path);
    if let Some(start) = info.selection.start_line {
        match info.selection.end_line {
            Some(end) if end != start => println!("lines:   {start}-{end}"),
            _ => println!("lines:   {start}"),
        }
    }
    println!("server:  {}", info.server.http);
    Ok(())
}

/// List catalog handlers in match order.
///
/// # Errors
///
/// Returns errors from catalog loading.
fn cmd_handlers() -> Result<(), error::Error> {
    let catalog = Catalog::load(&Config::default())?;
    for handler in catalog.handlers() {
        println!("{}", handler.name());
    }
    Ok(())
}

/// Parse `--line` / `--end` arguments into a selection range.
/// Each argument is `LINE` or `LINE:COLUMN`; malformed values are ignored
/// field by field rather than failing the whole request.
fn parse_selection(line: Option<&str>, end: Option<&str>) -> Option<SelectedRange> {
    let (start_line, start_column) = split_position(line);
    let (end_line, end_column) = split_position(end);

    let selection = SelectedRange {
        end_column,
        end_line,
        start_column,
        start_line,
    };
    if selection.is_empty() { None } else { Some(selection) }
}

/// Split a `LINE[:COLUMN]` argument into its numeric parts.
fn split_position(arg: Option<&str>) -> (Option<u32>, Option<u32>) {
    let Some(arg) = arg else {
        return (None, None);
    };
    match arg.split_once(':') {
        Some((line, column)) => (line.trim().parse().ok(), column.trim().parse().ok()),
        None => (arg.trim().parse().ok(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_line_and_column() {
        let selection = parse_selection(Some("3:5"), Some("7:9")).expect("selection");
        assert_eq!(selection.start_line, Some(3));
        assert_eq!(selection.start_column, Some(5));
        assert_eq!(selection.end_line, Some(7));
        assert_eq!(selection.end_column, Some(9));
    }

    #[test]
    fn selection_line_only() {
        let selection = parse_selection(Some("12"), None).expect("selection");
        assert_eq!(selection.start_line, Some(12));
        assert_eq!(selection.start_column, None);
        assert_eq!(selection.end_line, None);
    }

    #[test]
    fn malformed_positions_degrade_per_field() {
        let selection = parse_selection(Some("x:5"), None).expect("selection");
        assert_eq!(selection.start_line, None);
        assert_eq!(selection.start_column, Some(5));
    }

    #[test]
    fn no_positions_means_no_selection() {
        assert!(parse_selection(None, None).is_none());
        assert!(parse_selection(Some("x"), None).is_none());
    }
}
