use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;

use crate::method::Method;
use crate::router::{DuplicatePolicy, RouteTrie};

/// Inspect and test route tables.
#[derive(Debug, Parser)]
#[command(name = "lenna-routes", version)]
#[command(about = "Inspect lenna route tables", long_about = None)]
pub struct Cli {
    /// Log filter for diagnostics on stderr
    #[arg(long, env = "LENNA_LOG_LEVEL", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print every route in the table
    Routes {
        /// Route table (TOML)
        #[arg(short, long)]
        table: PathBuf,
    },
    /// Resolve METHOD PATH against the table
    Match {
        /// Route table (TOML)
        #[arg(short, long)]
        table: PathBuf,

        /// HTTP method, case-insensitive
        method: String,

        /// Request path
        path: String,

        /// Replace duplicate routes instead of failing
        #[arg(long, default_value_t = false)]
        allow_duplicates: bool,
    },
}

/// One `[[route]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub handler: String,
}

/// A TOML route table:
///
/// ```toml
/// [[route]]
/// method = "GET"
/// path = "/users/:id"
/// handler = "show_user"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteTable {
    #[serde(rename = "route", default)]
    pub routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse route table")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Invalid route table {}", path.display()))
    }
}

/// Build a frozen trie mapping each route to its handler name.
pub fn build_trie(table: &RouteTable, policy: DuplicatePolicy) -> Result<RouteTrie<String>> {
    let mut trie = RouteTrie::with_policy(policy);
    for (index, route) in table.routes.iter().enumerate() {
        trie.insert(route.method, &route.path, route.handler.clone())
            .with_context(|| format!("route #{} ({} {})", index + 1, route.method, route.path))?;
    }
    trie.freeze();
    Ok(trie)
}

/// One line per route: method, pattern and handler name.
#[must_use]
pub fn format_routes(trie: &RouteTrie<String>) -> String {
    let width = trie
        .routes()
        .iter()
        .map(|(_, pattern)| pattern.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (method, pattern) in trie.routes() {
        let handler = trie
            .lookup(*method, pattern)
            .map_or("?", |m| m.handler.as_str());
        let _ = writeln!(out, "{:<7} {pattern:<width$}  {handler}", method.as_str());
    }
    out
}

/// Handler name and captures for `method path`, or `no match`.
#[must_use]
pub fn format_match(trie: &RouteTrie<String>, method: &str, path: &str) -> String {
    match trie.match_route(method, path) {
        Some(m) => {
            let mut out = m.handler.clone();
            for (name, value) in &m.path_params {
                let _ = write!(out, " {name}={value}");
            }
            out
        }
        None => "no match".to_string(),
    }
}

/// Execute a parsed command, printing its result to stdout.
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Routes { table } => {
            let trie = build_trie(&RouteTable::load(&table)?, DuplicatePolicy::Reject)?;
            info!(routes_count = trie.len(), table = %table.display(), "Route table loaded");
            print!("{}", format_routes(&trie));
        }
        Commands::Match {
            table,
            method,
            path,
            allow_duplicates,
        } => {
            let policy = if allow_duplicates {
                DuplicatePolicy::Overwrite
            } else {
                DuplicatePolicy::Reject
            };
            let trie = build_trie(&RouteTable::load(&table)?, policy)?;
            println!("{}", format_match(&trie, &method, &path));
        }
    }
    Ok(())
}
