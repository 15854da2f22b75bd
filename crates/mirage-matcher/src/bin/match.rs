//! Mirage request matcher CLI
//!
//! Evaluates stub request patterns against a recorded request, using the
//! exclusion rules found under the root directory.
//!
//! Usage:
//!   mirage-match --pattern <file_or_directory> --request <file> [OPTIONS]
//!
//! Exit status: 0 when at least one pattern matched, 1 when none did, 2 on
//! configuration or I/O errors.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mirage_matcher::logging::{self, LogOptions};
use mirage_matcher::{LoggedRequest, MalformedBodyPolicy, MatcherConfig, RequestPattern};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Mirage request matcher
#[derive(Parser, Debug)]
#[command(name = "mirage-match")]
#[command(
    author,
    version,
    about = "Check whether a recorded request matches stub request patterns"
)]
struct Args {
    /// Request pattern or stub mapping file, or a directory of them
    #[arg(short, long)]
    pattern: PathBuf,

    /// Recorded request (JSON with url, method, headers, body)
    #[arg(short, long)]
    request: PathBuf,

    /// Matcher configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory holding __excludes (overrides the config file)
    #[arg(long, env = "MIRAGE_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// What to do with bodies that are not well-formed XML
    #[arg(long, value_enum)]
    malformed_body: Option<MalformedBodyArg>,

    /// Verbose output (debug diagnostics)
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MalformedBodyArg {
    RawComparison,
    Reject,
}

impl From<MalformedBodyArg> for MalformedBodyPolicy {
    fn from(arg: MalformedBodyArg) -> Self {
        match arg {
            MalformedBodyArg::RawComparison => MalformedBodyPolicy::RawComparison,
            MalformedBodyArg::Reject => MalformedBodyPolicy::Reject,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(LogOptions {
        verbose: args.verbose,
        json: args.json_logs,
    });

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{RED}Error:{RESET} {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    let config = load_config(args)?;
    let context = config.match_context();

    let request = std::fs::read_to_string(&args.request)
        .with_context(|| format!("Failed to read request file {:?}", args.request))?;
    let request = LoggedRequest::from_json(&request)
        .with_context(|| format!("Failed to parse request file {:?}", args.request))?;

    let files = collect_pattern_files(&args.pattern);
    if files.is_empty() {
        anyhow::bail!("No JSON files found in {:?}", args.pattern);
    }

    println!(
        "{DIM}Request:{RESET} {CYAN}{} {}{RESET}",
        request.method, request.url
    );

    let mut any_matched = false;
    for file in &files {
        let pattern = load_pattern_file(file)?;
        let compiled = pattern
            .compile(&context)
            .with_context(|| format!("Invalid request pattern in {file:?}"))?;

        if compiled.is_matched_by(&request) {
            any_matched = true;
            println!("  {GREEN}{BOLD}MATCH{RESET}     {}", file.display());
        } else {
            println!("  {RED}NO MATCH{RESET}  {}", file.display());
        }
    }

    Ok(any_matched)
}

fn load_config(args: &Args) -> Result<MatcherConfig> {
    let mut config = match &args.config {
        Some(path) => MatcherConfig::from_file(path)?,
        None => MatcherConfig::default(),
    };
    if let Some(root_dir) = &args.root_dir {
        config.root_dir = root_dir.clone();
    }
    if let Some(policy) = args.malformed_body {
        config.malformed_body = policy.into();
    }
    config.validate()?;
    debug!("Matcher configuration: {config:?}");
    Ok(config)
}

/// Read a bare request pattern, or the `request` member of a stub mapping.
fn load_pattern_file(path: &Path) -> Result<RequestPattern> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pattern file {path:?}"))?;
    let mut json: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse pattern file {path:?}"))?;

    if let Some(request) = json.get_mut("request") {
        json = request.take();
    }
    serde_json::from_value(json).with_context(|| format!("Invalid request pattern in {path:?}"))
}

fn collect_pattern_files(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        if let Ok(entries) = std::fs::read_dir(path) {
            for entry in entries.flatten() {
                let entry_path = entry.path();
                if entry_path.is_file() && entry_path.extension().is_some_and(|ext| ext == "json") {
                    files.push(entry_path);
                }
            }
        }
    }

    files.sort();
    files
}
