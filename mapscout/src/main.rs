//! # mapscout
//!
//! A CLI for finding the source maps behind build output.
//!
//! ## Overview
//!
//! mapscout is built on top of mapscoutlib. It walks compiled JavaScript,
//! reads `sourceMappingURL` comments and `*.source-maps.json` manifests, and
//! can correlate whole directories with a remote source root.
//!
//! ## Usage
//!
//! ```bash
//! # Source maps referenced below the current directory
//! mapscout
//!
//! # Only some files, as JSON
//! mapscout find dist -p "**/*.js" -p "!**/vendor/**" --output json
//!
//! # List the candidate files without reading them
//! mapscout list dist
//!
//! # Directory correspondence
//! mapscout map --map dist=/srv/app/src --glob "**/*.js"
//!
//! # Everything, driven by mapscout.json
//! mapscout discover --config mapscout.json
//! ```
//!
//! Logging goes to stderr. Set `MAPSCOUT_LOG` (e.g. `MAPSCOUT_LOG=debug`) or
//! pass `-v`/`-vv`.

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mapscoutlib::config::FILE_NAME;
use mapscoutlib::metadata::normalize_lexically;
use mapscoutlib::{
    DiscoveryConfig, DiscoveryOptions, GlobList, PathMapping, SourceMapDiscovery,
};
use render::{render_files, render_records, OutputFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "MAPSCOUT_LOG";

fn root_arg() -> Arg {
    Arg::new("root")
        .help("Directory to search (defaults to current directory)")
        .default_value(".")
}

fn pattern_arg() -> Arg {
    Arg::new("pattern")
        .short('p')
        .long("pattern")
        .action(ArgAction::Append)
        .help("Glob selecting files; prefix with ! to exclude (can be repeated)")
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("mapscout")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find the source maps behind your build output")
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .value_parser(["table", "json"])
                .default_value("table")
                .help("Output format"),
        )
        .arg(
            Arg::new("no-host-search")
                .long("no-host-search")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Always read files directly instead of using bulk search"),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Maximum concurrent metadata builds (0 = unbounded)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v debug, -vv trace)"),
        )
        .arg(root_arg())
        .arg(pattern_arg())
        .subcommand(
            Command::new("find")
                .about("Find source maps referenced by comments or manifests (default command)")
                .arg(root_arg())
                .arg(pattern_arg()),
        )
        .subcommand(
            Command::new("list")
                .about("List the files selected by the patterns")
                .arg(root_arg())
                .arg(pattern_arg()),
        )
        .subcommand(
            Command::new("map")
                .about("Correlate local directories with a remote source root")
                .arg(
                    Arg::new("map")
                        .short('m')
                        .long("map")
                        .action(ArgAction::Append)
                        .required(true)
                        .value_name("LOCAL=REMOTE")
                        .help("Directory correspondence (can be repeated; first match wins)"),
                )
                .arg(
                    Arg::new("glob")
                        .short('g')
                        .long("glob")
                        .help("Glob applied below each local directory [default: **/*]"),
                ),
        )
        .subcommand(
            Command::new("discover")
                .about("Run comment, manifest and path mapping discovery from a config file")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .default_value(FILE_NAME)
                        .help("Configuration file"),
                ),
        )
}

/// Install the stderr log subscriber.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Apply the global flags on top of `options`.
fn apply_flags(matches: &ArgMatches, mut options: DiscoveryOptions) -> DiscoveryOptions {
    if matches.get_flag("no-host-search") {
        options = options.without_host_search();
    }
    if let Some(&jobs) = matches.get_one::<usize>("jobs") {
        options = options.max_concurrency(jobs);
    }
    options
}

fn output_format(matches: &ArgMatches) -> OutputFormat {
    matches
        .get_one::<String>("output")
        .map(|s| OutputFormat::parse(s))
        .unwrap_or(OutputFormat::Table)
}

/// Build the glob list from `root` and `--pattern`, defaulting to scripts.
fn build_glob_list(matches: &ArgMatches) -> GlobList {
    let root = matches
        .get_one::<String>("root")
        .map(|s| s.as_str())
        .unwrap_or(".");
    let patterns: Vec<String> = matches
        .get_many::<String>("pattern")
        .map(|v| v.cloned().collect())
        .unwrap_or_else(|| DiscoveryConfig::default().out_files);

    GlobList::new(root, patterns)
}

/// Parse `LOCAL=REMOTE` pairs, in order.
fn parse_mapping(matches: &ArgMatches) -> anyhow::Result<PathMapping> {
    let mut mapping = PathMapping::new();
    for pair in matches.get_many::<String>("map").into_iter().flatten() {
        let (local, remote) = pair
            .split_once('=')
            .filter(|(local, remote)| !local.is_empty() && !remote.is_empty())
            .ok_or_else(|| anyhow!("Invalid mapping '{pair}'. Use LOCAL=REMOTE"))?;
        mapping.insert(local, remote);
    }
    Ok(mapping)
}

/// Base directory for relative display paths, spelled the way records are
fn display_base(root: &Path) -> PathBuf {
    std::path::absolute(root)
        .map(|p| normalize_lexically(&p))
        .unwrap_or_else(|_| root.to_path_buf())
}

/// Handler for the find command
fn find_handler(matches: &ArgMatches) -> anyhow::Result<String> {
    let files = build_glob_list(matches);
    let discovery = SourceMapDiscovery::new(apply_flags(matches, DiscoveryOptions::new()));

    let mut records = discovery.find_by_source_map_comment(&files)?;
    records.sort_by(|a, b| a.compiled_path.cmp(&b.compiled_path));

    render_records(&records, &display_base(files.root()), output_format(matches))
}

/// Handler for the list command
fn list_handler(matches: &ArgMatches) -> anyhow::Result<String> {
    let files = build_glob_list(matches);
    let discovery = SourceMapDiscovery::new(apply_flags(matches, DiscoveryOptions::new()));

    let listed = discovery.list_files(&files)?;

    render_files(&listed, &display_base(files.root()), output_format(matches))
}

/// Handler for the map command
fn map_handler(matches: &ArgMatches) -> anyhow::Result<String> {
    let mapping = parse_mapping(matches)?;
    let mut options = apply_flags(matches, DiscoveryOptions::new());
    if let Some(glob) = matches.get_one::<String>("glob") {
        options = options.path_mapping_glob(glob.as_str());
    }
    let discovery = SourceMapDiscovery::new(options);

    let mut records = discovery.find_by_path_mapping(&mapping)?;
    records.sort_by(|a, b| a.compiled_path.cmp(&b.compiled_path));

    render_records(&records, &display_base(Path::new(".")), output_format(matches))
}

/// Handler for the discover command
fn discover_handler(matches: &ArgMatches) -> anyhow::Result<String> {
    let path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(FILE_NAME));

    let config = DiscoveryConfig::load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    debug!(root = %config.root_path.display(), "running config-driven discovery");

    let discovery = SourceMapDiscovery::new(apply_flags(matches, config.options()));
    let records = discovery.discover(&config.request())?;

    render_records(
        &records,
        &display_base(&config.root_path),
        output_format(matches),
    )
}

fn run(matches: &ArgMatches) -> anyhow::Result<String> {
    match matches.subcommand() {
        Some(("find", sub)) => find_handler(sub),
        Some(("list", sub)) => list_handler(sub),
        Some(("map", sub)) => map_handler(sub),
        Some(("discover", sub)) => discover_handler(sub),
        // No subcommand - treat as find
        _ => find_handler(matches),
    }
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_tracing(matches.get_count("verbose"));

    match run(&matches) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
