//! Table and JSON rendering for CLI output

use std::path::{Path, PathBuf};

use console::Style;
use mapscoutlib::SourceMapMetadata;
use serde::Serialize;

/// Width of the compiled path column
const PATH_WIDTH: usize = 48;
/// Width of the mtime column
const MTIME_WIDTH: usize = 15;

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        }
    }
}

/// Styles used by the table renderer
struct Theme {
    header: Style,
    path: Style,
    untracked: Style,
    total: Style,
}

impl Theme {
    fn new() -> Self {
        Self {
            header: Style::new().bold(),
            path: Style::new().cyan(),
            untracked: Style::new().dim(),
            total: Style::new().bold(),
        }
    }
}

/// Shorten a name to `max_len` characters, keeping its tail.
fn truncate_name(name: &str, max_len: usize) -> String {
    let count = name.chars().count();
    if count > max_len {
        let tail: String = name.chars().skip(count - max_len + 2).collect();
        format!("..{tail}")
    } else {
        name.to_string()
    }
}

/// Display `path` relative to `base` when it lies below it.
fn make_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

/// Render discovered records.
pub fn render_records(
    records: &[SourceMapMetadata],
    base: &Path,
    format: OutputFormat,
) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return to_json(records);
    }

    let theme = Theme::new();
    let mut output = String::new();

    let header = format!(
        "{:<path$} {:>mtime$}  {}",
        "Compiled",
        "Modified (ms)",
        "Source map",
        path = PATH_WIDTH,
        mtime = MTIME_WIDTH,
    );
    output.push_str(&format!("{}\n", theme.header.apply_to(&header)));
    output.push_str(&"-".repeat(PATH_WIDTH + MTIME_WIDTH + 14));
    output.push('\n');

    for record in records {
        let name = truncate_name(&make_relative(&record.compiled_path, base), PATH_WIDTH);
        let mtime = if record.is_mtime_tracked() {
            format!("{:>width$}", record.mtime, width = MTIME_WIDTH)
        } else {
            let cell = format!("{:>width$}", "-", width = MTIME_WIDTH);
            theme.untracked.apply_to(cell).to_string()
        };
        output.push_str(&format!(
            "{} {}  {}\n",
            theme
                .path
                .apply_to(format!("{:<width$}", name, width = PATH_WIDTH)),
            mtime,
            record.source_map_url
        ));
    }

    let total = format!("Total ({} source maps)", records.len());
    output.push_str(&format!("{}\n", theme.total.apply_to(total)));
    Ok(output)
}

/// Render a plain file listing.
pub fn render_files(files: &[PathBuf], base: &Path, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return to_json(files);
    }

    let theme = Theme::new();
    let mut output = String::new();
    for file in files {
        output.push_str(&make_relative(file, base));
        output.push('\n');
    }
    let total = format!("Total ({} files)", files.len());
    output.push_str(&format!("{}\n", theme.total.apply_to(total)));
    Ok(output)
}
