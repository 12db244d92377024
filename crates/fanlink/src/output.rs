//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits `key=value` lines.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};

// ── Resolved options ─────────────────────────────────────────────────

/// The output format in effect (flag > env > config > table).
pub fn format(global: &GlobalOpts) -> &OutputFormat {
    global.output.as_ref().unwrap_or(&OutputFormat::Table)
}

/// Determine whether color output should be enabled.
pub fn should_color(global: &GlobalOpts) -> bool {
    match global.color.as_ref().unwrap_or(&ColorMode::Auto) {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Color helpers ────────────────────────────────────────────────────

/// "connected" in green or "disconnected" in red.
pub fn connection_label(connected: bool, color: bool) -> String {
    match (connected, color) {
        (true, true) => "connected".green().bold().to_string(),
        (false, true) => "disconnected".red().bold().to_string(),
        (true, false) => "connected".into(),
        (false, false) => "disconnected".into(),
    }
}

pub fn dim(text: &str, color: bool) -> String {
    if color { text.dimmed().to_string() } else { text.to_owned() }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `table_fn`, plain uses `plain_fn`; the structured
/// formats serialize `data` directly.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    table_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => table_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty or compact JSON. Serialization of our own types cannot fail;
/// an error is rendered as an empty object rather than aborting.
pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| {
        tracing::error!(error = %e, "JSON serialization failed");
        "{}".into()
    })
}

/// YAML output.
pub fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| {
        tracing::error!(error = %e, "YAML serialization failed");
        String::new()
    })
}
