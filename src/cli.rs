//! CLI surface (C12) — `spec.md` §6's "Scan-input command surface", realized
//! with `clap`'s derive API the way the teacher's own `cli::args` module
//! does. Everything past argument parsing and stdin ingestion is the core's
//! job; this module's only responsibilities are building a [`ScanConfig`]
//! and mapping a [`crate::scan::ScanOutcome`] to a process exit code.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use crate::config::{self, OutputFormat, ScanConfig};
use crate::messages::Language;
use crate::notification::Notification;
use crate::scan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliLanguage {
    Zh,
    En,
}

impl From<CliLanguage> for Language {
    fn from(value: CliLanguage) -> Self {
        match value {
            CliLanguage::Zh => Language::Zh,
            CliLanguage::En => Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliFormat {
    Text,
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Text => OutputFormat::Text,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// Accepted but only drives whether a `\r`-based spinner line is written to
/// stderr in text mode (SPEC_FULL.md §4.12) — no bearing on scan semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProgressMode {
    TtyOnly,
    Yes,
    No,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Static code-review engine for JavaScript/TypeScript", long_about = None)]
pub struct CliArgs {
    /// Candidate file or directory paths to scan.
    pub paths: Vec<String>,

    /// Directory of custom rules. Accepted for the contract's sake; this
    /// build has no dynamic rule loader, so a directory here always emits
    /// the custom-rule-load-failure notification and is otherwise a no-op
    /// (SPEC_FULL.md Open Question 3).
    #[arg(long)]
    pub rule_dir: Option<PathBuf>,

    /// Explicit config file path, overriding auto-discovery of `.auto-cr.json`.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// File of newline-separated ignore glob patterns, merged with the
    /// config file's `ignore` list.
    #[arg(long = "ignore-file")]
    pub ignore_file: Option<PathBuf>,

    /// Explicit tsconfig.json path, overriding per-directory discovery.
    #[arg(long)]
    pub tsconfig: Option<PathBuf>,

    #[arg(long = "lang", value_enum)]
    pub lang: Option<CliLanguage>,

    #[arg(long = "format", value_enum)]
    pub format: Option<CliFormat>,

    #[arg(long = "progress", value_enum)]
    pub progress: Option<ProgressMode>,

    /// Read additional newline- (or NUL-) separated paths from stdin.
    #[arg(long)]
    pub stdin: bool,
}

/// `spec.md` §6 stdin format: UTF-8 bytes; NUL-delimited if any NUL byte is
/// present, otherwise `\r?\n`-delimited; trailing `\r` stripped per entry;
/// empty entries dropped; spaces preserved.
pub fn parse_stdin_paths(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let parts: Vec<&str> = if bytes.contains(&0) {
        text.split('\0').collect()
    } else {
        text.split('\n').collect()
    };
    parts
        .into_iter()
        .map(|p| p.strip_suffix('\r').unwrap_or(p))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a newline-separated ignore-pattern file, skipping blank lines and
/// `#`-prefixed comments (the same convention `.gitignore`-style files use).
fn load_ignore_file(path: &std::path::Path) -> Result<Vec<String>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Resolve CLI args + discovered config file into a [`ScanConfig`] and the
/// list of paths to scan, plus any notifications generated along the way
/// (config-load failure, custom-rule-dir no-op, ignore-file load failure).
fn build_scan_config(args: &CliArgs, cwd: &std::path::Path) -> (ScanConfig, Vec<String>, Vec<Notification>) {
    let mut notifications = Vec::new();

    let config_file = if let Some(explicit) = &args.config {
        match std::fs::read_to_string(explicit) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(parsed) => parsed,
                Err(err) => {
                    notifications.push(Notification::warn(format!(
                        "failed to parse config {}: {err}",
                        explicit.display()
                    )));
                    config::ConfigFile::default()
                }
            },
            Err(err) => {
                notifications.push(Notification::warn(format!("failed to read config {}: {err}", explicit.display())));
                config::ConfigFile::default()
            }
        }
    } else {
        let result = config::load_config(cwd);
        if let Some(err) = result.load_error {
            notifications.push(Notification::warn(err));
        }
        result.config
    };

    if let Some(rule_dir) = &args.rule_dir {
        notifications.push(Notification::warn(format!(
            "custom rule directory {} has no loadable rules",
            rule_dir.display()
        )));
    }

    let mut ignore = config_file.ignore.clone();
    if let Some(ignore_file) = &args.ignore_file {
        match load_ignore_file(ignore_file) {
            Ok(mut patterns) => ignore.append(&mut patterns),
            Err(err) => notifications.push(Notification::warn(err)),
        }
    }

    let language = args
        .lang
        .map(Language::from)
        .or_else(|| config_file.language.as_deref().and_then(Language::from_str))
        .unwrap_or_default();

    let tsconfig_path = args.tsconfig.clone().or_else(|| config_file.tsconfig_path.clone().map(PathBuf::from));

    let output_format = args.format.map(OutputFormat::from).unwrap_or(OutputFormat::Text);

    let worker_override = std::env::var("AUTO_CR_WORKERS").ok().and_then(|v| v.parse::<i64>().ok());

    let (rules, rule_warnings) = config::resolve_rule_settings(&config_file.rules);
    notifications.extend(rule_warnings.into_iter().map(Notification::warn));

    let scan_config = ScanConfig {
        rules,
        ignore,
        language,
        tsconfig_path,
        output_format,
        worker_override,
    };

    let mut paths = args.paths.clone();
    if args.stdin {
        let mut buffer = Vec::new();
        if std::io::stdin().read_to_end(&mut buffer).is_ok() {
            paths.extend(parse_stdin_paths(&buffer));
        }
    }

    (scan_config, paths, notifications)
}

/// Entry point called from `main`: parse has already happened (`CliArgs` is
/// the parsed value), run the scan, print structured output if requested,
/// and map the result to an exit code (`spec.md` §6: `0` success, `1` any
/// file has an error-severity violation or the scan failed fatally).
pub fn run_cli(args: CliArgs) -> ExitCode {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let (scan_config, paths, notifications) = build_scan_config(&args, &cwd);

    let outcome = scan::run(&paths, &scan_config, &cwd, notifications);

    if scan_config.output_format == OutputFormat::Json {
        match serde_json::to_string(&outcome.summary) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("failed to serialize scan summary: {err}"),
        }
    }

    if outcome.fatal || outcome.summary.summary.files_with_errors > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::from(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_splits_on_newline_and_strips_cr() {
        let input = b"a.ts\r\nb.ts\nc.ts\r\n";
        assert_eq!(parse_stdin_paths(input), vec!["a.ts", "b.ts", "c.ts"]);
    }

    #[test]
    fn stdin_splits_on_nul_when_present() {
        let input = b"a.ts\0b.ts\0\0c.ts";
        assert_eq!(parse_stdin_paths(input), vec!["a.ts", "b.ts", "c.ts"]);
    }

    #[test]
    fn stdin_drops_empty_entries_but_preserves_spaces() {
        let input = b"a path with spaces.ts\n\nb.ts\n";
        assert_eq!(parse_stdin_paths(input), vec!["a path with spaces.ts", "b.ts"]);
    }
}
