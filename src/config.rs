//! Config loader (C10) — `spec.md` §6 configuration surface, realized as a
//! `.auto-cr.json` discovered by walking up from the working directory.
//!
//! The core itself (C3/C4/C7) never reads this file; it accepts the
//! already-validated [`ScanConfig`] value, matching `spec.md`'s framing of
//! configuration as a pre-parsed value the core is handed.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::messages::Language;
use crate::rule::Severity;

pub const CONFIG_FILE_NAME: &str = ".auto-cr.json";

/// A single rule's configured severity, or `off` to disable it entirely.
/// Accepts the full surface from `spec.md` §6: `"off"`, `"warn"`/`"warning"`,
/// `"error"`, `"optimizing"`, booleans, and `0`/`1`/`2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSettingValue {
    Off,
    Severity(Severity),
    /// `true` or a bare `1` — "on at this rule's own default severity".
    Default,
}

/// Parses one rule's raw JSON setting value. `spec.md` §4.7 step 5: "invalid
/// setting emits a warn notification and keeps default" — so the caller
/// ([`resolve_rule_settings`]) downgrades an `Err` here to "no override" plus
/// a notification, rather than failing the whole config.
fn parse_rule_setting(value: &Value) -> Result<RuleSettingValue, String> {
    match value {
        Value::Bool(v) => Ok(if *v { RuleSettingValue::Default } else { RuleSettingValue::Off }),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(RuleSettingValue::Off),
            Some(1) => Ok(RuleSettingValue::Default),
            Some(2) => Ok(RuleSettingValue::Severity(Severity::Error)),
            _ => Err(format!("invalid rule setting integer: {n}")),
        },
        Value::String(s) => match s.as_str() {
            "off" => Ok(RuleSettingValue::Off),
            "warn" | "warning" => Ok(RuleSettingValue::Severity(Severity::Warning)),
            "error" => Ok(RuleSettingValue::Severity(Severity::Error)),
            "optimizing" => Ok(RuleSettingValue::Severity(Severity::Optimizing)),
            other => Err(format!("invalid rule setting string: {other}")),
        },
        other => Err(format!("invalid rule setting value: {other}")),
    }
}

/// Validate every entry of a config file's raw `rules` map. An entry that
/// fails to parse is dropped (the rule keeps its built-in default severity)
/// and reported as a warn message rather than aborting config load.
pub fn resolve_rule_settings(raw: &HashMap<String, Value>) -> (HashMap<String, RuleSettingValue>, Vec<String>) {
    let mut resolved = HashMap::with_capacity(raw.len());
    let mut warnings = Vec::new();
    for (rule_name, value) in raw {
        match parse_rule_setting(value) {
            Ok(setting) => {
                resolved.insert(rule_name.clone(), setting);
            }
            Err(reason) => warnings.push(format!("ignoring setting for rule \"{rule_name}\": {reason}")),
        }
    }
    (resolved, warnings)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub rules: HashMap<String, Value>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tsconfig_path: Option<String>,
}

/// Fully-resolved, validated configuration the core/orchestrator consumes —
/// `spec.md` §3's "pre-parsed configuration value".
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub rules: HashMap<String, RuleSettingValue>,
    pub ignore: Vec<String>,
    pub language: Language,
    pub tsconfig_path: Option<PathBuf>,
    pub output_format: OutputFormat,
    /// Raw `AUTO_CR_WORKERS` value (`spec.md` §4.7 step 6). Signed because
    /// the env var's sign is meaningful: negative (or unset/unparseable)
    /// falls back to the file-count heuristic, `>= 0` is an explicit count
    /// clamped to `[0, fileCount]`.
    pub worker_override: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            ignore: Vec::new(),
            language: Language::default(),
            tsconfig_path: None,
            output_format: OutputFormat::Text,
            worker_override: None,
        }
    }
}

/// Walk up from `start_dir` looking for `.auto-cr.json`, stopping at the
/// first one found or at a `.git` boundary.
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

pub struct ConfigLoadResult {
    pub config: ConfigFile,
    pub from_file: bool,
    /// Set when a config file exists but fails to parse — `spec.md` §7's
    /// "config load failure" path; the caller emits a `warn` notification
    /// and proceeds with `ConfigFile::default()`.
    pub load_error: Option<String>,
}

/// Load `.auto-cr.json` starting from `start_dir`, or defaults if absent.
/// An absent file is not an error; a malformed one is (recorded, not
/// propagated — see `ConfigLoadResult::load_error`).
pub fn load_config(start_dir: &Path) -> ConfigLoadResult {
    let Some(path) = find_config_file(start_dir) else {
        return ConfigLoadResult {
            config: ConfigFile::default(),
            from_file: false,
            load_error: None,
        };
    };

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            return ConfigLoadResult {
                config: ConfigFile::default(),
                from_file: false,
                load_error: Some(format!("failed to read {}: {err}", path.display())),
            };
        }
    };

    match serde_json::from_str::<ConfigFile>(&content) {
        Ok(config) => ConfigLoadResult {
            config,
            from_file: true,
            load_error: None,
        },
        Err(err) => ConfigLoadResult {
            config: ConfigFile::default(),
            from_file: false,
            load_error: Some(format!("failed to parse {}: {err}", path.display())),
        },
    }
}
