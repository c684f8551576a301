//! Scan Orchestrator (C7) — `spec.md` §4.7.
//!
//! Runs on a single thread; owns the task FIFO, the pending-results map (in
//! this in-process realization, a plain index-keyed slot array), the
//! output cursor, and the summary accumulator. Workers (see [`crate::worker`])
//! own only their per-file state.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::messages::Messages;
use crate::notification::Notification;
use crate::reporter::FileScanResult;
use crate::resolver::Resolver;
use crate::rule::{Rule, Severity};
use crate::rules::no_circular_dependencies::CycleDetectorState;
use crate::worker::{self, Task, TaskOutcome, WorkerInit, WorkerPool};

/// `spec.md` GLOSSARY: "one of `.ts`, `.tsx`, `.js`, `.jsx`; excludes `.d.ts`".
pub fn is_scannable(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.ends_with(".d.ts") {
        return false;
    }
    matches!(path.extension().and_then(|e| e.to_str()), Some("ts" | "tsx" | "js" | "jsx"))
}

/// Converts a path to a POSIX-separated string for glob matching, since
/// `spec.md` §4.7 step 3 requires matching "POSIX-normalised" paths
/// regardless of host platform.
fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Tests a candidate path against both its absolute POSIX form and its
/// POSIX form relative to the ignore-file base directory (`spec.md` §4.7
/// step 3). Glob semantics follow `picomatch`'s `dot: true` — `glob::Pattern`
/// already matches leading dots by default (no `require_literal_leading_dot`).
pub struct IgnoreMatcher {
    patterns: Vec<Pattern>,
    base_dir: PathBuf,
    options: MatchOptions,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String], base_dir: PathBuf) -> Self {
        let compiled = patterns.iter().filter_map(|p| Pattern::new(p).ok()).collect();
        Self {
            patterns: compiled,
            base_dir,
            options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: false,
                require_literal_leading_dot: false,
            },
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let absolute = to_posix(path);
        let relative = path
            .strip_prefix(&self.base_dir)
            .map(to_posix)
            .unwrap_or_else(|_| absolute.clone());
        self.patterns
            .iter()
            .any(|p| p.matches_with(&absolute, self.options) || p.matches_with(&relative, self.options))
    }
}

/// Phase 4 of `spec.md` §4.7: expand each input path into scannable files,
/// in traversal order, always skipping `node_modules` and every entry the
/// ignore matcher rejects.
fn expand_paths(existing: &[PathBuf], ignore: &IgnoreMatcher) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for path in existing {
        if ignore.is_ignored(path) {
            continue;
        }
        if path.is_file() {
            if is_scannable(path) {
                expanded.push(path.clone());
            }
            continue;
        }
        if !path.is_dir() {
            continue;
        }
        let walker = WalkDir::new(path).sort_by_file_name().into_iter().filter_entry(|entry| {
            if entry.file_name() == "node_modules" {
                return false;
            }
            !ignore.is_ignored(entry.path())
        });
        for entry in walker.flatten() {
            let entry_path = entry.path();
            if entry_path.is_file() && is_scannable(entry_path) {
                expanded.push(entry_path.to_path_buf());
            }
        }
    }
    expanded
}

/// `spec.md` §8: "the `files` order in the summary equals the order of
/// scannable, non-ignored, existing paths in P after
/// deduplication-preserving-first-index".
fn dedupe_preserving_first_index(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(paths.len());
    for path in paths {
        if seen.insert(path.clone()) {
            unique.push(path);
        }
    }
    unique
}

/// `spec.md` §4.7 step 6.
fn select_worker_count(worker_override: Option<i64>, file_count: usize) -> usize {
    if let Some(value) = worker_override {
        if value >= 0 {
            return (value as usize).min(file_count);
        }
    }
    let heuristic = if file_count < 20 {
        1
    } else {
        let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (cpu_count.saturating_sub(1)).max(1)
    };
    heuristic.min(file_count).max(if file_count == 0 { 0 } else { 1 })
}

/// Built-in rules, filtered/re-severitized by `config.rules` overrides.
/// `"off"` drops the rule entirely; a severity override replaces the
/// rule's default severity; `Default`/absent keeps it as built.
fn prepare_rules(config: &ScanConfig, cycle_state: Arc<CycleDetectorState>) -> Vec<Rule> {
    use crate::config::RuleSettingValue;

    crate::rules::built_in_rules(cycle_state)
        .into_iter()
        .filter_map(|mut rule| match config.rules.get(&rule.name) {
            Some(RuleSettingValue::Off) => None,
            Some(RuleSettingValue::Severity(severity)) => {
                rule.default_severity = *severity;
                Some(rule)
            }
            Some(RuleSettingValue::Default) | None => Some(rule),
        })
        .collect()
}

pub struct ScanOutcome {
    pub summary: crate::summary::ScanSummary,
    /// `spec.md` §8: `exitCode == 1 ⇔ filesWithErrors > 0 ∨ a fatal
    /// notification was emitted`. Separate from `filesWithErrors` because a
    /// scan can fail fatally (all paths missing, a worker dying) without
    /// ever having scanned a single file.
    pub fatal: bool,
}

/// Run the full scan pipeline (`spec.md` §4.7) over `paths`.
///
/// `pre_notifications` carries diagnostics the CLI surface (C12) already
/// knows about before the scan starts — a config-load warning, a
/// `--rule-dir` no-op warning — so they render in the same interleaved
/// position (before any file output) in both text and structured mode.
pub fn run(paths: &[String], config: &ScanConfig, project_root: &Path, pre_notifications: Vec<Notification>) -> ScanOutcome {
    let messages = Messages::new(config.language);
    let mut notifications: Vec<Notification> = pre_notifications;

    // Phase 1: validate.
    if paths.is_empty() {
        notifications.push(Notification::info(messages.no_paths_provided()));
        return ScanOutcome {
            summary: crate::summary::ScanSummary::empty(notifications),
            fatal: false,
        };
    }

    // Phase 2: existence filter.
    let mut existing = Vec::new();
    for raw in paths {
        let path = PathBuf::from(raw);
        if path.exists() {
            existing.push(path);
        } else {
            notifications.push(Notification::error(format!("path does not exist: {raw}")));
        }
    }
    if existing.is_empty() {
        notifications.push(Notification::error(messages.all_paths_missing()));
        return ScanOutcome {
            summary: crate::summary::ScanSummary::empty(notifications),
            fatal: true,
        };
    }

    // Phase 3: ignore matcher.
    let ignore = IgnoreMatcher::new(&config.ignore, project_root.to_path_buf());

    // Phase 4: expansion.
    let expanded = expand_paths(&existing, &ignore);
    let unique_paths = dedupe_preserving_first_index(expanded);

    // Phase 5: rule preparation.
    let resolver = Arc::new(Resolver::new(project_root.to_path_buf(), config.tsconfig_path.as_deref()));
    let cycle_state = Arc::new(CycleDetectorState::new(resolver));
    let rules = Arc::new(prepare_rules(config, cycle_state));
    if rules.is_empty() {
        notifications.push(Notification::warn(messages.no_rules_enabled()));
        return ScanOutcome {
            summary: crate::summary::ScanSummary::empty(notifications),
            fatal: false,
        };
    }

    // Phase 6: worker-count selection.
    let worker_count = select_worker_count(config.worker_override, unique_paths.len());

    // Phase 7: dispatch.
    let mut slots: Vec<Option<(FileScanResult, Vec<Notification>)>> = (0..unique_paths.len()).map(|_| None).collect();
    let mut fatal = false;

    if worker_count <= 1 {
        // workers == 0 clamps the pipeline to doing no file analysis at
        // all (`spec.md` §4.7 step 6's clamp to `[0, N]` permits 0 as an
        // explicit "scan nothing" override); workers == 1 runs the same
        // per-file work in-line, establishing the behavior every worker
        // count must reproduce byte-for-byte (`spec.md` §8).
        if worker_count == 1 {
            for (index, path) in unique_paths.iter().enumerate() {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    worker::analyze_file(path, config.language, &rules)
                }));
                match outcome {
                    Ok((summary, logs)) => slots[index] = Some((summary, logs)),
                    Err(_) => {
                        notifications
                            .push(Notification::error(format!("worker fatal error analyzing {}", path.display())));
                        fatal = true;
                        break;
                    }
                }
            }
        }
    } else {
        let (job_tx, job_rx) = mpsc::channel::<Task>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel::<TaskOutcome>();

        for (id, path) in unique_paths.iter().enumerate() {
            let _ = job_tx.send(Task {
                id,
                file_path: path.clone(),
            });
        }
        drop(job_tx);

        let init = WorkerInit {
            rule_dir: None,
            language: config.language,
            tsconfig_path: config.tsconfig_path.clone(),
        };
        let pool = WorkerPool::spawn(worker_count, job_rx, result_tx.clone(), init, rules.clone());
        drop(result_tx);

        let mut received = 0;
        while received < unique_paths.len() {
            match result_rx.recv() {
                Ok(TaskOutcome::Result { id, summary, logs, .. }) => {
                    slots[id] = Some((summary, logs));
                    received += 1;
                }
                Ok(TaskOutcome::Error { file_path, message, .. }) => {
                    notifications.push(
                        Notification::error(format!("worker fatal error analyzing {}", file_path.display()))
                            .with_detail(message),
                    );
                    fatal = true;
                    break;
                }
                Err(_) => break,
            }
        }
        pool.join();
    }

    // Phase 8: finalise — assemble in input order, render if text mode.
    let mut files = Vec::with_capacity(slots.len());
    for slot in slots.into_iter().flatten() {
        let (summary, logs) = slot;
        notifications.extend(logs);
        files.push(summary);
    }

    if config.output_format == crate::config::OutputFormat::Text {
        render_text(&notifications, &files, &messages);
    }

    let summary = crate::summary::ScanSummary::from_files(files, notifications);
    ScanOutcome { summary, fatal }
}

fn render_text(notifications: &[Notification], files: &[FileScanResult], messages: &Messages) {
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    for notification in notifications {
        let _ = std::io::Write::write_fmt(
            &mut handle,
            format_args!(
                "[{:?}] {}{}\n",
                notification.level,
                notification.message,
                notification
                    .detail
                    .as_ref()
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default()
            ),
        );
    }
    for file in files {
        crate::reporter::render_file_result(file, messages, &mut handle);
    }
}

/// Count as `error`-severity at the file level iff at least one of its
/// violations is `Severity::Error` — already tracked by `FileScanResult`.
pub fn file_has_error(result: &FileScanResult) -> bool {
    result.severity_counts.error > 0 || result.violations.iter().any(|v| v.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scannable_extensions() {
        assert!(is_scannable(Path::new("a.ts")));
        assert!(is_scannable(Path::new("a.tsx")));
        assert!(is_scannable(Path::new("a.js")));
        assert!(is_scannable(Path::new("a.jsx")));
        assert!(!is_scannable(Path::new("a.d.ts")));
        assert!(!is_scannable(Path::new("a.json")));
    }

    #[test]
    fn ignore_matcher_matches_absolute_and_relative() {
        let dir = tempdir().unwrap();
        let matcher = IgnoreMatcher::new(&["**/node_modules/**".to_string()], dir.path().to_path_buf());
        let path = dir.path().join("node_modules").join("x.ts");
        assert!(matcher.is_ignored(&path));
    }

    #[test]
    fn ignore_matcher_is_stable_under_normalisation() {
        let dir = tempdir().unwrap();
        let matcher = IgnoreMatcher::new(&["*.generated.ts".to_string()], dir.path().to_path_buf());
        let path = dir.path().join("x.generated.ts");
        let normalized = PathBuf::from(to_posix(&path));
        assert_eq!(matcher.is_ignored(&path), matcher.is_ignored(&normalized));
    }

    #[test]
    fn dedupe_keeps_first_index_order() {
        let a = PathBuf::from("a.ts");
        let b = PathBuf::from("b.ts");
        let result = dedupe_preserving_first_index(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(result, vec![a, b]);
    }

    #[test]
    fn worker_count_uses_one_below_twenty_files() {
        assert_eq!(select_worker_count(None, 5), 1);
    }

    #[test]
    fn worker_count_override_clamps_to_file_count() {
        assert_eq!(select_worker_count(Some(100), 3), 3);
        assert_eq!(select_worker_count(Some(0), 3), 0);
    }

    #[test]
    fn negative_override_falls_back_to_heuristic() {
        assert_eq!(select_worker_count(Some(-1), 5), 1);
    }

    #[test]
    fn end_to_end_deep_relative_import_scenario() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "import { x } from '../../../../shared/x';\n").unwrap();

        let config = ScanConfig {
            output_format: crate::config::OutputFormat::Json,
            ..ScanConfig::default()
        };
        let outcome = run(&[file.to_string_lossy().into_owned()], &config, dir.path(), Vec::new());
        assert!(!outcome.fatal);
        assert_eq!(outcome.summary.files.len(), 1);
        let violations = &outcome.summary.files[0].violations;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_name, "no-deep-relative-imports");
        assert_eq!(violations[0].line, Some(1));
    }

    #[test]
    fn no_paths_provided_returns_empty_summary() {
        let config = ScanConfig::default();
        let outcome = run(&[], &config, Path::new("."), Vec::new());
        assert!(!outcome.fatal);
        assert_eq!(outcome.summary.files.len(), 0);
        assert_eq!(outcome.summary.notifications.len(), 1);
    }

    #[test]
    fn all_paths_missing_is_fatal() {
        let config = ScanConfig::default();
        let outcome = run(&["/no/such/path.ts".to_string()], &config, Path::new("."), Vec::new());
        assert!(outcome.fatal);
    }

    #[test]
    fn parallel_determinism_across_worker_counts() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..24 {
            let file = dir.path().join(format!("f{i}.ts"));
            fs::write(&file, format!("import {{ x{i} }} from '../../../../shared/x{i}';\n")).unwrap();
            paths.push(file.to_string_lossy().into_owned());
        }

        let mut config = ScanConfig {
            output_format: crate::config::OutputFormat::Json,
            ..ScanConfig::default()
        };

        config.worker_override = Some(1);
        let one = run(&paths, &config, dir.path(), Vec::new());

        config.worker_override = Some(8);
        let eight = run(&paths, &config, dir.path(), Vec::new());

        let one_json = serde_json::to_string(&one.summary).unwrap();
        let eight_json = serde_json::to_string(&eight.summary).unwrap();
        assert_eq!(one_json, eight_json);
    }
}
