//! Worker protocol (C8) — `spec.md` §4.8.
//!
//! Realized as a small number of OS threads reading one task at a time off
//! a shared FIFO (`std::sync::mpsc`) and posting results back on a second
//! channel, per SPEC_FULL.md §5: the FIFO order of task *dispatch* never
//! affects the order of *assembly*, which the orchestrator keys by input
//! index regardless of completion order.
//!
//! A worker owns its per-file data exclusively; the `Resolver` and
//! `CycleDetectorState` it shares with every other worker are internally
//! lock-protected and pure functions of filesystem state observed during
//! the scan (`spec.md` §3's ownership note), so sharing them across threads
//! in one address space needs no extra synchronization story beyond that.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use swc_common::SourceMap;

use crate::context::{create_context, run_rules};
use crate::messages::Language;
use crate::notification::Notification;
use crate::parser::{Ast, Parser, ParseError, SwcParser};
use crate::reporter::{FileScanResult, Reporter};
use crate::rule::Rule;
use crate::source_index::SourceIndex;

/// Orchestrator -> worker, once per worker at startup.
#[derive(Clone)]
pub struct WorkerInit {
    pub rule_dir: Option<PathBuf>,
    pub language: Language,
    pub tsconfig_path: Option<PathBuf>,
}

/// Orchestrator -> worker, one per file to analyze.
pub struct Task {
    pub id: usize,
    pub file_path: PathBuf,
}

/// Worker -> orchestrator. Exactly one response per request.
pub enum TaskOutcome {
    Result {
        id: usize,
        file_path: PathBuf,
        summary: FileScanResult,
        logs: Vec<Notification>,
    },
    Error {
        id: usize,
        file_path: PathBuf,
        message: String,
    },
}

/// Parse + analyze + run every rule against one file, returning its
/// `FileScanResult` and any notifications captured along the way
/// (currently just the parser-failure / unreadable-file paths — `spec.md`
/// §7 and SPEC_FULL.md §7's ambient I/O boundary note).
///
/// This is the single-worker (`workers == 1`) code path as well as what
/// each pooled thread calls per task; kept as one function so both paths
/// are byte-identical in behavior (`spec.md` §8's parallelism-is-an-
/// optimisation-only property).
pub fn analyze_file(file_path: &PathBuf, language: Language, rules: &[Rule]) -> (FileScanResult, Vec<Notification>) {
    let mut logs = Vec::new();

    let source = match std::fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            logs.push(
                Notification::error(format!("failed to read file: {}", file_path.display()))
                    .with_detail(err.to_string()),
            );
            return (synthetic_error_result(file_path), logs);
        }
    };

    let source_map: Arc<SourceMap> = Default::default();
    let ast: Result<Ast, ParseError> = SwcParser.parse(&source_map, &source, file_path);
    let ast = match ast {
        Ok(ast) => ast,
        Err(err) => {
            logs.push(Notification::error(format!("failed to parse file: {}", file_path.display())).with_detail(
                match err {
                    ParseError::Syntax(s) => s,
                },
            ));
            return (synthetic_error_result(file_path), logs);
        }
    };

    let source_index = SourceIndex::build(&source, ast.module_start);
    let reporter = Reporter::new(file_path.clone(), &source, &source_index);
    let ctx = create_context(&ast, file_path, &source, language, reporter);
    let summary = run_rules(&ctx, rules);
    (summary, logs)
}

/// `spec.md` §7: a parser failure (or, per SPEC_FULL.md, an unreadable
/// file) "counts as an error-severity file outcome without fabricating a
/// specific violation" — `errorViolations = 1`, `totalViolations = 1`, and
/// an empty `violations` list.
fn synthetic_error_result(file_path: &PathBuf) -> FileScanResult {
    FileScanResult {
        file_path: file_path.clone(),
        severity_counts: crate::reporter::SeverityCounts {
            error: 1,
            warning: 0,
            optimizing: 0,
        },
        total_violations: 1,
        error_violations: 1,
        violations: Vec::new(),
    }
}

/// A small pool of threads draining a shared task queue one request at a
/// time. `job_rx` is wrapped in a `Mutex` so every worker thread can pull
/// its next task without a dedicated per-worker channel — matching the
/// "FIFO, not work-stealing" dispatch model SPEC_FULL.md §5 describes.
pub struct WorkerPool {
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` threads, each looping: pull a `Task` from
    /// `job_rx`, run it, post a `TaskOutcome` on `result_tx`, repeat until
    /// the job queue is exhausted (senders dropped).
    pub fn spawn(
        worker_count: usize,
        job_rx: Arc<Mutex<Receiver<Task>>>,
        result_tx: Sender<TaskOutcome>,
        init: WorkerInit,
        rules: Arc<Vec<Rule>>,
    ) -> Self {
        let handles = (0..worker_count)
            .map(|_| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let rules = rules.clone();
                let language = init.language;
                std::thread::spawn(move || {
                    loop {
                        let task = {
                            let rx = job_rx.lock().unwrap();
                            rx.recv()
                        };
                        let Ok(task) = task else { break };
                        let id = task.id;
                        let file_path = task.file_path.clone();
                        let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            analyze_file(&task.file_path, language, &rules)
                        })) {
                            Ok((summary, logs)) => TaskOutcome::Result {
                                id,
                                file_path,
                                summary,
                                logs,
                            },
                            Err(_) => TaskOutcome::Error {
                                id,
                                file_path,
                                message: "worker panicked while analyzing file".to_string(),
                            },
                        };
                        let is_error = matches!(outcome, TaskOutcome::Error { .. });
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                        if is_error {
                            break;
                        }
                    }
                })
            })
            .collect();
        Self { handles }
    }

    /// Block until every worker thread has exited (its job queue drained).
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn analyze_file_reports_parse_failure_as_synthetic_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ts");
        fs::write(&path, "const = = =;\n").unwrap();

        let (summary, logs) = analyze_file(&path, Language::En, &[]);
        assert_eq!(summary.total_violations, 1);
        assert_eq!(summary.error_violations, 1);
        assert!(summary.violations.is_empty());
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn analyze_file_reports_missing_file_as_synthetic_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.ts");

        let (summary, logs) = analyze_file(&path, Language::En, &[]);
        assert_eq!(summary.total_violations, 1);
        assert_eq!(summary.error_violations, 1);
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn analyze_file_runs_rules_over_valid_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.ts");
        fs::write(&path, "import x from '../../../../deep';\n").unwrap();

        let rules = vec![crate::rules::no_deep_relative_imports::rule()];
        let (summary, logs) = analyze_file(&path, Language::En, &rules);
        assert_eq!(summary.total_violations, 1);
        assert!(logs.is_empty());
    }
}
