//! `no-circular-dependencies` (base, warning) — `spec.md` §4.4.2.
//!
//! Resolves the current file's own imports, then for each relative/alias
//! target runs a depth-limited DFS over a lazily-expanded, cache-memoised
//! import graph looking for a path back to the importing file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use regex::Regex;
use std::sync::OnceLock;

use crate::context::{ReportDetails, RuleContext};
use crate::resolver::{ResolvedKind, Resolver};
use crate::rule::{Rule, Severity, Tag};

/// Bounds worst-case DFS cost on pathological repos (`spec.md` §9 — these
/// are load-bearing, not tunable runtime flags).
const MAX_GRAPH_NODES: usize = 2000;
const MAX_GRAPH_DEPTH: usize = 80;

/// Per-scan state shared by every invocation of this rule across every
/// file and every worker: the resolver (itself internally cache-locked) and
/// the set of cycle canonical keys already reported this scan.
pub struct CycleDetectorState {
    pub resolver: Arc<Resolver>,
    reported_cycles: Mutex<HashSet<String>>,
    neighbor_cache: Mutex<HashMap<PathBuf, Arc<Vec<(PathBuf, ResolvedKind)>>>>,
}

impl CycleDetectorState {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            reported_cycles: Mutex::new(HashSet::new()),
            neighbor_cache: Mutex::new(HashMap::new()),
        }
    }

    fn neighbors_of(&self, file: &Path) -> Arc<Vec<(PathBuf, ResolvedKind)>> {
        if let Some(cached) = self.neighbor_cache.lock().unwrap().get(file) {
            return cached.clone();
        }
        let neighbors = Arc::new(scan_neighbors(&self.resolver, file));
        self.neighbor_cache
            .lock()
            .unwrap()
            .insert(file.to_path_buf(), neighbors.clone());
        neighbors
    }
}

pub fn rule(state: Arc<CycleDetectorState>) -> Rule {
    Rule::new("no-circular-dependencies", Tag::Base, Severity::Warning, move |ctx| {
        run(ctx, &state)
    })
}

fn run(ctx: &RuleContext, state: &CycleDetectorState) {
    let origin = normalize_absolute(ctx.file_path);
    let mut warned_specifiers = HashSet::new();

    for import in ctx.helpers.imports() {
        let outcome = state.resolver.resolve(&origin, &import.value);

        if outcome.resolved.is_none() {
            if outcome.should_warn && warned_specifiers.insert(import.value.clone()) {
                ctx.helpers.report_violation(
                    ReportDetails {
                        description: ctx.messages.unresolved_import(&import.value),
                        code: Some(import.value.clone()),
                        ..Default::default()
                    },
                    Some(import.span),
                );
            }
            continue;
        }

        let Some(kind) = outcome.kind else { continue };
        if !matches!(kind, ResolvedKind::Relative | ResolvedKind::Alias) {
            continue;
        }
        let target = outcome.resolved.unwrap();

        let mut visiting = vec![target.clone()];
        let mut dead_ends = HashSet::new();
        let mut node_budget = MAX_GRAPH_NODES;
        if let Some(mut cycle) = search(state, &target, &origin, &mut visiting, &mut dead_ends, &mut node_budget, 1)
        {
            cycle.insert(0, origin.clone());
            let (key, canonical_origin) = canonical_cycle_key_and_origin(&cycle);
            // Only the file at the cycle's lexicographically-least rotation
            // claims the report. Every file on the cycle computes the same
            // (key, canonical_origin) pair independently of scan order, so
            // this is deterministic regardless of which worker finishes
            // first (`spec.md` §8's byte-identical-across-worker-counts).
            if canonical_origin != origin {
                continue;
            }
            let mut reported = state.reported_cycles.lock().unwrap();
            if reported.insert(key) {
                drop(reported);
                let chain = cycle
                    .iter()
                    .chain(std::iter::once(&origin))
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                ctx.helpers.report_violation(
                    ReportDetails {
                        description: ctx.messages.circular_dependency(&chain),
                        code: Some(chain.clone()),
                        ..Default::default()
                    },
                    Some(import.span),
                );
            }
        }
    }
}

/// DFS from `node` looking for a path back to `origin`. Returns the node
/// sequence from `node` (inclusive) to just before `origin` on success.
fn search(
    state: &CycleDetectorState,
    node: &Path,
    origin: &Path,
    visiting: &mut Vec<PathBuf>,
    dead_ends: &mut HashSet<PathBuf>,
    node_budget: &mut usize,
    depth: usize,
) -> Option<Vec<PathBuf>> {
    if *node_budget == 0 || depth > MAX_GRAPH_DEPTH {
        return None;
    }
    *node_budget -= 1;

    for (neighbor, _) in state.neighbors_of(node).iter() {
        if neighbor == origin {
            return Some(visiting.clone());
        }
        if dead_ends.contains(neighbor) || visiting.contains(neighbor) {
            continue;
        }
        visiting.push(neighbor.clone());
        let found = search(state, neighbor, origin, visiting, dead_ends, node_budget, depth + 1);
        if found.is_some() {
            return found;
        }
        visiting.pop();
        dead_ends.insert(neighbor.clone());
    }

    None
}

/// Cheap regex scan for static/dynamic imports, `require`, and `export ...
/// from` in a neighbour file, each resolved through the same resolver —
/// this deliberately avoids a full parse for graph expansion.
fn scan_neighbors(resolver: &Resolver, file: &Path) -> Vec<(PathBuf, ResolvedKind)> {
    let Ok(source) = fs::read_to_string(file) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut neighbors = Vec::new();
    for specifier in import_like_specifiers(&source) {
        let outcome = resolver.resolve(file, &specifier);
        if let (Some(target), Some(kind)) = (outcome.resolved, outcome.kind) {
            if seen.insert(target.clone()) {
                neighbors.push((target, kind));
            }
        }
    }
    neighbors
}

fn import_like_specifiers(source: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?:import\s+(?:[^'"]*?\s+from\s+)?|export\s+[^'"]*?\s+from\s+|import\s*\(\s*|require\s*\(\s*)['"]([^'"]+)['"]"#,
        )
        .expect("static regex is valid")
    });
    re.captures_iter(source)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Rotate `cycle` (the node sequence, not including the trailing return to
/// `origin`) to its lexicographically least form, joined with `->`, and
/// return which node that rotation starts at — the cycle's canonical origin.
/// Every file on the cycle computes the same pair, so whichever of them is
/// actually being scanned can tell, without coordination, whether it is the
/// one responsible for reporting.
fn canonical_cycle_key_and_origin(cycle: &[PathBuf]) -> (String, PathBuf) {
    let strings: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
    let (key, start) = (0..strings.len())
        .map(|start| {
            let rotated = strings[start..]
                .iter()
                .chain(strings[..start].iter())
                .cloned()
                .collect::<Vec<_>>()
                .join("->");
            (rotated, start)
        })
        .min_by(|a, b| a.0.cmp(&b.0))
        .unwrap_or_default();
    (key, cycle[start].clone())
}

fn normalize_absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::create_context;
    use crate::messages::Language;
    use crate::parser::{Parser, SwcParser};
    use crate::reporter::Reporter;
    use crate::source_index::SourceIndex;
    use std::fs;
    use tempfile::tempdir;

    fn scan_file(project_root: &Path, file: &Path, state: Arc<CycleDetectorState>) -> crate::reporter::FileScanResult {
        let source = fs::read_to_string(file).unwrap();
        let source_map: Arc<swc_common::SourceMap> = Default::default();
        let ast = SwcParser.parse(&source_map, &source, file).unwrap();
        let source_index = SourceIndex::build(&source, ast.module_start);
        let reporter = Reporter::new(file.to_path_buf(), &source, &source_index);
        let ctx = create_context(&ast, file, &source, Language::En, reporter);
        let _ = project_root;
        crate::context::run_rules(&ctx, &[rule(state)])
    }

    #[test]
    fn detects_direct_cycle() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "import './b';\n").unwrap();
        fs::write(dir.path().join("b.ts"), "import './a';\n").unwrap();

        let resolver = Arc::new(Resolver::new(dir.path().to_path_buf(), None));
        let state = Arc::new(CycleDetectorState::new(resolver));

        let result_a = scan_file(dir.path(), &dir.path().join("a.ts"), state.clone());
        assert_eq!(result_a.violations.len(), 1);
        assert!(result_a.violations[0].code.as_ref().unwrap().contains("a.ts"));
        assert!(result_a.violations[0].code.as_ref().unwrap().contains("b.ts"));
    }

    #[test]
    fn does_not_report_the_same_cycle_twice() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "import './b';\n").unwrap();
        fs::write(dir.path().join("b.ts"), "import './a';\n").unwrap();

        let resolver = Arc::new(Resolver::new(dir.path().to_path_buf(), None));
        let state = Arc::new(CycleDetectorState::new(resolver));

        let result_a = scan_file(dir.path(), &dir.path().join("a.ts"), state.clone());
        let result_b = scan_file(dir.path(), &dir.path().join("b.ts"), state.clone());
        assert_eq!(result_a.violations.len() + result_b.violations.len(), 1);
    }

    #[test]
    fn acyclic_imports_produce_no_violation() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "import './b';\n").unwrap();
        fs::write(dir.path().join("b.ts"), "export const b = 1;\n").unwrap();

        let resolver = Arc::new(Resolver::new(dir.path().to_path_buf(), None));
        let state = Arc::new(CycleDetectorState::new(resolver));

        let result = scan_file(dir.path(), &dir.path().join("a.ts"), state);
        assert!(result.violations.is_empty());
    }
}
