//! Built-in rule set (C4). Each submodule is one rule; `built_in_rules()`
//! assembles them in the fixed order they run in (`spec.md` §4.4).

pub mod no_catastrophic_regex;
pub mod no_circular_dependencies;
pub mod no_deep_clone_in_loop;
pub mod no_deep_relative_imports;
pub mod no_n2_array_lookup;
pub mod no_swallowed_errors;

use std::sync::Arc;

use no_circular_dependencies::CycleDetectorState;

use crate::rule::Rule;

/// Assemble the built-in rule set. `cycle_state` is the per-scan resolver +
/// reported-cycle-keys state `no-circular-dependencies` needs beyond the
/// per-file `RuleContext` (`spec.md` §4.4.2's "already reported in this
/// scan" dedupe is scan-wide, not per-file).
pub fn built_in_rules(cycle_state: Arc<CycleDetectorState>) -> Vec<Rule> {
    vec![
        no_deep_relative_imports::rule(),
        no_circular_dependencies::rule(cycle_state),
        no_swallowed_errors::rule(),
        no_catastrophic_regex::rule(),
        no_deep_clone_in_loop::rule(),
        no_n2_array_lookup::rule(),
    ]
}

/// First 1-based source line containing every needle, or `None`.
pub(crate) fn first_line_containing_all(source: &str, needles: &[&str]) -> Option<usize> {
    for (index, line) in source.lines().enumerate() {
        if needles.iter().all(|needle| line.contains(needle)) {
            return Some(index + 1);
        }
    }
    None
}

/// First 1-based source line at or after `start_line` containing any
/// needle, or `None`.
pub(crate) fn first_line_containing_any_from(
    source: &str,
    start_line: usize,
    needles: &[&str],
) -> Option<usize> {
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        if line_number < start_line {
            continue;
        }
        if needles.iter().any(|needle| line.contains(needle)) {
            return Some(line_number);
        }
    }
    None
}

/// Combine a span-derived line and a text-search fallback line, per
/// `spec.md`'s "when both yield a line, pick the larger" rule (it guards
/// against the span resolving to a leading comment).
pub(crate) fn pick_line(span_line: Option<usize>, fallback_line: Option<usize>) -> Option<usize> {
    match (span_line, fallback_line) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_rules_has_six_rules_in_order() {
        let resolver = Arc::new(crate::resolver::Resolver::new(std::env::temp_dir(), None));
        let state = Arc::new(CycleDetectorState::new(resolver));
        let rules = built_in_rules(state);
        let names: Vec<_> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "no-deep-relative-imports",
                "no-circular-dependencies",
                "no-swallowed-errors",
                "no-catastrophic-regex",
                "no-deep-clone-in-loop",
                "no-n2-array-lookup",
            ]
        );
    }

    #[test]
    fn pick_line_prefers_larger() {
        assert_eq!(pick_line(Some(3), Some(5)), Some(5));
        assert_eq!(pick_line(Some(5), Some(3)), Some(5));
        assert_eq!(pick_line(None, Some(3)), Some(3));
        assert_eq!(pick_line(None, None), None);
    }
}
