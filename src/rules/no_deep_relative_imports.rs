//! `no-deep-relative-imports` (base, warning) — `spec.md` §4.4.1.
//!
//! Flags relative specifiers that climb more than two directories, which
//! tend to break the moment a file moves.

use crate::context::{ReportDetails, RuleContext};
use crate::reporter::Suggestion;
use crate::rule::{Rule, Severity, Tag};

use super::{first_line_containing_all, pick_line};

const MAX_RELATIVE_DEPTH: usize = 2;

pub fn rule() -> Rule {
    Rule::new("no-deep-relative-imports", Tag::Base, Severity::Warning, run)
}

fn run(ctx: &RuleContext) {
    for import in ctx.helpers.imports() {
        if !ctx.helpers.is_relative_path(&import.value) {
            continue;
        }
        let depth = ctx.helpers.relative_depth(&import.value);
        if depth <= MAX_RELATIVE_DEPTH {
            continue;
        }

        let span_line = ctx.line_of_span(import.span);
        let fallback_line = first_line_containing_all(ctx.source, &["import", &import.value]);
        let line = pick_line(span_line, fallback_line);

        ctx.helpers.report_violation(
            ReportDetails {
                description: ctx.messages.deep_relative_import(&import.value),
                code: Some(import.value.clone()),
                suggestions: vec![
                    Suggestion::new(ctx.messages.alias_suggestion()),
                    Suggestion::new(ctx.messages.barrel_suggestion()),
                ],
                line,
                ..Default::default()
            },
            Some(import.span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scan_with_rules;

    #[test]
    fn flags_imports_deeper_than_two_levels() {
        let source = "import Button from '../../../components/Button';\n";
        let result = scan_with_rules(source, "src/pages/a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].code.as_deref(), Some("../../../components/Button"));
        assert_eq!(result.violations[0].suggestions.len(), 2);
    }

    #[test]
    fn allows_imports_at_or_below_two_levels() {
        let source = "import Button from '../../components/Button';\n";
        let result = scan_with_rules(source, "src/pages/a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn ignores_non_relative_specifiers() {
        let source = "import React from 'react';\n";
        let result = scan_with_rules(source, "src/pages/a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }
}
