//! `no-swallowed-errors` (base, warning) — `spec.md` §4.4.3.
//!
//! Flags `try` statements whose `catch` and `finally` blocks are both
//! empty: the error is neither handled nor rethrown, it just disappears.

use crate::analysis::Span;
use crate::context::{ReportDetails, RuleContext};
use crate::rule::{Rule, Severity, Tag};

use super::{first_line_containing_any_from, pick_line};

pub fn rule() -> Rule {
    Rule::new("no-swallowed-errors", Tag::Base, Severity::Warning, run)
}

fn run(ctx: &RuleContext) {
    for try_record in &ctx.analysis.try_statements {
        if try_record.catch_has_executable || try_record.finally_has_executable {
            continue;
        }

        let target_span: Span = try_record
            .catch_span
            .or(try_record.finally_span)
            .unwrap_or(try_record.try_span);
        let span_line = ctx.line_of_span(target_span);
        let fallback_line = first_line_containing_any_from(
            ctx.source,
            span_line.unwrap_or(1),
            &["catch", "finally", "try"],
        );
        let line = pick_line(span_line, fallback_line);

        ctx.helpers.report_violation(
            ReportDetails {
                description: ctx.messages.swallowed_error(),
                line,
                ..Default::default()
            },
            Some(target_span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scan_with_rules;

    #[test]
    fn flags_empty_catch_and_no_finally() {
        let source = "try {\n  doWork();\n} catch (e) {}\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn flags_catch_with_only_empty_statements() {
        let source = "try {\n  doWork();\n} catch (e) {;;}\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn allows_catch_that_logs() {
        let source = "try {\n  doWork();\n} catch (e) {\n  log(e);\n}\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn allows_empty_catch_with_executable_finally() {
        let source = "try {\n  doWork();\n} catch (e) {} finally {\n  cleanup();\n}\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }
}
