//! `no-n2-array-lookup` (performance, optimizing) — `spec.md` §4.4.6.
//!
//! A linear-scan array method called on every iteration of a hot path turns
//! an O(n) loop into O(n²). No receiver-type inference is attempted — the
//! method name alone is the signal.

use swc_ecma_ast::{Callee, Expr, MemberProp};

use crate::context::{ReportDetails, RuleContext};
use crate::rule::{Rule, Severity, Tag};

const LINEAR_SCAN_METHODS: &[&str] = &[
    "find",
    "findIndex",
    "filter",
    "some",
    "every",
    "includes",
    "indexOf",
    "lastIndexOf",
];

pub fn rule() -> Rule {
    Rule::new("no-n2-array-lookup", Tag::Performance, Severity::Optimizing, run)
}

fn run(ctx: &RuleContext) {
    for call in &ctx.analysis.hot_path.call_expressions {
        let Callee::Expr(expr) = &call.callee else {
            continue;
        };
        let Expr::Member(member) = expr.as_ref() else {
            continue;
        };
        let MemberProp::Ident(ident) = &member.prop else {
            continue;
        };
        let method = ident.sym.as_str();
        if !LINEAR_SCAN_METHODS.contains(&method) {
            continue;
        }

        ctx.helpers.report_violation(
            ReportDetails {
                description: ctx.messages.n2_array_lookup(method),
                code: Some(method.to_string()),
                ..Default::default()
            },
            Some(call.span.into()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scan_with_rules;

    #[test]
    fn flags_find_in_loop() {
        let source = "for (const id of ids) { items.find(i => i.id === id); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].code.as_deref(), Some("find"));
    }

    #[test]
    fn flags_includes_in_loop() {
        let source = "for (const id of ids) { seen.includes(id); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn ignores_linear_scan_outside_hot_path() {
        let source = "items.find(i => i.id === 1);\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn ignores_unrelated_methods() {
        let source = "for (const id of ids) { items.map(i => i.id); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }
}
