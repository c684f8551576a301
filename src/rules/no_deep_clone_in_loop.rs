//! `no-deep-clone-in-loop` (performance, optimizing) — `spec.md` §4.4.5.
//!
//! Deep-cloning on every iteration of a hot path is a classic accidental
//! O(n) (or worse) cost center: `structuredClone` and the
//! `JSON.parse(JSON.stringify(...))` idiom both walk the entire value.

use swc_ecma_ast::{CallExpr, Callee, Expr, MemberProp};

use crate::context::{ReportDetails, RuleContext};
use crate::rule::{Rule, Severity, Tag};

pub fn rule() -> Rule {
    Rule::new("no-deep-clone-in-loop", Tag::Performance, Severity::Optimizing, run)
}

fn run(ctx: &RuleContext) {
    for call in &ctx.analysis.hot_path.call_expressions {
        if let Some(code) = canonical_deep_clone_form(call) {
            ctx.helpers.report_violation(
                ReportDetails {
                    description: ctx.messages.deep_clone_in_loop(code),
                    code: Some(code.to_string()),
                    ..Default::default()
                },
                Some(call.span.into()),
            );
        }
    }
}

fn canonical_deep_clone_form(call: &CallExpr) -> Option<&'static str> {
    if is_structured_clone_call(call) {
        return Some("structuredClone(...)");
    }
    if is_json_round_trip_call(call) {
        return Some("JSON.parse(JSON.stringify(...))");
    }
    None
}

fn is_structured_clone_call(call: &CallExpr) -> bool {
    match &call.callee {
        Callee::Expr(expr) => match expr.as_ref() {
            Expr::Ident(ident) => &*ident.sym == "structuredClone",
            Expr::Member(member) => {
                is_ident(&member.obj, "globalThis") && is_member_prop(&member.prop, "structuredClone")
            }
            _ => false,
        },
        _ => false,
    }
}

fn is_json_round_trip_call(call: &CallExpr) -> bool {
    if !is_member_call(call, "JSON", "parse") {
        return false;
    }
    let Some(first_arg) = call.args.first() else {
        return false;
    };
    if first_arg.spread.is_some() {
        return false;
    }
    match first_arg.expr.as_ref() {
        Expr::Call(inner) => is_member_call(inner, "JSON", "stringify"),
        _ => false,
    }
}

fn is_member_call(call: &CallExpr, object: &str, property: &str) -> bool {
    match &call.callee {
        Callee::Expr(expr) => match expr.as_ref() {
            Expr::Member(member) => is_ident(&member.obj, object) && is_member_prop(&member.prop, property),
            _ => false,
        },
        _ => false,
    }
}

fn is_ident(expr: &Expr, name: &str) -> bool {
    matches!(expr, Expr::Ident(ident) if &*ident.sym == name)
}

fn is_member_prop(prop: &MemberProp, name: &str) -> bool {
    matches!(prop, MemberProp::Ident(ident) if &*ident.sym == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scan_with_rules;

    #[test]
    fn flags_structured_clone_in_loop() {
        let source = "for (const x of xs) { structuredClone(x); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].code.as_deref(), Some("structuredClone(...)"));
    }

    #[test]
    fn flags_global_this_structured_clone_in_loop() {
        let source = "for (const x of xs) { globalThis.structuredClone(x); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn flags_json_round_trip_in_loop() {
        let source = "for (const x of xs) { JSON.parse(JSON.stringify(x)); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert_eq!(
            result.violations[0].code.as_deref(),
            Some("JSON.parse(JSON.stringify(...))")
        );
    }

    #[test]
    fn ignores_deep_clone_outside_hot_path() {
        let source = "structuredClone(x);\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn ignores_plain_json_parse() {
        let source = "for (const x of xs) { JSON.parse(x); }\n";
        let result = scan_with_rules(source, "a.ts", &[rule()]);
        assert!(result.violations.is_empty());
    }
}
