//! `no-catastrophic-regex` (performance, optimizing) — `spec.md` §4.4.4.
//!
//! Scans hot-path regex patterns for nested unbounded quantifiers — the
//! `(a+)+` shape that makes a regex engine's backtracking blow up
//! exponentially on adversarial input.

use swc_ecma_ast::{Callee, Expr, ExprOrSpread, Lit};

use crate::analysis::Span;
use crate::context::{ReportDetails, RuleContext};
use crate::rule::{Rule, Severity, Tag};

pub fn rule() -> Rule {
    Rule::new("no-catastrophic-regex", Tag::Performance, Severity::Optimizing, run)
}

fn run(ctx: &RuleContext) {
    for candidate in collect_candidates(ctx) {
        if has_nested_unbounded_quantifier(&candidate.pattern) {
            ctx.helpers.report_violation(
                ReportDetails {
                    description: ctx.messages.catastrophic_regex(&candidate.pattern),
                    code: Some(candidate.pattern.clone()),
                    ..Default::default()
                },
                Some(candidate.span),
            );
        }
    }
}

struct Candidate {
    pattern: String,
    span: Span,
}

fn collect_candidates(ctx: &RuleContext) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for regex in &ctx.analysis.hot_path.reg_exp_literals {
        candidates.push(Candidate {
            pattern: regex.exp.to_string(),
            span: regex.span.into(),
        });
    }

    for call in &ctx.analysis.hot_path.call_expressions {
        if callee_name(&call.callee).as_deref() == Some("RegExp") {
            if let Some(pattern) = static_pattern_from_args(&call.args) {
                candidates.push(Candidate {
                    pattern,
                    span: call.span.into(),
                });
            }
        }
    }

    for new_expr in &ctx.analysis.hot_path.new_expressions {
        if matches!(new_expr.callee.as_ref(), Expr::Ident(ident) if &*ident.sym == "RegExp") {
            if let Some(args) = &new_expr.args {
                if let Some(pattern) = static_pattern_from_args(args) {
                    candidates.push(Candidate {
                        pattern,
                        span: new_expr.span.into(),
                    });
                }
            }
        }
    }

    candidates
}

fn callee_name(callee: &Callee) -> Option<String> {
    match callee {
        Callee::Expr(expr) => match expr.as_ref() {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn static_pattern_from_args(args: &[ExprOrSpread]) -> Option<String> {
    let first = args.first()?;
    if first.spread.is_some() {
        return None;
    }
    match first.expr.as_ref() {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        Expr::Tpl(tpl) if tpl.exprs.is_empty() => tpl.quasis.first().map(|quasi| {
            quasi
                .cooked
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| quasi.raw.to_string())
        }),
        _ => None,
    }
}

fn has_nested_unbounded_quantifier(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    let mut in_class = false;
    let mut stack: Vec<bool> = Vec::new();
    let mut found = false;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && i + 1 < chars.len() {
            i += 2;
            let (unbounded, next) = parse_quantifier(&chars, i);
            i = next;
            if unbounded {
                mark_top_unbounded(&mut stack);
            }
            continue;
        }

        if in_class {
            if c == ']' {
                in_class = false;
                i += 1;
                let (unbounded, next) = parse_quantifier(&chars, i);
                i = next;
                if unbounded {
                    mark_top_unbounded(&mut stack);
                }
            } else {
                i += 1;
            }
            continue;
        }

        match c {
            '[' => {
                in_class = true;
                i += 1;
            }
            '(' => {
                stack.push(false);
                i += 1;
            }
            ')' => {
                let had_unbounded = stack.pop().unwrap_or(false);
                i += 1;
                let (unbounded, next) = parse_quantifier(&chars, i);
                i = next;
                if had_unbounded && unbounded {
                    found = true;
                }
                if unbounded {
                    mark_top_unbounded(&mut stack);
                }
            }
            _ => {
                i += 1;
                let (unbounded, next) = parse_quantifier(&chars, i);
                i = next;
                if unbounded {
                    mark_top_unbounded(&mut stack);
                }
            }
        }
    }

    found
}

fn mark_top_unbounded(stack: &mut [bool]) {
    if let Some(top) = stack.last_mut() {
        *top = true;
    }
}

/// Returns `(is_unbounded, index_after_quantifier)`. `index_after_quantifier`
/// equals `i` unchanged when there is no quantifier at `i`.
fn parse_quantifier(chars: &[char], i: usize) -> (bool, usize) {
    if i >= chars.len() {
        return (false, i);
    }
    match chars[i] {
        '*' => (true, skip_greediness(chars, i + 1)),
        '+' => (true, skip_greediness(chars, i + 1)),
        '?' => (false, skip_greediness(chars, i + 1)),
        '{' => match parse_brace_quantifier(chars, i) {
            Some((unbounded, end)) => (unbounded, skip_greediness(chars, end)),
            None => (false, i),
        },
        _ => (false, i),
    }
}

fn skip_greediness(chars: &[char], i: usize) -> usize {
    if i < chars.len() && (chars[i] == '?' || chars[i] == '+') {
        i + 1
    } else {
        i
    }
}

/// Parses `{m}`, `{m,}`, or `{m,n}` starting at `chars[i] == '{'`. Returns
/// `(is_unbounded, index_of_char_after_closing_brace)`, or `None` if the
/// text at `i` is not a well-formed brace quantifier (e.g. a literal `{`).
fn parse_brace_quantifier(chars: &[char], i: usize) -> Option<(bool, usize)> {
    let mut j = i + 1;
    let digits_start = j;
    while j < chars.len() && chars[j].is_ascii_digit() {
        j += 1;
    }
    if j == digits_start {
        return None;
    }
    if j < chars.len() && chars[j] == '}' {
        return Some((false, j + 1));
    }
    if j < chars.len() && chars[j] == ',' {
        j += 1;
        let max_start = j;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
        if j < chars.len() && chars[j] == '}' {
            let unbounded = max_start == j;
            return Some((unbounded, j + 1));
        }
    }
    None
}
