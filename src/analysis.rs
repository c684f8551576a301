//! One-pass syntax-tree walk producing the shared indices every rule reads (C2).
//!
//! A single DFS over the parsed module builds: the ordered import list, the
//! ordered loop list, the ordered try-statement list, and the "hot path"
//! triple (call expressions, new expressions, regex literals) restricted to
//! syntactic hot paths — loop bodies and the callback argument of array
//! higher-order methods. See `spec.md` §4.2 for the exact propagation rules;
//! this module implements them verbatim.

use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

/// A byte-offset range within the coordinate space the parser's spans use
/// (i.e. relative to the shared `SourceMap`, not necessarily to this file —
/// see `SourceIndex`, which knows how to subtract `moduleStart`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl From<swc_common::Span> for Span {
    fn from(s: swc_common::Span) -> Self {
        Span {
            start: s.lo.0,
            end: s.hi.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Static,
    Dynamic,
    Require,
}

#[derive(Debug, Clone)]
pub struct ImportReference {
    pub kind: ImportKind,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
    ForIn,
    ForOf,
}

#[derive(Debug, Clone)]
pub struct LoopRecord {
    pub kind: LoopKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TryRecord {
    pub try_span: Span,
    pub catch_span: Option<Span>,
    pub finally_span: Option<Span>,
    pub catch_has_executable: bool,
    pub finally_has_executable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HotPath {
    pub call_expressions: Vec<CallExpr>,
    pub new_expressions: Vec<NewExpr>,
    pub reg_exp_literals: Vec<Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub imports: Vec<ImportReference>,
    pub loops: Vec<LoopRecord>,
    pub try_statements: Vec<TryRecord>,
    pub hot_path: HotPath,
}

/// Member-expression method names whose first-argument callback runs on
/// every element — the callback body is a hot path.
const HOT_CALLBACK_METHODS: &[&str] = &[
    "map",
    "forEach",
    "reduce",
    "reduceRight",
    "filter",
    "some",
    "every",
    "find",
    "findIndex",
    "flatMap",
];

pub fn analyze(module: &Module) -> Analysis {
    let mut visitor = AnalysisVisitor {
        analysis: Analysis::default(),
        hot: false,
    };
    module.visit_with(&mut visitor);
    visitor.analysis
}

struct AnalysisVisitor {
    analysis: Analysis,
    hot: bool,
}

impl AnalysisVisitor {
    /// Visit the first argument of a recognised hot-callback call: its body
    /// runs with `hot` forced true regardless of the ambient flag, and
    /// (crucially) without going through `visit_function`/`visit_arrow_expr`,
    /// which would otherwise reset the flag to false for it.
    fn visit_hot_callback_arg(&mut self, expr: &Expr) {
        match expr {
            Expr::Fn(FnExpr { function, .. }) => {
                let outer = self.hot;
                self.hot = true;
                for param in &function.params {
                    param.visit_with(self);
                }
                if let Some(body) = &function.body {
                    body.visit_with(self);
                }
                self.hot = outer;
            }
            Expr::Arrow(arrow) => {
                let outer = self.hot;
                self.hot = true;
                for param in &arrow.params {
                    param.visit_with(self);
                }
                match &*arrow.body {
                    BlockStmtOrExpr::BlockStmt(block) => block.visit_with(self),
                    BlockStmtOrExpr::Expr(e) => e.visit_with(self),
                }
                self.hot = outer;
            }
            other => other.visit_with(self),
        }
    }

    fn with_hot<T>(&mut self, hot: bool, visit: impl FnOnce(&mut Self) -> T) -> T {
        let outer = self.hot;
        self.hot = hot;
        let result = visit(self);
        self.hot = outer;
        result
    }
}

fn is_hot_callback_callee(callee: &Callee) -> bool {
    match callee {
        Callee::Expr(expr) => match expr.as_ref() {
            Expr::Member(member) => match &member.prop {
                MemberProp::Ident(ident) => HOT_CALLBACK_METHODS.contains(&ident.sym.as_str()),
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}

fn callee_object_is_require(member: &MemberExpr) -> bool {
    matches!(member.obj.as_ref(), Expr::Ident(ident) if &*ident.sym == "require")
}

fn callee_is_require_ident(callee: &Callee) -> bool {
    matches!(
        callee,
        Callee::Expr(expr) if matches!(expr.as_ref(), Expr::Ident(ident) if &*ident.sym == "require")
    )
}

fn first_string_literal_arg(args: &[ExprOrSpread]) -> Option<String> {
    let first = args.first()?;
    if first.spread.is_some() {
        return None;
    }
    match first.expr.as_ref() {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
    }
}

fn block_has_executable_statements(block: &BlockStmt) -> bool {
    !block.stmts.iter().all(stmt_is_effectively_empty)
}

fn stmt_is_effectively_empty(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Empty(_) => true,
        Stmt::Block(block) => block.stmts.iter().all(stmt_is_effectively_empty),
        _ => false,
    }
}

impl Visit for AnalysisVisitor {
    fn visit_import_decl(&mut self, node: &ImportDecl) {
        self.analysis.imports.push(ImportReference {
            kind: ImportKind::Static,
            value: node.src.value.to_string(),
            span: node.src.span.into(),
        });
        // Deliberately do not descend: an ImportDeclaration has no nested
        // hot-path-relevant content.
    }

    fn visit_for_stmt(&mut self, node: &ForStmt) {
        self.analysis.loops.push(LoopRecord {
            kind: LoopKind::For,
            span: node.span.into(),
        });
        if let Some(init) = &node.init {
            init.visit_with(self);
        }
        self.with_hot(true, |this| {
            if let Some(test) = &node.test {
                test.visit_with(this);
            }
            if let Some(update) = &node.update {
                update.visit_with(this);
            }
            node.body.visit_with(this);
        });
    }

    fn visit_while_stmt(&mut self, node: &WhileStmt) {
        self.analysis.loops.push(LoopRecord {
            kind: LoopKind::While,
            span: node.span.into(),
        });
        self.with_hot(true, |this| {
            node.test.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_do_while_stmt(&mut self, node: &DoWhileStmt) {
        self.analysis.loops.push(LoopRecord {
            kind: LoopKind::DoWhile,
            span: node.span.into(),
        });
        self.with_hot(true, |this| {
            node.test.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_for_in_stmt(&mut self, node: &ForInStmt) {
        self.analysis.loops.push(LoopRecord {
            kind: LoopKind::ForIn,
            span: node.span.into(),
        });
        node.left.visit_with(self);
        node.right.visit_with(self);
        self.with_hot(true, |this| node.body.visit_with(this));
    }

    fn visit_for_of_stmt(&mut self, node: &ForOfStmt) {
        self.analysis.loops.push(LoopRecord {
            kind: LoopKind::ForOf,
            span: node.span.into(),
        });
        node.left.visit_with(self);
        node.right.visit_with(self);
        self.with_hot(true, |this| node.body.visit_with(this));
    }

    fn visit_try_stmt(&mut self, node: &TryStmt) {
        let catch_has_executable = node
            .handler
            .as_ref()
            .map(|h| block_has_executable_statements(&h.body))
            .unwrap_or(false);
        let finally_has_executable = node
            .finalizer
            .as_ref()
            .map(block_has_executable_statements)
            .unwrap_or(false);
        self.analysis.try_statements.push(TryRecord {
            try_span: node.span.into(),
            catch_span: node.handler.as_ref().map(|h| h.body.span.into()),
            finally_span: node.finalizer.as_ref().map(|f| f.span.into()),
            catch_has_executable,
            finally_has_executable,
        });
        node.visit_children_with(self);
    }

    fn visit_call_expr(&mut self, node: &CallExpr) {
        match &node.callee {
            Callee::Import(_) => {
                if let Some(value) = first_string_literal_arg(&node.args) {
                    self.analysis.imports.push(ImportReference {
                        kind: ImportKind::Dynamic,
                        value,
                        span: node.span.into(),
                    });
                }
            }
            callee if callee_is_require_ident(callee) => {
                if let Some(value) = first_string_literal_arg(&node.args) {
                    self.analysis.imports.push(ImportReference {
                        kind: ImportKind::Require,
                        value,
                        span: node.span.into(),
                    });
                }
            }
            Callee::Expr(expr) => {
                if let Expr::Member(member) = expr.as_ref() {
                    if callee_object_is_require(member) {
                        if let Some(value) = first_string_literal_arg(&node.args) {
                            self.analysis.imports.push(ImportReference {
                                kind: ImportKind::Require,
                                value,
                                span: node.span.into(),
                            });
                        }
                    }
                }
            }
            _ => {}
        }

        if self.hot {
            self.analysis.hot_path.call_expressions.push(node.clone());
        }

        if is_hot_callback_callee(&node.callee) {
            node.callee.visit_with(self);
            for (index, arg) in node.args.iter().enumerate() {
                if index == 0 && arg.spread.is_none() {
                    self.visit_hot_callback_arg(&arg.expr);
                } else {
                    arg.visit_with(self);
                }
            }
        } else {
            node.visit_children_with(self);
        }
    }

    fn visit_new_expr(&mut self, node: &NewExpr) {
        if self.hot {
            self.analysis.hot_path.new_expressions.push(node.clone());
        }
        node.visit_children_with(self);
    }

    fn visit_regex(&mut self, node: &Regex) {
        if self.hot {
            self.analysis.hot_path.reg_exp_literals.push(node.clone());
        }
        node.visit_children_with(self);
    }

    fn visit_function(&mut self, node: &Function) {
        self.with_hot(false, |this| node.visit_children_with(this));
    }

    fn visit_arrow_expr(&mut self, node: &ArrowExpr) {
        self.with_hot(false, |this| node.visit_children_with(this));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use swc_common::SourceMap;

    fn parse(source: &str) -> Module {
        let source_map: Arc<SourceMap> = Default::default();
        crate::parser::Parser::parse(
            &crate::parser::SwcParser,
            &source_map,
            source,
            &PathBuf::from("a.ts"),
        )
        .unwrap()
        .module
    }

    #[test]
    fn records_static_imports_in_source_order() {
        let module = parse("import a from './a';\nimport b from './b';\n");
        let analysis = analyze(&module);
        assert_eq!(analysis.imports.len(), 2);
        assert_eq!(analysis.imports[0].value, "./a");
        assert_eq!(analysis.imports[1].value, "./b");
        assert!(analysis.imports.iter().all(|i| i.kind == ImportKind::Static));
    }

    #[test]
    fn records_dynamic_and_require_imports() {
        let module = parse("const a = require('./a');\nimport('./b');\n");
        let analysis = analyze(&module);
        assert_eq!(analysis.imports.len(), 2);
        assert_eq!(analysis.imports[0].kind, ImportKind::Require);
        assert_eq!(analysis.imports[1].kind, ImportKind::Dynamic);
    }

    #[test]
    fn regex_outside_loop_is_not_hot() {
        let module = parse("const r = /abc/;\n");
        let analysis = analyze(&module);
        assert!(analysis.hot_path.reg_exp_literals.is_empty());
    }

    #[test]
    fn regex_inside_for_of_body_is_hot() {
        let module = parse("for (const s of xs) { /(a+)+$/.test(s); }\n");
        let analysis = analyze(&module);
        assert_eq!(analysis.hot_path.reg_exp_literals.len(), 1);
        assert_eq!(analysis.loops.len(), 1);
        assert_eq!(analysis.loops[0].kind, LoopKind::ForOf);
    }

    #[test]
    fn map_callback_body_is_hot() {
        let module = parse("items.map(i => structuredClone(i));\n");
        let analysis = analyze(&module);
        // structuredClone(i) and the map(...) call itself (not hot, top-level)
        assert_eq!(analysis.hot_path.call_expressions.len(), 1);
    }

    #[test]
    fn nested_function_inside_loop_resets_hot() {
        let module = parse(
            "for (const x of xs) { function helper() { return /a+/; } helper(); }\n",
        );
        let analysis = analyze(&module);
        assert!(analysis.hot_path.reg_exp_literals.is_empty());
        // the call to helper() itself is still in the loop body, so it's hot
        assert_eq!(analysis.hot_path.call_expressions.len(), 1);
    }

    #[test]
    fn for_loop_init_is_not_hot_but_test_update_body_are() {
        let module = parse("for (let i = /init/; i < 10; i++) { /body/; }\n");
        let analysis = analyze(&module);
        assert_eq!(analysis.hot_path.reg_exp_literals.len(), 1);
    }

    #[test]
    fn try_statement_records_executable_blocks() {
        let module = parse("try { doWork(); } catch (e) {} finally {}\n");
        let analysis = analyze(&module);
        assert_eq!(analysis.try_statements.len(), 1);
        let record = &analysis.try_statements[0];
        assert!(!record.catch_has_executable);
        assert!(!record.finally_has_executable);
    }

    #[test]
    fn try_statement_with_real_catch_handling_has_executable_catch() {
        let module = parse("try { doWork(); } catch (e) { log(e); }\n");
        let analysis = analyze(&module);
        assert!(analysis.try_statements[0].catch_has_executable);
    }
}
