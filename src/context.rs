//! Rule runtime (C3): builds the per-file context every rule runs against
//! and drives rule execution to a flushed `FileScanResult`.

use std::path::Path;

use swc_ecma_ast::Module;

use crate::analysis::{self, Analysis, ImportReference, Span};
use crate::messages::{Language, Messages};
use crate::parser::Ast;
use crate::reporter::{FileScanResult, Reporter, ScopedReporter};
use crate::rule::Rule;
use crate::source_index::SourceIndex;

/// Everything a file's rules are run against: built once per (file, scan)
/// by [`create_context`], discarded once [`run_rules`] returns.
pub struct FileContext<'a> {
    ast: &'a Ast,
    file_path: &'a Path,
    source: &'a str,
    language: Language,
    analysis: Analysis,
    source_index: SourceIndex,
    reporter: Reporter<'a>,
    messages: Messages,
}

pub fn create_context<'a>(
    ast: &'a Ast,
    file_path: &'a Path,
    source: &'a str,
    language: Language,
    reporter: Reporter<'a>,
) -> FileContext<'a> {
    let source_index = SourceIndex::build(source, ast.module_start);
    let analysis = analysis::analyze(&ast.module);
    let messages = Messages::new(language);
    FileContext {
        ast,
        file_path,
        source,
        language,
        analysis,
        source_index,
        reporter,
        messages,
    }
}

/// Run every rule, in order, against `ctx`, then flush the reporter.
///
/// A rule that panics is caught and downgraded to a general notification —
/// one misbehaving rule must not abort the scan of a file.
pub fn run_rules<'s, 'a>(ctx: &'s FileContext<'a>, rules: &[Rule]) -> FileScanResult {
    for rule in rules {
        let scoped = ctx.reporter.for_rule(rule);
        let rule_ctx = RuleContext {
            ast: &ctx.ast.module,
            file_path: ctx.file_path,
            source: ctx.source,
            language: ctx.language,
            analysis: &ctx.analysis,
            source_index: &ctx.source_index,
            messages: &ctx.messages,
            helpers: Helpers {
                imports: &ctx.analysis.imports,
                reporter: scoped,
            },
        };
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (rule.run)(&rule_ctx)));
        if outcome.is_err() {
            ctx.reporter.error(format!(
                "rule execution failed: {} at {}",
                rule.name,
                ctx.file_path.display()
            ));
        }
    }
    ctx.reporter.flush()
}

/// Non-owning view a single rule's `run` function receives. Built fresh for
/// each rule so that `helpers.report_violation` is bound to that rule's own
/// scoped reporter without any shared mutable state.
pub struct RuleContext<'s, 'a> {
    pub ast: &'s Module,
    pub file_path: &'s Path,
    pub source: &'s str,
    pub language: Language,
    pub analysis: &'s Analysis,
    pub source_index: &'s SourceIndex,
    pub messages: &'s Messages,
    pub helpers: Helpers<'s, 'a>,
}

impl<'s, 'a> RuleContext<'s, 'a> {
    pub fn line_of_span(&self, span: Span) -> Option<usize> {
        Some(self.source_index.line_of_byte(self.source, span.start))
    }
}

/// A rule's single finding before the reporter resolves a line number for
/// it. Mirrors `spec.md`'s "a string becomes a message, an object may carry
/// description/code/suggestions/span/line".
pub enum ReportInput {
    Message(String),
    Detailed(ReportDetails),
}

#[derive(Default)]
pub struct ReportDetails {
    pub description: String,
    pub code: Option<String>,
    pub suggestions: Vec<crate::reporter::Suggestion>,
    pub span: Option<Span>,
    pub line: Option<usize>,
}

impl From<&str> for ReportInput {
    fn from(value: &str) -> Self {
        ReportInput::Message(value.to_string())
    }
}

impl From<String> for ReportInput {
    fn from(value: String) -> Self {
        ReportInput::Message(value)
    }
}

impl From<ReportDetails> for ReportInput {
    fn from(value: ReportDetails) -> Self {
        ReportInput::Detailed(value)
    }
}

pub struct Helpers<'s, 'a> {
    imports: &'s [ImportReference],
    reporter: ScopedReporter<'s, 'a>,
}

impl<'s, 'a> Helpers<'s, 'a> {
    pub fn imports(&self) -> &'s [ImportReference] {
        self.imports
    }

    pub fn is_relative_path(&self, specifier: &str) -> bool {
        specifier.starts_with('.')
    }

    /// Count of literal `../` occurrences in `specifier`.
    pub fn relative_depth(&self, specifier: &str) -> usize {
        specifier.matches("../").count()
    }

    /// Normalise `input` (possibly falling back to `fallback_span` for a
    /// plain string) and record it through this rule's scoped reporter.
    pub fn report_violation(&self, input: impl Into<ReportInput>, fallback_span: Option<Span>) {
        let record = match input.into() {
            ReportInput::Message(message) => crate::reporter::RecordInput {
                description: message,
                span: fallback_span,
                ..Default::default()
            },
            ReportInput::Detailed(details) => crate::reporter::RecordInput {
                description: details.description,
                code: details.code,
                suggestions: details.suggestions,
                span: details.span.or(fallback_span),
                line: details.line,
            },
        };
        self.reporter.record(record);
    }
}
