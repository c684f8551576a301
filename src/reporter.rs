//! Violation collection and text/structured rendering (C5).
//!
//! A `Reporter` is created once per file, handed to `createContext`, and
//! `flush`ed exactly once after all rules have run against that file. Text
//! rendering of the resulting `FileScanResult` is a separate, pure function
//! (`render_file_result`) so the scan orchestrator can interleave it by
//! input order rather than completion order (§4.7's ordering guarantee) —
//! the reporter itself does no I/O.

use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use colored::Colorize;
use serde::{Serialize, Serializer};

use crate::analysis::Span;
use crate::messages::Messages;
use crate::rule::{Rule, Severity, Tag};
use crate::source_index::SourceIndex;

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Suggestion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn with_link(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub tag: Tag,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub optimizing: usize,
}

impl SeverityCounts {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Optimizing => self.optimizing += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileScanResult {
    pub file_path: PathBuf,
    pub severity_counts: SeverityCounts,
    pub total_violations: usize,
    pub error_violations: usize,
    pub violations: Vec<ViolationRecord>,
}

/// Input to `ScopedReporter::record`: a rule's raw finding before the
/// reporter resolves its line number and stamps tag/rule/severity.
#[derive(Debug, Clone, Default)]
pub struct RecordInput {
    pub description: String,
    pub code: Option<String>,
    pub suggestions: Vec<Suggestion>,
    pub span: Option<Span>,
    pub line: Option<usize>,
}

impl RecordInput {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

struct ReporterState {
    violations: Vec<ViolationRecord>,
    counts: SeverityCounts,
}

/// Per-file violation sink. Cheap to create, created once per (file, scan).
pub struct Reporter<'a> {
    file_path: PathBuf,
    source: &'a str,
    source_index: &'a SourceIndex,
    state: RefCell<ReporterState>,
}

impl<'a> Reporter<'a> {
    pub fn new(file_path: PathBuf, source: &'a str, source_index: &'a SourceIndex) -> Self {
        Self {
            file_path,
            source,
            source_index,
            state: RefCell::new(ReporterState {
                violations: Vec::new(),
                counts: SeverityCounts::default(),
            }),
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push_general(None, None, message.into());
    }

    pub fn error_at_line(&self, line: Option<usize>, message: impl Into<String>) {
        self.push_general(line, None, message.into());
    }

    pub fn error_at_span(&self, span: Option<Span>, message: impl Into<String>) {
        self.push_general(None, span, message.into());
    }

    fn push_general(&self, line: Option<usize>, span: Option<Span>, message: String) {
        let resolved_line = self.resolve_line(line, span);
        let mut state = self.state.borrow_mut();
        state.counts.record(Severity::Error);
        state.violations.push(ViolationRecord {
            tag: Tag::Untagged,
            rule_name: "general".to_string(),
            severity: Severity::Error,
            message,
            line: resolved_line,
            code: None,
            suggestions: Vec::new(),
        });
    }

    pub fn for_rule<'s>(&'s self, rule: &Rule) -> ScopedReporter<'s, 'a> {
        ScopedReporter {
            reporter: self,
            rule_name: rule.name.clone(),
            tag: rule.tag.clone(),
            severity: rule.default_severity,
        }
    }

    fn resolve_line(&self, line: Option<usize>, span: Option<Span>) -> Option<usize> {
        if let Some(line) = line {
            return Some(line);
        }
        span.map(|s| self.source_index.line_of_byte(self.source, s.start))
    }

    /// Drain the collected violations into an immutable snapshot, resetting
    /// internal state for any subsequent (re-)use of this reporter.
    pub fn flush(&self) -> FileScanResult {
        let mut state = self.state.borrow_mut();
        let violations = std::mem::take(&mut state.violations);
        let counts = std::mem::take(&mut state.counts);
        let total_violations = violations.len();
        let error_violations = violations.iter().filter(|v| v.severity == Severity::Error).count();
        FileScanResult {
            file_path: self.file_path.clone(),
            severity_counts: counts,
            total_violations,
            error_violations,
            violations,
        }
    }
}

/// A reporter view tagged with one rule's identity; every emission from it
/// is stamped with that rule's `name`, `tag`, and default `severity`.
///
/// `'s` is the borrow of the underlying `Reporter`; `'a` is the `Reporter`'s
/// own data lifetime (source text, source index).
pub struct ScopedReporter<'s, 'a> {
    reporter: &'s Reporter<'a>,
    rule_name: String,
    tag: Tag,
    severity: Severity,
}

impl<'s, 'a> ScopedReporter<'s, 'a> {
    pub fn error(&self, message: impl Into<String>) {
        self.push(None, None, message.into(), None, Vec::new());
    }

    pub fn error_at_line(&self, line: Option<usize>, message: impl Into<String>) {
        self.push(line, None, message.into(), None, Vec::new());
    }

    pub fn error_at_span(&self, span: Option<Span>, message: impl Into<String>) {
        self.push(None, span, message.into(), None, Vec::new());
    }

    pub fn record(&self, input: RecordInput) {
        self.push(input.line, input.span, input.description, input.code, input.suggestions);
    }

    fn push(
        &self,
        line: Option<usize>,
        span: Option<Span>,
        message: String,
        code: Option<String>,
        suggestions: Vec<Suggestion>,
    ) {
        let resolved_line = self.reporter.resolve_line(line, span);
        let mut state = self.reporter.state.borrow_mut();
        state.counts.record(self.severity);
        state.violations.push(ViolationRecord {
            tag: self.tag.clone(),
            rule_name: self.rule_name.clone(),
            severity: self.severity,
            message,
            line: resolved_line,
            code,
            suggestions,
        });
    }
}

fn severity_icon(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "\u{2718}".red(),
        Severity::Warning => "\u{26A0}".yellow(),
        Severity::Optimizing => "\u{2699}".cyan(),
    }
}

fn current_time_hms() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Render one file's violations to `writer` in the localised text format
/// described by `spec.md` §4.5. Called by the scan orchestrator in input
/// order; never called for structured (JSON) output.
pub fn render_file_result<W: Write>(result: &FileScanResult, messages: &Messages, writer: &mut W) {
    for violation in &result.violations {
        render_violation(result, violation, messages, writer);
    }
}

fn render_violation<W: Write>(
    result: &FileScanResult,
    violation: &ViolationRecord,
    messages: &Messages,
    writer: &mut W,
) {
    let tag_label = messages.tag_label(&violation.tag);
    let _ = writeln!(
        writer,
        "[{}] {} [{}]: {}",
        current_time_hms(),
        severity_icon(violation.severity),
        tag_label,
        violation.rule_name
    );

    let location = match violation.line {
        Some(line) => format!("{}:{}", result.file_path.display(), line),
        None => result.file_path.display().to_string(),
    };
    let _ = writeln!(writer, "  {}: {}", messages.field_file(), location);
    let _ = writeln!(writer, "  {}: {}", messages.field_description(), violation.message);

    if let Some(code) = &violation.code {
        let _ = writeln!(writer, "  {}: {}", messages.field_code(), code);
    }

    if !violation.suggestions.is_empty() {
        let joined = violation
            .suggestions
            .iter()
            .map(|s| match &s.link {
                Some(link) => format!("{} ({link})", s.text),
                None => s.text.clone(),
            })
            .collect::<Vec<_>>()
            .join(messages.suggestion_separator());
        let _ = writeln!(writer, "  {}: {}", messages.field_suggestion(), joined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Rule, Severity, Tag};

    fn test_rule() -> Rule {
        Rule::new("no-example", Tag::Base, Severity::Warning, |_ctx| {})
    }

    #[test]
    fn flush_resets_state() {
        let source = "a\nb\nc\n";
        let index = SourceIndex::build(source, 0);
        let reporter = Reporter::new(PathBuf::from("a.ts"), source, &index);
        reporter.error("file-level problem");
        let first = reporter.flush();
        assert_eq!(first.total_violations, 1);
        let second = reporter.flush();
        assert_eq!(second.total_violations, 0);
    }

    #[test]
    fn scoped_reporter_stamps_rule_identity() {
        let source = "a\nb\n";
        let index = SourceIndex::build(source, 0);
        let reporter = Reporter::new(PathBuf::from("a.ts"), source, &index);
        let rule = test_rule();
        let scoped = reporter.for_rule(&rule);
        scoped.record(RecordInput::new("bad thing").with_line(2));
        let result = reporter.flush();
        assert_eq!(result.violations[0].rule_name, "no-example");
        assert_eq!(result.violations[0].tag, Tag::Base);
        assert_eq!(result.violations[0].severity, Severity::Warning);
        assert_eq!(result.violations[0].line, Some(2));
    }

    #[test]
    fn record_resolves_line_from_span_when_line_absent() {
        let source = "a\nb\nc\n";
        let index = SourceIndex::build(source, 0);
        let reporter = Reporter::new(PathBuf::from("a.ts"), source, &index);
        let rule = test_rule();
        let scoped = reporter.for_rule(&rule);
        scoped.record(RecordInput::new("bad thing").with_span(Span { start: 2, end: 3 }));
        let result = reporter.flush();
        assert_eq!(result.violations[0].line, Some(2));
    }

    #[test]
    fn severity_counts_track_each_bucket() {
        let source = "a\n";
        let index = SourceIndex::build(source, 0);
        let reporter = Reporter::new(PathBuf::from("a.ts"), source, &index);
        let error_rule = Rule::new("r-error", Tag::Base, Severity::Error, |_| {});
        let perf_rule = Rule::new("r-perf", Tag::Performance, Severity::Optimizing, |_| {});
        reporter.for_rule(&error_rule).record(RecordInput::new("x"));
        reporter.for_rule(&perf_rule).record(RecordInput::new("y"));
        let result = reporter.flush();
        assert_eq!(result.severity_counts.error, 1);
        assert_eq!(result.severity_counts.optimizing, 1);
        assert_eq!(result.error_violations, 1);
    }
}
