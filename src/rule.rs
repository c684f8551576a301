//! Rule type shared by the runtime (C3) and the built-in rule set (C4).

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::context::RuleContext;

/// Severity of a violation, from `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Optimizing,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Optimizing => "optimizing",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule's grouping tag, from `spec.md` §3: `"base"`, `"performance"`, or
/// `"untagged"` (the open-ended `"..."` case for custom rules that don't
/// declare one).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Base,
    Performance,
    Untagged,
    Custom(String),
}

impl Tag {
    pub fn as_str(&self) -> &str {
        match self {
            Tag::Base => "base",
            Tag::Performance => "performance",
            Tag::Untagged => "untagged",
            Tag::Custom(s) => s,
        }
    }
}

/// A lint rule: pure over `RuleContext`, side effects only via the reporter.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub tag: Tag,
    pub default_severity: Severity,
    pub run: Arc<dyn for<'s, 'a> Fn(&RuleContext<'s, 'a>) + Send + Sync>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        tag: Tag,
        default_severity: Severity,
        run: impl for<'s, 'a> Fn(&RuleContext<'s, 'a>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tag,
            default_severity,
            run: Arc::new(run),
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("default_severity", &self.default_severity)
            .finish()
    }
}
