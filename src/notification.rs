//! Non-fatal scan diagnostics (`spec.md` §3, §7): missing paths, parser
//! failures, rule exceptions, unresolved configs. Never propagated as an
//! `Err` that aborts the scan — only ever appended to a `ScanSummary`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
            detail: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warn,
            message: message.into(),
            detail: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_level_lowercase() {
        let n = Notification::warn("x");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"level\":\"warn\""));
        assert!(!json.contains("detail"));
    }

    #[test]
    fn includes_detail_when_set() {
        let n = Notification::error("x").with_detail("y");
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"detail\":\"y\""));
    }
}
