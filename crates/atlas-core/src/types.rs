//! Core types — Reminder, LogEntry, Plan, ActionRequest, Outcome, etc.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::due::{self, DueParseError};

// ── Reminders ──

/// How a fired reminder is advanced instead of being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Hourly,
    Daily,
    Weekly,
}

impl Recurrence {
    /// Parse a stored rule label. Anything unrecognised is `None`, which the
    /// scheduler treats exactly like "no rule".
    pub fn parse(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(Recurrence::Hourly),
            "daily" => Some(Recurrence::Daily),
            "weekly" => Some(Recurrence::Weekly),
            _ => None,
        }
    }

    pub fn period(self) -> Duration {
        match self {
            Recurrence::Hourly => Duration::hours(1),
            Recurrence::Daily => Duration::days(1),
            Recurrence::Weekly => Duration::weeks(1),
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recurrence::Hourly => write!(f, "hourly"),
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Weekly => write!(f, "weekly"),
        }
    }
}

/// A persisted reminder row. `due_at` is kept as stored so a corrupt value
/// can be skipped by the scheduler instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub text: String,
    pub due_at: String,
    pub repeat_rule: Option<String>,
}

impl Reminder {
    pub fn due(&self) -> Result<NaiveDateTime, DueParseError> {
        due::parse_stored(&self.due_at)
    }

    /// The recognised recurrence, if any.
    pub fn recurrence(&self) -> Option<Recurrence> {
        self.repeat_rule.as_deref().and_then(Recurrence::parse)
    }
}

// ── Log ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Utterance,
    Action,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Utterance => "utterance",
            LogKind::Action => "action",
        }
    }
}

impl std::str::FromStr for LogKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utterance" => Ok(LogKind::Utterance),
            "action" => Ok(LogKind::Action),
            other => Err(format!("unknown log kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub ts: String,
    pub kind: LogKind,
    pub payload: serde_json::Value,
}

// ── Planning ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Reply plus at most one action, produced per utterance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub reply: String,
    pub action: Option<ActionRequest>,
}

impl Plan {
    pub fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            action: None,
        }
    }
}

// ── Dispatch outcome ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionReport {
    Completed { name: String, result: String },
    Failed { name: String, error: String },
    Unknown { name: String },
}

impl ActionReport {
    pub fn name(&self) -> &str {
        match self {
            ActionReport::Completed { name, .. }
            | ActionReport::Failed { name, .. }
            | ActionReport::Unknown { name } => name,
        }
    }

    /// The status line shown to the user.
    pub fn status_line(&self) -> String {
        match self {
            ActionReport::Completed { name, result } => format!("[action:{}] {}", name, result),
            ActionReport::Failed { name, error } => format!("[action:{}] error: {}", name, error),
            ActionReport::Unknown { name } => format!("unknown action: {}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub reply: String,
    pub action: Option<ActionReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recurrence_parse_known_rules() {
        assert_eq!(Recurrence::parse("hourly"), Some(Recurrence::Hourly));
        assert_eq!(Recurrence::parse("Daily"), Some(Recurrence::Daily));
        assert_eq!(Recurrence::parse(" weekly "), Some(Recurrence::Weekly));
    }

    #[test]
    fn test_recurrence_unknown_rule_is_none() {
        assert_eq!(Recurrence::parse("monthly"), None);
        assert_eq!(Recurrence::parse(""), None);
    }

    #[test]
    fn test_reminder_recurrence_from_rule() {
        let r = Reminder {
            id: 1,
            text: "stretch".into(),
            due_at: "2026-01-01T09:00:00".into(),
            repeat_rule: Some("monthly".into()),
        };
        assert!(r.recurrence().is_none());
        assert!(r.due().is_ok());
    }

    #[test]
    fn test_action_report_serializes_with_status_tag() {
        let report = ActionReport::Failed {
            name: "file_move".into(),
            error: "boom".into(),
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["name"], "file_move");
        assert_eq!(report.status_line(), "[action:file_move] error: boom");
    }
}
