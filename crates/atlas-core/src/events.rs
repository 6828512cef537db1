//! AssistantEvent enum — broadcast from the dispatcher and scheduler to frontends via tokio::broadcast.

use serde::{Deserialize, Serialize};

use crate::types::ActionReport;

/// Events broadcast to all subscribers (CLI, WebSocket clients).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum AssistantEvent {
    /// An utterance accepted by the dispatcher
    #[serde(rename = "utterance")]
    Utterance { text: String },

    /// The planner's reply for the current utterance
    #[serde(rename = "reply")]
    Reply { text: String },

    /// Outcome of the utterance's action
    #[serde(rename = "action")]
    Action(ActionReport),

    /// A reminder fired; `next_due` is set when it was rescheduled
    #[serde(rename = "reminder")]
    Reminder {
        id: i64,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_due: Option<String>,
    },
}

impl AssistantEvent {
    /// Serialize to the JSON format the web frontend expects:
    /// `{"event": "...", "data": {...}}`
    pub fn to_ws_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
