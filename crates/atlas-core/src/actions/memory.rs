//! Reminder and fact actions backed by the store.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{Action, ActionArgs, ActionError, ActionSpec, ArgSpec};
use crate::context::AssistantContext;
use crate::due;
use crate::store::Store;

// ── set_reminder ──

static SET_REMINDER: ActionSpec = ActionSpec {
    name: "set_reminder",
    description: "Schedule a reminder. due_iso is a local time (YYYY-MM-DDTHH:MM) or an offset like \"in 30 minutes\"; repeat is hourly, daily, or weekly",
    args: &[
        ArgSpec::text("text"),
        ArgSpec::text("due_iso"),
        ArgSpec::optional_text("repeat"),
    ],
};

pub struct SetReminder {
    ctx: AssistantContext,
}

impl SetReminder {
    pub fn new(ctx: AssistantContext) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct SetReminderArgs {
    text: String,
    due_iso: String,
    repeat: Option<String>,
}

#[async_trait]
impl Action for SetReminder {
    fn spec(&self) -> &'static ActionSpec {
        &SET_REMINDER
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: SetReminderArgs = args.parse()?;
        let due = due::parse_expression(&args.due_iso, self.ctx.clock.now())
            .map_err(anyhow::Error::new)?;
        let repeat = args
            .repeat
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());

        let id = self
            .ctx
            .store
            .add_reminder(args.text.trim(), due, repeat)
            .map_err(anyhow::Error::new)?;

        let when = due::format_stored(due);
        info!(id, due = %when, repeat = repeat.unwrap_or("none"), "reminder set");
        Ok(format!("Reminder set for {}", when))
    }
}

// ── list_reminders ──

static LIST_REMINDERS: ActionSpec = ActionSpec {
    name: "list_reminders",
    description: "List pending reminders",
    args: &[],
};

pub struct ListReminders {
    store: Store,
}

impl ListReminders {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Action for ListReminders {
    fn spec(&self) -> &'static ActionSpec {
        &LIST_REMINDERS
    }

    async fn run(&self, _args: ActionArgs) -> Result<String, ActionError> {
        let reminders = self.store.reminders().map_err(anyhow::Error::new)?;
        if reminders.is_empty() {
            return Ok("No reminders".to_string());
        }
        let lines: Vec<String> = reminders
            .iter()
            .map(|r| match &r.repeat_rule {
                Some(rule) => format!("#{} {} at {} ({})", r.id, r.text, r.due_at, rule),
                None => format!("#{} {} at {}", r.id, r.text, r.due_at),
            })
            .collect();
        Ok(lines.join("; "))
    }
}

// ── remember_fact / recall_fact ──

static REMEMBER_FACT: ActionSpec = ActionSpec {
    name: "remember_fact",
    description: "Store a fact about the user under a key",
    args: &[ArgSpec::text("key"), ArgSpec::text("value")],
};

pub struct RememberFact {
    store: Store,
}

impl RememberFact {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct RememberFactArgs {
    key: String,
    value: String,
}

#[async_trait]
impl Action for RememberFact {
    fn spec(&self) -> &'static ActionSpec {
        &REMEMBER_FACT
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: RememberFactArgs = args.parse()?;
        let key = args.key.trim().to_lowercase();
        if key.is_empty() {
            return Err(anyhow::anyhow!("fact key is empty").into());
        }
        self.store
            .set_fact(&key, args.value.trim())
            .map_err(anyhow::Error::new)?;
        Ok(format!("Remembered {}", key))
    }
}

static RECALL_FACT: ActionSpec = ActionSpec {
    name: "recall_fact",
    description: "Look up a stored fact by key",
    args: &[ArgSpec::text("key")],
};

pub struct RecallFact {
    store: Store,
}

impl RecallFact {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct RecallFactArgs {
    key: String,
}

#[async_trait]
impl Action for RecallFact {
    fn spec(&self) -> &'static ActionSpec {
        &RECALL_FACT
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: RecallFactArgs = args.parse()?;
        let key = args.key.trim().to_lowercase();
        let value = self.store.fact(&key).map_err(anyhow::Error::new)?;
        Ok(value.unwrap_or_else(|| format!("I don't know {}", key)))
    }
}
