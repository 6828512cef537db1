//! Planner system prompt.

use chrono::NaiveDateTime;

use crate::actions::ActionSpec;

const PREAMBLE: &str = "You are a desktop assistant. Turn each user request into a short spoken reply plus at most one action.\n\
Respond with a single JSON object: {\"reply\": string, \"action\": {\"name\": string, \"args\": object} | null}.\n\
Use \"action\": null when no action is needed. Only use the actions listed below, with exactly the argument keys shown \
(\"?\" marks an optional argument, \":int\" an integer).";

const REMINDER_HINT: &str = "For set_reminder, resolve times like \"in 30 minutes\" or \"tomorrow at 9\" \
into a local date-time YYYY-MM-DDTHH:MM using the current time below.";

/// Build the system prompt for the given action set and wall-clock time.
pub fn planner_system_prompt(specs: &[&ActionSpec], now: NaiveDateTime) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nActions:\n");
    for spec in specs {
        prompt.push_str("- ");
        prompt.push_str(&spec.signature());
        prompt.push_str(": ");
        prompt.push_str(spec.description);
        prompt.push('\n');
    }
    prompt.push('\n');
    prompt.push_str(REMINDER_HINT);
    prompt.push_str(&format!(
        "\n\nCurrent local time: {} ({})",
        now.format("%Y-%m-%dT%H:%M"),
        now.format("%A")
    ));
    prompt
}
