//! Action registry — the closed set of named capabilities the planner may
//! ask for. The registry validates arguments against each action's declared
//! shape and calls the handler; it has no error policy of its own.

pub mod files;
pub mod memory;
pub mod system;
pub mod web;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::context::AssistantContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Text,
    Integer,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

impl ArgSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Text,
            required: true,
        }
    }

    pub const fn optional_text(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Text,
            required: false,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Integer,
            required: true,
        }
    }
}

/// Name, description, and accepted argument keys of an action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: &'static [ArgSpec],
}

impl ActionSpec {
    /// `name(a, b?)` — used in the planner prompt.
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                let ty = match a.kind {
                    ArgKind::Text => "",
                    ArgKind::Integer => ":int",
                };
                let opt = if a.required { "" } else { "?" };
                format!("{}{}{}", a.name, ty, opt)
            })
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action: {0}")]
    NotFound(String),

    #[error("invalid arguments for {action}: {reason}")]
    InvalidArguments { action: String, reason: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Arguments that passed validation against the action's [`ActionSpec`].
#[derive(Debug, Clone)]
pub struct ActionArgs {
    action: &'static str,
    values: Map<String, Value>,
}

impl ActionArgs {
    /// Deserialize into the handler's typed argument struct.
    pub fn parse<T: DeserializeOwned>(self) -> Result<T, ActionError> {
        serde_json::from_value(Value::Object(self.values)).map_err(|e| {
            ActionError::InvalidArguments {
                action: self.action.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// A registered capability.
#[async_trait]
pub trait Action: Send + Sync {
    fn spec(&self) -> &'static ActionSpec;

    /// Returns a short human-readable result.
    async fn run(&self, args: ActionArgs) -> Result<String, ActionError>;
}

/// Immutable after startup; shared behind an `Arc`.
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action. Overwrites any existing action with the same name.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.spec().name;
        debug!(action = name, "action registered");
        self.actions.insert(name, action);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All specs, sorted by name.
    pub fn specs(&self) -> Vec<&'static ActionSpec> {
        let mut specs: Vec<&'static ActionSpec> =
            self.actions.values().map(|a| a.spec()).collect();
        specs.sort_by_key(|s| s.name);
        specs
    }

    /// Look up, validate, and call. Handler failures come back as
    /// [`ActionError::Failed`] for the caller to render.
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> Result<String, ActionError> {
        let action = self
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::NotFound(name.to_string()))?;
        let args = validate(action.spec(), args)?;
        action.run(args).await
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check keys and kinds; numeric strings are accepted for integers.
fn validate(spec: &'static ActionSpec, args: &Map<String, Value>) -> Result<ActionArgs, ActionError> {
    let invalid = |reason: String| ActionError::InvalidArguments {
        action: spec.name.to_string(),
        reason,
    };

    if let Some(unknown) = args
        .keys()
        .find(|k| !spec.args.iter().any(|a| a.name == k.as_str()))
    {
        return Err(invalid(format!("unexpected argument '{}'", unknown)));
    }

    let mut values = Map::new();
    for arg in spec.args {
        let value = match args.get(arg.name) {
            None | Some(Value::Null) => {
                if arg.required {
                    return Err(invalid(format!("missing argument '{}'", arg.name)));
                }
                continue;
            }
            Some(v) => v,
        };

        let normalized = match (arg.kind, value) {
            (ArgKind::Text, Value::String(_)) => value.clone(),
            (ArgKind::Text, Value::Number(n)) => Value::String(n.to_string()),
            (ArgKind::Text, Value::Bool(b)) => Value::String(b.to_string()),
            (ArgKind::Integer, Value::Number(n)) if n.is_i64() => value.clone(),
            (ArgKind::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::from(i),
                Err(_) => {
                    return Err(invalid(format!("'{}' must be an integer", arg.name)));
                }
            },
            (ArgKind::Integer, _) => {
                return Err(invalid(format!("'{}' must be an integer", arg.name)));
            }
            (ArgKind::Text, _) => {
                return Err(invalid(format!("'{}' must be text", arg.name)));
            }
        };
        values.insert(arg.name.to_string(), normalized);
    }

    Ok(ActionArgs {
        action: spec.name,
        values,
    })
}

/// The built-in action set.
pub fn builtin_registry(ctx: &AssistantContext, config: &Config) -> ActionRegistry {
    let http = web::http_client(config.request_timeout());
    let mut registry = ActionRegistry::new();

    registry.register(Arc::new(system::OpenApp));
    registry.register(Arc::new(system::OpenUrl));
    registry.register(Arc::new(system::Search));
    registry.register(Arc::new(system::SystemStats));
    registry.register(Arc::new(system::SwitchDesktop));
    registry.register(Arc::new(system::Hotkeys));

    registry.register(Arc::new(files::ClipboardSet));
    registry.register(Arc::new(files::ClipboardGet));
    registry.register(Arc::new(files::FileMove));
    registry.register(Arc::new(files::FileDelete));

    registry.register(Arc::new(web::Weather::new(http)));

    registry.register(Arc::new(memory::SetReminder::new(ctx.clone())));
    registry.register(Arc::new(memory::ListReminders::new(ctx.store.clone())));
    registry.register(Arc::new(memory::RememberFact::new(ctx.store.clone())));
    registry.register(Arc::new(memory::RecallFact::new(ctx.store.clone())));

    registry
}
