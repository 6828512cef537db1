//! Dispatcher — runs one utterance through planner, reply surface, and action
//! registry, logging both the utterance and the action outcome.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::actions::{ActionError, ActionRegistry};
use crate::capability::ReplySurface;
use crate::context::AssistantContext;
use crate::events::AssistantEvent;
use crate::planner::Planner;
use crate::types::{ActionReport, ActionRequest, LogKind, Outcome};

pub struct Dispatcher {
    ctx: AssistantContext,
    planner: Arc<dyn Planner>,
    registry: Arc<ActionRegistry>,
    reply: Arc<dyn ReplySurface>,
    /// One utterance at a time.
    gate: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        ctx: AssistantContext,
        planner: Arc<dyn Planner>,
        registry: Arc<ActionRegistry>,
        reply: Arc<dyn ReplySurface>,
    ) -> Self {
        Self {
            ctx,
            planner,
            registry,
            reply,
            gate: Mutex::new(()),
        }
    }

    pub fn context(&self) -> &AssistantContext {
        &self.ctx
    }

    pub fn planner(&self) -> &Arc<dyn Planner> {
        &self.planner
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    /// Process one utterance to completion. Callers filter empty input first.
    pub async fn handle(&self, utterance: &str) -> Outcome {
        let _turn = self.gate.lock().await;

        self.log(LogKind::Utterance, json!({ "text": utterance }));
        self.ctx.broadcast(AssistantEvent::Utterance {
            text: utterance.to_string(),
        });

        let plan = self.planner.plan(utterance).await;

        if !plan.reply.is_empty() {
            if let Err(e) = self.reply.deliver(&plan.reply).await {
                warn!("Reply delivery failed: {:#}", e);
            }
            self.ctx.broadcast(AssistantEvent::Reply {
                text: plan.reply.clone(),
            });
        }

        let action = match plan.action {
            Some(request) => Some(self.run_action(request).await),
            None => None,
        };

        Outcome {
            reply: plan.reply,
            action,
        }
    }

    async fn run_action(&self, request: ActionRequest) -> ActionReport {
        let report = match self.registry.invoke(&request.name, &request.args).await {
            Ok(result) => {
                info!(action = %request.name, "action completed");
                ActionReport::Completed {
                    name: request.name.clone(),
                    result,
                }
            }
            Err(ActionError::NotFound(name)) => {
                warn!(action = %name, "planner asked for unknown action");
                ActionReport::Unknown { name }
            }
            Err(e) => {
                warn!(action = %request.name, "action failed: {}", e);
                ActionReport::Failed {
                    name: request.name.clone(),
                    error: e.to_string(),
                }
            }
        };

        if let Err(e) = self.reply.report(&report.status_line()).await {
            warn!("Status line delivery failed: {:#}", e);
        }

        let mut payload = serde_json::to_value(&report).unwrap_or_else(|_| json!({}));
        payload["args"] = serde_json::Value::Object(request.args);
        self.log(LogKind::Action, payload);

        self.ctx.broadcast(AssistantEvent::Action(report.clone()));
        report
    }

    /// Best-effort log write.
    fn log(&self, kind: LogKind, payload: serde_json::Value) {
        if let Err(e) = self.ctx.store.append_at(self.ctx.clock.now(), kind, &payload) {
            error!("Failed to write {} log entry: {}", kind.as_str(), e);
        }
    }
}
