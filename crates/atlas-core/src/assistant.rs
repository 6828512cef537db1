//! Wiring — builds the store, context, registry, planner, dispatcher, and
//! scheduler from a [`Config`] and starts the scheduler task.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::info;

use crate::actions::{builtin_registry, ActionRegistry};
use crate::capability::{default_notifier, FanOut, Notifier, ReplySurface, SpeechSurface};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::context::AssistantContext;
use crate::dispatcher::Dispatcher;
use crate::planner::planner_from_config;
use crate::scheduler::ReminderScheduler;
use crate::store::Store;

/// A running assistant: dispatcher for input surfaces plus the background
/// scheduler task.
pub struct Assistant {
    pub ctx: AssistantContext,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<ActionRegistry>,
    scheduler: Option<JoinHandle<()>>,
    speech: bool,
}

impl Assistant {
    /// Open the store and start the scheduler. Store initialization failure
    /// is the one fatal startup error.
    pub fn start(config: &Config, surface: Arc<dyn ReplySurface>) -> Result<Self> {
        let db_path = config.database_file();
        let store = Store::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        Ok(Self::start_with(config, store, Arc::new(SystemClock), surface))
    }

    /// Like [`Assistant::start`] with an explicit store and clock.
    pub fn start_with(
        config: &Config,
        store: Store,
        clock: Arc<dyn Clock>,
        surface: Arc<dyn ReplySurface>,
    ) -> Self {
        let ctx = AssistantContext::new(store, clock.clone());

        let speech = config.speech.then(SpeechSurface::detect).flatten();
        let speaking = speech.is_some();
        let reply: Arc<dyn ReplySurface> = match speech {
            Some(s) => Arc::new(FanOut::new(vec![surface, Arc::new(s)])),
            None => surface,
        };
        let notifier: Arc<dyn Notifier> = default_notifier(config.desktop_notifications);

        let registry = Arc::new(builtin_registry(&ctx, config));
        let planner = planner_from_config(config, registry.specs(), clock);
        let dispatcher = Arc::new(Dispatcher::new(
            ctx.clone(),
            planner,
            registry.clone(),
            reply.clone(),
        ));

        let scheduler = Arc::new(ReminderScheduler::new(
            ctx.clone(),
            notifier,
            reply,
            config.poll_interval(),
        ));
        let handle = tokio::spawn(scheduler.run());

        info!(
            actions = registry.len(),
            planner = %dispatcher.planner().describe(),
            speech = speaking,
            "Assistant started"
        );

        Self {
            ctx,
            dispatcher,
            registry,
            scheduler: Some(handle),
            speech: speaking,
        }
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech
    }

    /// Cancel the scheduler and wait for it to finish its current tick.
    pub async fn shutdown(&mut self) {
        self.ctx.shutdown.cancel();
        if let Some(handle) = self.scheduler.take() {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler task ended abnormally: {}", e);
            }
        }
        info!("Assistant stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NullSurface;

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: dir.path().join("data/atlas.db").to_string_lossy().into_owned(),
            planner_enabled: false,
            desktop_notifications: false,
            ..Config::default()
        };

        let mut assistant = Assistant::start(&config, Arc::new(NullSurface)).unwrap();
        assert_eq!(assistant.registry.len(), 15);

        let out = assistant.dispatcher.handle("hello").await;
        assert_eq!(out.reply, "(unavailable) hello");

        assistant.shutdown().await;
        assert!(assistant.ctx.is_shutting_down());
        assert!(dir.path().join("data/atlas.db").exists());
    }
}
