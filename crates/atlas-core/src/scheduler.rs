//! Reminder scheduler — polls the store on a fixed interval and fires every
//! reminder whose due time has passed. Recurring reminders advance by their
//! period from the stored due time; one-shot reminders are deleted.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::capability::{Notifier, ReplySurface};
use crate::context::AssistantContext;
use crate::due;
use crate::events::AssistantEvent;
use crate::store::StoreError;
use crate::types::Reminder;

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub fired: usize,
    pub rescheduled: Vec<(i64, NaiveDateTime)>,
    pub removed: usize,
    pub skipped: usize,
}

pub struct ReminderScheduler {
    ctx: AssistantContext,
    notifier: Arc<dyn Notifier>,
    reply: Arc<dyn ReplySurface>,
    interval: Duration,
}

enum Fired {
    Rescheduled(NaiveDateTime),
    Removed,
}

impl ReminderScheduler {
    pub fn new(
        ctx: AssistantContext,
        notifier: Arc<dyn Notifier>,
        reply: Arc<dyn ReplySurface>,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            notifier,
            reply,
            interval,
        }
    }

    /// One pass over the store. Only a failed read of the reminder list
    /// fails the tick; per-reminder problems are logged and skipped.
    pub async fn tick(&self) -> Result<TickReport, StoreError> {
        let now = self.ctx.clock.now();
        let reminders = self.ctx.store.reminders()?;
        let mut report = TickReport::default();

        for reminder in reminders {
            let due = match reminder.due() {
                Ok(d) => d,
                Err(e) => {
                    warn!(id = reminder.id, "Skipping reminder with bad due time: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };
            if now < due {
                continue;
            }

            match self.fire(&reminder, due).await {
                Ok(Fired::Rescheduled(next)) => {
                    report.fired += 1;
                    report.rescheduled.push((reminder.id, next));
                }
                Ok(Fired::Removed) => {
                    report.fired += 1;
                    report.removed += 1;
                }
                Err(e) => {
                    error!(id = reminder.id, "Failed to update fired reminder: {}", e);
                    report.skipped += 1;
                }
            }
        }

        if report.fired > 0 || report.skipped > 0 {
            debug!(?report, "tick");
        }
        Ok(report)
    }

    async fn fire(&self, reminder: &Reminder, due: NaiveDateTime) -> Result<Fired, StoreError> {
        info!(id = reminder.id, text = %reminder.text, "reminder fired");

        if let Err(e) = self.notifier.notify("Reminder", &reminder.text).await {
            warn!("Notification failed: {:#}", e);
        }
        if let Err(e) = self.reply.deliver(&format!("Reminder: {}", reminder.text)).await {
            warn!("Reminder delivery failed: {:#}", e);
        }

        let fired = match reminder.recurrence() {
            Some(rule) => {
                let next = due + rule.period();
                self.ctx.store.update_due(reminder.id, next)?;
                Fired::Rescheduled(next)
            }
            None => {
                self.ctx.store.delete_reminder(reminder.id)?;
                Fired::Removed
            }
        };

        self.ctx.broadcast(AssistantEvent::Reminder {
            id: reminder.id,
            text: reminder.text.clone(),
            next_due: match &fired {
                Fired::Rescheduled(next) => Some(due::format_stored(*next)),
                Fired::Removed => None,
            },
        });
        Ok(fired)
    }

    /// Tick now, then every interval until shutdown. Each tick runs in its
    /// own task so a panicking tick does not end the loop.
    pub async fn run(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "Reminder scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let this = Arc::clone(&self);
            match tokio::spawn(async move { this.tick().await }).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Reminder tick failed: {}", e),
                Err(e) => error!("Reminder tick panicked: {}", e),
            }
        }
        info!("Reminder scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{memory::SetReminder, ActionRegistry};
    use crate::capability::NullSurface;
    use crate::clock::ManualClock;
    use crate::store::Store;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
            self.seen.lock().push((title.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn notify(&self, _title: &str, _message: &str) -> anyhow::Result<()> {
            anyhow::bail!("dbus is down")
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReplySurface for RecordingSurface {
        async fn deliver(&self, text: &str) -> anyhow::Result<()> {
            self.lines.lock().push(text.to_string());
            Ok(())
        }
    }

    fn t(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    struct Fixture {
        ctx: AssistantContext,
        clock: Arc<ManualClock>,
        notifier: Arc<RecordingNotifier>,
        surface: Arc<RecordingSurface>,
        scheduler: ReminderScheduler,
    }

    fn fixture(now: NaiveDateTime) -> Fixture {
        let clock = Arc::new(ManualClock::new(now));
        let ctx = AssistantContext::new(Store::in_memory().unwrap(), clock.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let surface = Arc::new(RecordingSurface::default());
        let scheduler = ReminderScheduler::new(
            ctx.clone(),
            notifier.clone(),
            surface.clone(),
            Duration::from_secs(10),
        );
        Fixture {
            ctx,
            clock,
            notifier,
            surface,
            scheduler,
        }
    }

    #[tokio::test]
    async fn test_empty_store_tick_is_noop() {
        let f = fixture(t(9, 0));
        assert_eq!(f.scheduler.tick().await.unwrap(), TickReport::default());
        assert_eq!(f.scheduler.tick().await.unwrap(), TickReport::default());
        assert!(f.notifier.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_not_yet_due_is_untouched() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("later", t(9, 1), None).unwrap();
        let report = f.scheduler.tick().await.unwrap();
        assert_eq!(report.fired, 0);
        assert!(f.ctx.store.reminder(id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_daily_reminder_rescheduled_from_due() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("standup", t(9, 0), Some("daily")).unwrap();

        let report = f.scheduler.tick().await.unwrap();
        let next = t(9, 0) + ChronoDuration::hours(24);
        assert_eq!(report.fired, 1);
        assert_eq!(report.rescheduled, vec![(id, next)]);
        assert_eq!(f.ctx.store.reminder(id).unwrap().unwrap().due().unwrap(), next);

        assert_eq!(
            f.notifier.seen.lock().as_slice(),
            &[("Reminder".to_string(), "standup".to_string())]
        );
        assert_eq!(f.surface.lines.lock().as_slice(), &["Reminder: standup".to_string()]);

        // Same instant again: nothing more is due
        assert_eq!(f.scheduler.tick().await.unwrap().fired, 0);
    }

    #[tokio::test]
    async fn test_missed_periods_catch_up_one_per_tick() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("water", t(6, 0), Some("hourly")).unwrap();

        let first = f.scheduler.tick().await.unwrap();
        assert_eq!(first.rescheduled, vec![(id, t(7, 0))]);
        let second = f.scheduler.tick().await.unwrap();
        assert_eq!(second.rescheduled, vec![(id, t(8, 0))]);
    }

    #[tokio::test]
    async fn test_one_shot_reminder_deleted_once() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("call mom", t(8, 59), None).unwrap();

        let report = f.scheduler.tick().await.unwrap();
        assert_eq!(report.fired, 1);
        assert_eq!(report.removed, 1);
        assert!(f.ctx.store.reminder(id).unwrap().is_none());

        f.clock.advance(ChronoDuration::minutes(5));
        assert_eq!(f.scheduler.tick().await.unwrap().fired, 0);
        assert_eq!(f.notifier.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_rule_fires_once_and_deletes() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("rent", t(9, 0), Some("monthly")).unwrap();

        let report = f.scheduler.tick().await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(report.rescheduled.is_empty());
        assert!(f.ctx.store.reminder(id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_due_is_skipped_and_kept() {
        let f = fixture(t(9, 0));
        let bad = f
            .ctx
            .store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO reminders (text, due_at, repeat_rule) VALUES ('bad', 'whenever', NULL)",
                    [],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();
        let good = f.ctx.store.add_reminder("good", t(8, 0), None).unwrap();

        let report = f.scheduler.tick().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fired, 1);
        assert!(f.ctx.store.reminder(bad).unwrap().is_some());
        assert!(f.ctx.store.reminder(good).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_confined_to_one_reminder() {
        let f = fixture(t(9, 0));
        let stuck = f.ctx.store.add_reminder("a", t(8, 0), None).unwrap();
        let other = f.ctx.store.add_reminder("b", t(8, 30), None).unwrap();
        f.ctx
            .store
            .with_conn(|conn| {
                conn.execute_batch(&format!(
                    "CREATE TRIGGER block_delete BEFORE DELETE ON reminders
                     WHEN old.id = {stuck}
                     BEGIN SELECT RAISE(ABORT, 'disk full'); END;"
                ))?;
                Ok(())
            })
            .unwrap();

        let report = f.scheduler.tick().await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fired, 1);
        assert_eq!(report.removed, 1);
        assert!(f.ctx.store.reminder(stuck).unwrap().is_some());
        assert!(f.ctx.store.reminder(other).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_block_reminder() {
        let clock = Arc::new(ManualClock::new(t(9, 0)));
        let ctx = AssistantContext::new(Store::in_memory().unwrap(), clock);
        let surface = Arc::new(RecordingSurface::default());
        let scheduler = ReminderScheduler::new(
            ctx.clone(),
            Arc::new(BrokenNotifier),
            surface.clone(),
            Duration::from_secs(10),
        );
        let id = ctx.store.add_reminder("stretch", t(9, 0), None).unwrap();

        let report = scheduler.tick().await.unwrap();
        assert_eq!(report.fired, 1);
        assert!(ctx.store.reminder(id).unwrap().is_none());
        assert_eq!(surface.lines.lock().as_slice(), &["Reminder: stretch".to_string()]);
    }

    #[tokio::test]
    async fn test_fired_reminder_is_broadcast() {
        let f = fixture(t(9, 0));
        let mut rx = f.ctx.subscribe();
        let id = f.ctx.store.add_reminder("tea", t(9, 0), Some("weekly")).unwrap();

        f.scheduler.tick().await.unwrap();
        match rx.recv().await.unwrap() {
            AssistantEvent::Reminder { id: got, text, next_due } => {
                assert_eq!(got, id);
                assert_eq!(text, "tea");
                assert_eq!(next_due.as_deref(), Some("2026-05-11T09:00:00"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_set_reminder_during_tick_keeps_both_writes() {
        let f = fixture(t(9, 0));
        let mut due_ids = Vec::new();
        for i in 0..20 {
            due_ids.push(
                f.ctx
                    .store
                    .add_reminder(&format!("due {i}"), t(8, 0), Some("daily"))
                    .unwrap(),
            );
        }

        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(SetReminder::new(f.ctx.clone())));
        let registry = Arc::new(registry);

        let scheduler = Arc::new(f.scheduler);
        let ticking = {
            let s = scheduler.clone();
            tokio::spawn(async move { s.tick().await })
        };
        let adding = {
            let r = registry.clone();
            tokio::spawn(async move {
                for i in 0..10 {
                    let args = json!({"text": format!("new {i}"), "due_iso": "in 2 hours"});
                    r.invoke("set_reminder", args.as_object().unwrap()).await.unwrap();
                }
            })
        };

        let report = ticking.await.unwrap().unwrap();
        adding.await.unwrap();
        assert_eq!(report.fired, 20);

        let all = f.ctx.store.reminders().unwrap();
        assert_eq!(all.len(), 30);
        for id in due_ids {
            let r = f.ctx.store.reminder(id).unwrap().unwrap();
            assert_eq!(r.due().unwrap(), t(8, 0) + ChronoDuration::days(1));
        }
        assert_eq!(all.iter().filter(|r| r.text.starts_with("new ")).count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_immediately_and_stops_on_shutdown() {
        let f = fixture(t(9, 0));
        let id = f.ctx.store.add_reminder("now", t(9, 0), None).unwrap();
        let scheduler = Arc::new(ReminderScheduler::new(
            f.ctx.clone(),
            f.notifier.clone(),
            Arc::new(NullSurface),
            Duration::from_secs(10),
        ));

        let handle = tokio::spawn(scheduler.run());
        // Let the first tick run
        for _ in 0..10 {
            tokio::task::yield_now().await;
            if f.ctx.store.reminder(id).unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(f.ctx.store.reminder(id).unwrap().is_none());

        f.ctx.shutdown.cancel();
        handle.await.unwrap();
    }
}
