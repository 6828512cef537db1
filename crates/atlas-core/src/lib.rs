//! atlas-core — Pure assistant logic, no UI.
//!
//! Utterances go through the [`dispatcher::Dispatcher`] (planner, reply
//! surface, action registry, log); reminders are fired by the
//! [`scheduler::ReminderScheduler`]. Frontends (CLI, Web) subscribe to
//! events via tokio::broadcast.

pub mod actions;
pub mod assistant;
pub mod capability;
pub mod clock;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod due;
pub mod events;
pub mod habits;
pub mod input;
pub mod planner;
pub mod prompts;
pub mod scheduler;
pub mod store;
pub mod types;
