//! The booking notification engine.
//!
//! Scheduling math ([`calculator`]), suppression rules ([`policy`]), the
//! idempotent record upsert ([`scheduler`]), the recurring due sweep
//! ([`sweeper`]), channel dispatch ([`dispatcher`]) and outcome tracking
//! ([`tracker`]). All coordination between the short-lived scheduling
//! passes and the sweep happens through the notification_records table.

pub mod calculator;
pub mod dispatcher;
pub mod policy;
pub mod scheduler;
pub mod sweeper;
pub mod tracker;

pub use calculator::{BookingAnchors, ScheduleDecision};
pub use dispatcher::NotificationDispatcher;
pub use scheduler::NotificationScheduler;
pub use sweeper::{DueSweeper, SweepStats};
pub use tracker::DeliveryTracker;
