//! Reconciliation runs: fetch a window, reconcile it, persist the result.

pub mod reconciler;
pub mod schedule;

pub use reconciler::{ReconcileError, Reconciler, RunSummary};
pub use schedule::spawn_schedule;
