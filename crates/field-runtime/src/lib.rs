#![deny(warnings)]

//! Runtime for the field project simulation: the decision gate engine, the
//! player action API, the daily production tick and the session/scheduler
//! that owns a project instance.

pub mod actions;
pub mod exploration;
pub mod gates;
pub mod production;
pub mod session;

pub use actions::{apply_action, Action, ActionReport};
pub use gates::{evaluate_gate, make_gate_decision, GateDecision, GateEvaluation, GateOutcome};
pub use production::{advance_day, start_production, DayReport};
pub use session::{run_days_in_place, FieldSession, PeriodSummary, Scheduler};
