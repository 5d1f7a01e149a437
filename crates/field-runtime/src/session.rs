//! Single-writer session and the fixed-period scheduler.

use crate::actions::{apply_action, Action, ActionReport};
use crate::gates::{evaluate_gate, GateEvaluation};
use crate::production::{advance_day, DayReport};
use field_core::{validate_tables, EconomicTables, EngineResult, Project, SimConfig};
use field_econ::project_npv;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// One project instance: its state, the tables it reads, and its seeded
/// random source. All mutation goes through `&mut self`, so ticks and
/// actions can never overlap.
#[derive(Clone, Debug)]
pub struct FieldSession {
    project: Project,
    tables: EconomicTables,
    rng: ChaCha8Rng,
}

impl FieldSession {
    pub fn new(config: &SimConfig, tables: EconomicTables) -> EngineResult<Self> {
        config.validate()?;
        validate_tables(&tables)?;
        info!(project = %config.project_name, seed = config.rng_seed, "session created");
        Ok(Self {
            project: Project::new(config),
            tables,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn tables(&self) -> &EconomicTables {
        &self.tables
    }

    pub fn apply(&mut self, action: &Action) -> EngineResult<ActionReport> {
        apply_action(&mut self.project, &self.tables, action, &mut self.rng)
    }

    /// Apply actions in order, stopping at the first failure.
    pub fn apply_all<'a>(
        &mut self,
        actions: impl IntoIterator<Item = &'a Action>,
    ) -> EngineResult<Vec<ActionReport>> {
        actions.into_iter().map(|a| self.apply(a)).collect()
    }

    pub fn evaluate_gate(&self) -> EngineResult<GateEvaluation> {
        evaluate_gate(&self.project, &self.tables)
    }

    /// Non-authoritative NPV preview for a candidate well count.
    pub fn preview_npv(&self, well_count: u32) -> EngineResult<Decimal> {
        project_npv(&self.project, &self.tables, well_count)
    }

    pub fn advance_day(&mut self) -> EngineResult<Option<DayReport>> {
        advance_day(&mut self.project, &self.tables, &mut self.rng)
    }

    /// Serialized state snapshot.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        self.project.snapshot_json()
    }

    pub fn into_project(self) -> Project {
        self.project
    }
}

/// Totals for one scheduler period.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub days: u32,
    pub output: f64,
    pub net_cash: Decimal,
    pub shocks: Vec<String>,
    pub well_events: usize,
    pub halted: bool,
}

/// Drives `advance_day` a fixed number of days per period. The host decides
/// when periods happen; no delays are modelled here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduler {
    period_days: u32,
}

impl Scheduler {
    pub fn new(period_days: u32) -> Self {
        Self {
            period_days: period_days.max(1),
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(u32::from(config.tick_days))
    }

    pub fn period_days(&self) -> u32 {
        self.period_days
    }

    /// Run one period. Stops early when production halts.
    pub fn run_period(&self, session: &mut FieldSession) -> EngineResult<PeriodSummary> {
        run_days_in_place(session, self.period_days)
    }

    /// Run periods until production halts or `max_periods` have elapsed.
    pub fn run_until_halt(
        &self,
        session: &mut FieldSession,
        max_periods: u32,
    ) -> EngineResult<Vec<PeriodSummary>> {
        let mut periods = Vec::new();
        for _ in 0..max_periods {
            let summary = self.run_period(session)?;
            let done = summary.halted;
            if summary.days > 0 {
                periods.push(summary);
            }
            if done {
                break;
            }
        }
        Ok(periods)
    }
}

/// Advance up to `days` days, accumulating a summary.
pub fn run_days_in_place(session: &mut FieldSession, days: u32) -> EngineResult<PeriodSummary> {
    let mut summary = PeriodSummary::default();
    for _ in 0..days {
        match session.advance_day()? {
            Some(report) => {
                summary.days += 1;
                summary.output += report.output;
                summary.net_cash += report.net_cash;
                summary.well_events += report.well_events.len();
                if let Some(shock) = report.shock {
                    summary.shocks.push(shock);
                }
                if report.halted.is_some() {
                    summary.halted = true;
                    break;
                }
            }
            None => {
                summary.halted = true;
                break;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::EngineError;

    #[test]
    fn session_rejects_invalid_tables() {
        let mut tables = EconomicTables::standard();
        tables.market.floor = 500.0;
        assert!(matches!(
            FieldSession::new(&SimConfig::default(), tables),
            Err(EngineError::InvalidTable(_))
        ));
    }

    #[test]
    fn scheduler_period_is_never_zero() {
        assert_eq!(Scheduler::new(0).period_days(), 1);
        let config = SimConfig {
            tick_days: 30,
            ..SimConfig::default()
        };
        assert_eq!(Scheduler::from_config(&config).period_days(), 30);
    }

    #[test]
    fn fresh_session_has_no_valuation() {
        let session = FieldSession::new(&SimConfig::default(), EconomicTables::standard()).unwrap();
        assert!(session.preview_npv(4).is_err());
        assert!(session.snapshot().unwrap().contains("\"phase_index\":0"));
    }
}
