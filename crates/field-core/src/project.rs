//! The project aggregate and its lifecycle records.

use crate::config::SimConfig;
use crate::error::{EngineError, EngineResult};
use crate::gate::ProjectFlag;
use crate::roles::{ApprovalSet, Role};
use crate::tables::GeologicalProfile;
use crate::well::Well;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lower clamp for the exploration chance of success.
pub const PROBABILITY_MIN: f64 = 0.01;
/// Upper clamp for the exploration chance of success.
pub const PROBABILITY_MAX: f64 = 0.95;

/// Ordered project phases. `Project::phase_index` indexes [`Phase::SEQUENCE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Geology,
    Lease,
    Seismic,
    Drilling,
    Appraisal,
    Development,
    Construction,
    Production,
}

impl Phase {
    pub const SEQUENCE: [Phase; 8] = [
        Phase::Geology,
        Phase::Lease,
        Phase::Seismic,
        Phase::Drilling,
        Phase::Appraisal,
        Phase::Development,
        Phase::Construction,
        Phase::Production,
    ];

    pub fn from_index(index: usize) -> Option<Phase> {
        Phase::SEQUENCE.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Geology => "geology",
            Phase::Lease => "lease",
            Phase::Seismic => "seismic",
            Phase::Drilling => "drilling",
            Phase::Appraisal => "appraisal",
            Phase::Development => "development",
            Phase::Construction => "construction",
            Phase::Production => "production",
        }
    }
}

/// Lifecycle status. Everything except `Active` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    /// A gate was rejected.
    Ended,
    /// The exploration well found no commercial hydrocarbons.
    DryHole,
    /// Production ran to its limit or the field was exhausted.
    Completed,
}

/// Additive modifiers derived from the seismic interpretation risk list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskModifiers {
    /// Subtracted from the chance of success.
    pub probability_penalty: f64,
    /// Fractional change to fixed OPEX.
    pub opex_modifier: f64,
    /// Fractional change to well productivity.
    pub production_modifier: f64,
    /// Fractional increase of the annual decline rate.
    pub decline_rate_bonus: f64,
    /// Fractional change to recoverable reserves.
    pub reserve_modifier: f64,
}

impl RiskModifiers {
    /// Add another set of modifiers into this one.
    pub fn accumulate(&mut self, other: &RiskModifiers) {
        self.probability_penalty += other.probability_penalty;
        self.opex_modifier += other.opex_modifier;
        self.production_modifier += other.production_modifier;
        self.decline_rate_bonus += other.decline_rate_bonus;
        self.reserve_modifier += other.reserve_modifier;
    }
}

/// Output handed over by the seismic interpretation collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interpretation {
    /// Probability as reported, before bonuses, penalties and clamping.
    pub raw_probability: f64,
    /// Named risks; names without a table entry carry no modifiers.
    pub risks: Vec<String>,
}

/// Result of the exploration well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrillOutcome {
    Discovery {
        /// Actual recoverable volume in barrels. Estimates converge on it.
        recoverable_bbl: f64,
    },
    DryHole,
}

/// Exploration well commitment and outcome.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationWell {
    /// Cost has been paid; the well will be drilled whatever the gate decides.
    pub committed: bool,
    pub cost: Decimal,
    pub outcome: Option<DrillOutcome>,
}

/// Percentile reserve estimate in barrels (P90 low, P10 high).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReserveEstimate {
    pub p90_bbl: f64,
    pub p50_bbl: f64,
    pub p10_bbl: f64,
}

/// Planned development: well count, expected plateau rate and valuation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentPlan {
    pub well_count: u32,
    /// Expected field rate in barrels per day.
    pub estimated_production: f64,
    /// NPV preview at the time the plan was set.
    pub npv: Decimal,
}

/// Outstanding debt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub amount: Decimal,
    /// Interest charged to spend when the loan was originated.
    pub interest: Decimal,
    /// Financing structure identifier.
    pub source: String,
}

/// Costs committed when the field was sanctioned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SanctionRecord {
    pub total_cost: Decimal,
    pub concept_cost: Decimal,
    pub wells_cost: Decimal,
    pub facility_cost: Decimal,
    /// Smallest facility tier able to carry the planned rate.
    pub minimum_facility: String,
    /// Budget shortfall before financing.
    pub shortfall: Decimal,
    /// Principal originated to cover the shortfall.
    pub loan_originated: Decimal,
}

/// One decided gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub phase: Phase,
    pub approved: bool,
    pub forced: bool,
    pub approvals: Vec<(Role, bool)>,
    pub warnings: Vec<String>,
}

/// Append-only audit entry for a committed action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Production day (0 before first oil).
    pub day: u32,
    pub phase: Phase,
    pub action: String,
    pub cost: Decimal,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<(Role, bool)>,
}

/// Monthly financial snapshot. Entries are never edited once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialHistoryEntry {
    pub day: u32,
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub opex: Decimal,
    pub royalties: Decimal,
    pub tax: Decimal,
}

/// Running sums since the last monthly flush.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAccumulator {
    pub revenue: Decimal,
    pub opex: Decimal,
    pub royalties: Decimal,
    pub tax: Decimal,
}

impl MonthlyAccumulator {
    pub fn is_zero(&self) -> bool {
        self.revenue.is_zero()
            && self.opex.is_zero()
            && self.royalties.is_zero()
            && self.tax.is_zero()
    }
}

/// Field-level production state and cumulative financial results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateProduction {
    /// Plateau rate before decline, capped by facility capacity.
    pub daily_output: f64,
    /// Rate produced on the most recent day.
    pub current_daily: f64,
    pub cumulative_output: f64,
    pub days_elapsed: u32,
    /// Volume the field can still give up before it is exhausted.
    pub recoverable_reserves: f64,
    pub facility_capacity: f64,
    pub total_revenue: Decimal,
    pub total_opex: Decimal,
    pub total_royalties: Decimal,
    pub total_tax: Decimal,
    /// Sum of daily net cash applied to the budget.
    pub cumulative_net_cash: Decimal,
    pub monthly: MonthlyAccumulator,
    pub history: Vec<FinancialHistoryEntry>,
    pub halted: bool,
}

impl AggregateProduction {
    pub fn new(daily_output: f64, recoverable_reserves: f64, facility_capacity: f64) -> Self {
        Self {
            daily_output,
            current_daily: daily_output,
            cumulative_output: 0.0,
            days_elapsed: 0,
            recoverable_reserves,
            facility_capacity,
            total_revenue: Decimal::ZERO,
            total_opex: Decimal::ZERO,
            total_royalties: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            cumulative_net_cash: Decimal::ZERO,
            monthly: MonthlyAccumulator::default(),
            history: Vec::new(),
            halted: false,
        }
    }

    pub fn remaining_reserves(&self) -> f64 {
        (self.recoverable_reserves - self.cumulative_output).max(0.0)
    }
}

/// One sample of the oil price log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub day: u32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

/// Current oil price and its append-only history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub current: f64,
    pub history: Vec<PricePoint>,
}

impl MarketPrice {
    pub fn new(initial: f64) -> Self {
        Self {
            current: initial,
            history: vec![PricePoint {
                day: 0,
                price: initial,
                event: None,
            }],
        }
    }
}

/// The project aggregate. Passed explicitly into every engine function and
/// serialized verbatim as the state snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub start_date: NaiveDate,
    pub phase_index: usize,
    pub status: ProjectStatus,
    pub initial_budget: Decimal,
    pub budget: Decimal,
    pub total_spent: Decimal,
    /// Cumulative gross production revenue.
    pub revenue: Decimal,
    pub team: Vec<Role>,
    pub approvals: ApprovalSet,
    pub geology: Option<GeologicalProfile>,
    pub lease: Option<String>,
    pub seismic_package: Option<String>,
    pub interpretation: Option<Interpretation>,
    /// Chance of success after bonuses and penalties, clamped.
    pub probability: Option<f64>,
    pub risk_modifiers: RiskModifiers,
    pub exploration: ExplorationWell,
    pub reserves: Option<ReserveEstimate>,
    pub appraisal: Option<String>,
    pub feed: Option<String>,
    pub facility: Option<String>,
    pub financing: Option<String>,
    pub development_plan: Option<DevelopmentPlan>,
    pub sanction: Option<SanctionRecord>,
    pub development_drilled: bool,
    pub facilities_confirmed: bool,
    pub loan: Option<Loan>,
    pub individual_wells: bool,
    pub wells: Vec<Well>,
    pub production: Option<AggregateProduction>,
    pub market: Option<MarketPrice>,
    pub gate_history: Vec<GateRecord>,
    pub log: Vec<LogEntry>,
}

impl Project {
    /// Create a project in the first phase with the configured endowment.
    pub fn new(config: &SimConfig) -> Self {
        Self {
            name: config.project_name.clone(),
            start_date: config.start_date,
            phase_index: 0,
            status: ProjectStatus::Active,
            initial_budget: config.initial_budget,
            budget: config.initial_budget,
            total_spent: Decimal::ZERO,
            revenue: Decimal::ZERO,
            team: config.team.clone(),
            approvals: ApprovalSet::default(),
            geology: None,
            lease: None,
            seismic_package: None,
            interpretation: None,
            probability: None,
            risk_modifiers: RiskModifiers::default(),
            exploration: ExplorationWell::default(),
            reserves: None,
            appraisal: None,
            feed: None,
            facility: None,
            financing: None,
            development_plan: None,
            sanction: None,
            development_drilled: false,
            facilities_confirmed: false,
            loan: None,
            individual_wells: config.individual_wells,
            wells: Vec::new(),
            production: None,
            market: None,
            gate_history: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Current phase. An out-of-range index clamps to production.
    pub fn phase(&self) -> Phase {
        Phase::from_index(self.phase_index).unwrap_or(Phase::Production)
    }

    pub fn is_active(&self) -> bool {
        self.status == ProjectStatus::Active
    }

    pub fn ensure_active(&self) -> EngineResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EngineError::ProjectClosed(self.status))
        }
    }

    /// Fail with `PreconditionNotMet` unless the project is active and in `phase`.
    pub fn ensure_phase(&self, phase: Phase) -> EngineResult<()> {
        self.ensure_active()?;
        if self.phase() != phase {
            return Err(EngineError::PreconditionNotMet(vec![format!(
                "action requires the {} phase (current: {})",
                phase.as_str(),
                self.phase().as_str()
            )]));
        }
        Ok(())
    }

    /// Distinct roles on the team.
    pub fn team_size(&self) -> usize {
        self.team.iter().collect::<BTreeSet<_>>().len()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.team.contains(&role)
    }

    /// Check that `amount` can be spent without mutating anything.
    pub fn check_spend(&self, amount: Decimal) -> EngineResult<()> {
        if amount < Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "spend amount must be non-negative, got {amount}"
            )));
        }
        if amount > self.budget {
            return Err(EngineError::InsufficientBudget {
                required: amount,
                available: self.budget,
            });
        }
        Ok(())
    }

    /// Deduct `amount` from the budget. All-or-nothing.
    pub fn spend(&mut self, amount: Decimal) -> EngineResult<()> {
        self.check_spend(amount)?;
        self.commit_spend(amount);
        Ok(())
    }

    /// Deduct without a budget check. Only the sanction side effect uses this,
    /// immediately followed by the compensating loan.
    pub(crate) fn commit_spend(&mut self, amount: Decimal) {
        self.budget -= amount;
        self.total_spent += amount;
    }

    /// Credit loan principal and charge its interest to spend.
    pub fn originate_loan(&mut self, amount: Decimal, interest: Decimal, source: &str) {
        self.budget += amount;
        self.commit_spend(interest);
        match self.loan.as_mut() {
            Some(loan) => {
                loan.amount += amount;
                loan.interest += interest;
                loan.source = source.to_string();
            }
            None => {
                self.loan = Some(Loan {
                    amount,
                    interest,
                    source: source.to_string(),
                })
            }
        }
    }

    /// Spend the full sanction cost and originate the compensating loan in
    /// one step so the negative budget never escapes this call.
    pub fn commit_sanction(
        &mut self,
        total_cost: Decimal,
        loan: Option<(Decimal, Decimal, &str)>,
    ) -> EngineResult<()> {
        let credit = loan.map(|(amount, interest, _)| amount - interest).unwrap_or_default();
        if self.budget + credit < total_cost {
            return Err(EngineError::InsufficientBudget {
                required: total_cost,
                available: self.budget + credit,
            });
        }
        self.commit_spend(total_cost);
        if let Some((amount, interest, source)) = loan {
            self.originate_loan(amount, interest, source);
        }
        Ok(())
    }

    /// Whether a state flag holds.
    pub fn has_flag(&self, flag: ProjectFlag) -> bool {
        match flag {
            ProjectFlag::GeologySelected => self.geology.is_some(),
            ProjectFlag::LeaseSecured => self.lease.is_some(),
            ProjectFlag::SeismicPackageChosen => self.seismic_package.is_some(),
            ProjectFlag::InterpretationRecorded => self.interpretation.is_some(),
            ProjectFlag::ExplorationWellCommitted => self.exploration.committed,
            ProjectFlag::AppraisalComplete => self.appraisal.is_some(),
            ProjectFlag::DevelopmentPlanned => self.development_plan.is_some(),
            ProjectFlag::FeedSelected => self.feed.is_some(),
            ProjectFlag::FacilitySelected => self.facility.is_some(),
            ProjectFlag::FinancingSelected => self.financing.is_some(),
            ProjectFlag::WellsDrilled => self.development_drilled,
            ProjectFlag::FacilitiesConfirmed => self.facilities_confirmed,
        }
    }

    /// Days of production so far.
    pub fn production_day(&self) -> u32 {
        self.production.as_ref().map(|p| p.days_elapsed).unwrap_or(0)
    }

    /// Calendar date of the current production day.
    pub fn current_date(&self) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(self.production_day())))
            .unwrap_or(self.start_date)
    }

    /// Append an audit entry.
    pub fn record(&mut self, action: impl Into<String>, cost: Decimal, outcome: impl Into<String>) {
        self.record_with_approvals(action, cost, outcome, Vec::new());
    }

    pub fn record_with_approvals(
        &mut self,
        action: impl Into<String>,
        cost: Decimal,
        outcome: impl Into<String>,
        approvals: Vec<(Role, bool)>,
    ) {
        let entry = LogEntry {
            day: self.production_day(),
            phase: self.phase(),
            action: action.into(),
            cost,
            outcome: outcome.into(),
            approvals,
        };
        self.log.push(entry);
    }

    /// Ledger identity: endowment minus spend plus loans plus net proceeds.
    pub fn ledger_balanced(&self) -> bool {
        let loans = self.loan.as_ref().map(|l| l.amount).unwrap_or_default();
        let proceeds = self
            .production
            .as_ref()
            .map(|p| p.cumulative_net_cash)
            .unwrap_or_default();
        self.budget == self.initial_budget - self.total_spent + loans + proceeds
    }

    /// Serialize the full state snapshot.
    pub fn snapshot_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
