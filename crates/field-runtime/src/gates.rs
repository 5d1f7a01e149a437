//! Decision gate engine: readiness, quorum, side effects and phase advance.

use crate::exploration::{estimate_reserves, roll_exploration_well};
use field_core::{
    injected_requirements, DrillOutcome, EconomicTables, EngineError, EngineResult,
    GateDefinition, GateRecord, Phase, Project, ProjectStatus, Requirement, Role, SanctionRecord,
};
use field_econ::{development_cost, project_npv, scale_money};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Readiness of the gate closing the current phase.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GateEvaluation {
    pub phase: Phase,
    pub title: String,
    pub can_proceed: bool,
    /// Every unmet requirement, in definition order.
    pub missing: Vec<String>,
    pub cost: Decimal,
    pub approvals: usize,
    pub quorum: usize,
    pub missing_required: Vec<Role>,
    pub missing_recommended: Vec<Role>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub approve: bool,
    /// Proceed even though required roles have not signed off.
    #[serde(default)]
    pub force: bool,
}

impl GateDecision {
    pub fn approve() -> Self {
        Self {
            approve: true,
            force: false,
        }
    }

    pub fn reject() -> Self {
        Self::default()
    }

    pub fn forced() -> Self {
        Self {
            approve: true,
            force: true,
        }
    }
}

/// What a gate decision did.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GateOutcome {
    pub phase: Phase,
    pub approved: bool,
    pub status: ProjectStatus,
    /// Money spent by the decision, loan interest included.
    pub cost: Decimal,
    /// Gate of the phase just entered. The caller should open it next.
    pub next_gate: Option<Phase>,
    pub warnings: Vec<String>,
    pub message: String,
}

fn current_gate<'a>(project: &Project, tables: &'a EconomicTables) -> EngineResult<&'a GateDefinition> {
    project.ensure_active()?;
    let phase = project.phase();
    tables.gate_for(phase).ok_or_else(|| {
        EngineError::PreconditionNotMet(vec![format!(
            "the {} phase has no decision gate",
            phase.as_str()
        )])
    })
}

fn unmet(
    requirement: &Requirement,
    gate: &GateDefinition,
    project: &Project,
    tables: &EconomicTables,
) -> Option<String> {
    match requirement {
        Requirement::Flag { flag } => (!project.has_flag(*flag)).then(|| flag.describe().to_string()),
        Requirement::Budget { amount } => (project.budget < *amount)
            .then(|| format!("budget of at least {amount} (available {})", project.budget)),
        Requirement::GateCost => (project.budget < gate.cost).then(|| {
            format!(
                "budget to cover the gate cost of {} (available {})",
                gate.cost, project.budget
            )
        }),
        Requirement::ProbabilityComputed => project
            .probability
            .is_none()
            .then(|| "chance of success computed".to_string()),
        Requirement::ReservesEstimated => project
            .reserves
            .is_none()
            .then(|| "reserve estimate available".to_string()),
        Requirement::NpvAboveHurdle => {
            let hurdle = tables.fiscal.npv_hurdle;
            match &project.development_plan {
                None => Some("development NPV computed".to_string()),
                Some(plan) => match project_npv(project, tables, plan.well_count) {
                    Ok(npv) if npv >= hurdle => None,
                    Ok(npv) => Some(format!("NPV {npv} below hurdle {hurdle}")),
                    Err(e) => Some(format!("NPV unavailable: {e}")),
                },
            }
        }
    }
}

/// Walk every requirement of the current gate and report all blockers.
/// Pure: calling it twice on the same state gives the same answer.
pub fn evaluate_gate(project: &Project, tables: &EconomicTables) -> EngineResult<GateEvaluation> {
    let gate = current_gate(project, tables)?;
    let mut requirements: Vec<Requirement> = Vec::new();
    for req in gate
        .requirements
        .iter()
        .cloned()
        .chain(injected_requirements(gate.phase))
    {
        if !requirements.contains(&req) {
            requirements.push(req);
        }
    }
    let missing: Vec<String> = requirements
        .iter()
        .filter_map(|req| unmet(req, gate, project, tables))
        .collect();
    let signed = |role: &Role| project.approvals.is_approved(*role);
    Ok(GateEvaluation {
        phase: gate.phase,
        title: gate.title.clone(),
        can_proceed: missing.is_empty(),
        missing,
        cost: gate.cost,
        approvals: project.approvals.approved_count(),
        quorum: gate.roles.quorum(project.team_size()),
        missing_required: gate.roles.required.iter().filter(|r| !signed(r)).copied().collect(),
        missing_recommended: gate
            .roles
            .recommended
            .iter()
            .filter(|r| !signed(r))
            .copied()
            .collect(),
    })
}

/// Funding plan for field sanction, computed before anything is spent.
struct Sanction {
    record: SanctionRecord,
    loan: Option<(Decimal, Decimal, String)>,
}

fn plan_sanction(project: &Project, tables: &EconomicTables, gate_cost: Decimal) -> EngineResult<Sanction> {
    let plan = project
        .development_plan
        .as_ref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["development plan defined".into()]))?;
    let financing_id = project
        .financing
        .as_deref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["financing selected".into()]))?;
    let financing = tables.financing_option(financing_id)?;
    let cost = development_cost(project, tables, plan.well_count)?;
    let total_cost = cost.total + gate_cost;
    let shortfall = (total_cost - project.budget).max(Decimal::ZERO);

    let mut loan = None;
    if shortfall > Decimal::ZERO {
        if !financing.is_debt() {
            return Err(EngineError::InsufficientBudget {
                required: total_cost,
                available: project.budget,
            });
        }
        let amount = scale_money(shortfall, financing.loan_multiplier)?;
        let rate = financing.interest_rate
            * tables.team_multiplier(&project.team, |b| b.interest_reduction);
        let interest = scale_money(amount, rate)?;
        loan = Some((amount, interest, financing.id.clone()));
    }
    Ok(Sanction {
        record: SanctionRecord {
            total_cost,
            concept_cost: cost.concept,
            wells_cost: cost.wells,
            facility_cost: cost.facility,
            minimum_facility: cost.facility_id,
            shortfall,
            loan_originated: loan.as_ref().map(|l| l.0).unwrap_or_default(),
        },
        loan,
    })
}

fn ensure_drillable(project: &Project, phase: Phase) -> EngineResult<bool> {
    let pending = phase == Phase::Drilling
        && project.exploration.committed
        && project.exploration.outcome.is_none();
    if pending && project.geology.is_none() {
        return Err(EngineError::PreconditionNotMet(vec!["geology not selected".into()]));
    }
    Ok(pending)
}

/// Drill the committed exploration well and record the result.
fn execute_exploration_well<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    rng: &mut R,
) -> EngineResult<DrillOutcome> {
    let outcome = roll_exploration_well(project, rng)?;
    if let DrillOutcome::Discovery { recoverable_bbl } = outcome {
        project.reserves = Some(estimate_reserves(recoverable_bbl, &tables.fiscal, 0.0, rng));
    }
    project.exploration.outcome = Some(outcome.clone());
    let text = describe_outcome(&outcome);
    info!(outcome = %text, "exploration well drilled");
    project.record("exploration_well_result", Decimal::ZERO, text);
    Ok(outcome)
}

fn describe_outcome(outcome: &DrillOutcome) -> String {
    match outcome {
        DrillOutcome::Discovery { .. } => "discovery".to_string(),
        DrillOutcome::DryHole => "dry hole".to_string(),
    }
}

fn close_gate(project: &mut Project, phase: Phase, approved: bool, forced: bool, warnings: Vec<String>) {
    let approvals = project.approvals.votes();
    project.gate_history.push(GateRecord {
        phase,
        approved,
        forced,
        approvals,
        warnings,
    });
    project.approvals.clear();
}

/// Decide the gate of the current phase.
///
/// Reject ends the project (a committed exploration well is still drilled).
/// Approve re-checks readiness, quorum and required sign-offs, applies the
/// gate's side effects and moves to the next phase. Every check runs before
/// the first mutation.
pub fn make_gate_decision<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    decision: GateDecision,
    rng: &mut R,
) -> EngineResult<GateOutcome> {
    let gate = current_gate(project, tables)?;
    let phase = gate.phase;
    let drill_pending = ensure_drillable(project, phase)?;

    if !decision.approve {
        let votes = project.approvals.votes();
        let mut message = format!("{} rejected", gate.title);
        if drill_pending {
            let outcome = execute_exploration_well(project, tables, rng)?;
            message = format!("{message}; committed well drilled: {}", describe_outcome(&outcome));
        }
        close_gate(project, phase, false, decision.force, Vec::new());
        project.status = ProjectStatus::Ended;
        project.record_with_approvals("gate_rejected", Decimal::ZERO, message.clone(), votes);
        warn!(phase = phase.as_str(), "gate rejected, project ended");
        return Ok(GateOutcome {
            phase,
            approved: false,
            status: project.status,
            cost: Decimal::ZERO,
            next_gate: None,
            warnings: Vec::new(),
            message,
        });
    }

    let evaluation = evaluate_gate(project, tables)?;
    if !evaluation.can_proceed {
        return Err(EngineError::PreconditionNotMet(evaluation.missing));
    }
    if evaluation.approvals < evaluation.quorum {
        return Err(EngineError::InsufficientApprovals {
            have: evaluation.approvals,
            needed: evaluation.quorum,
        });
    }
    let mut warnings = Vec::new();
    if !evaluation.missing_required.is_empty() {
        if !decision.force {
            return Err(EngineError::RequiredRolesMissing(evaluation.missing_required));
        }
        for role in &evaluation.missing_required {
            warnings.push(format!("required role {} did not sign off", role.as_str()));
        }
    }
    for role in &evaluation.missing_recommended {
        warnings.push(format!("recommended role {} did not sign off", role.as_str()));
    }

    let sanction = if phase == Phase::Development {
        Some(plan_sanction(project, tables, gate.cost)?)
    } else {
        project.check_spend(gate.cost)?;
        None
    };

    // Checks are done; from here on the decision commits.
    let votes = project.approvals.votes();
    let spent_before = project.total_spent;
    let mut message = format!("{} approved", gate.title);
    match sanction {
        Some(Sanction { record, loan }) => {
            let loan_ref = loan.as_ref().map(|(a, i, s)| (*a, *i, s.as_str()));
            project.commit_sanction(record.total_cost, loan_ref)?;
            if let Some((amount, interest, source)) = &loan {
                info!(%amount, %interest, source = %source, "sanction loan originated");
                message = format!("{message}; loan of {amount} from {source}");
            }
            project.sanction = Some(record);
        }
        None => project.spend(gate.cost)?,
    }

    if drill_pending {
        let outcome = execute_exploration_well(project, tables, rng)?;
        if outcome == DrillOutcome::DryHole {
            close_gate(project, phase, true, decision.force, warnings.clone());
            project.status = ProjectStatus::DryHole;
            let cost = project.total_spent - spent_before;
            message = format!("{message}; exploration well is a dry hole");
            project.record_with_approvals("gate_approved", cost, message.clone(), votes);
            warn!(phase = phase.as_str(), "dry hole, project closed");
            return Ok(GateOutcome {
                phase,
                approved: true,
                status: project.status,
                cost,
                next_gate: None,
                warnings,
                message,
            });
        }
        message = format!("{message}; discovery");
    }

    close_gate(project, phase, true, decision.force, warnings.clone());
    project.phase_index += 1;
    let entered = project.phase();
    let next_gate = tables.gate_for(entered).map(|g| g.phase);
    let cost = project.total_spent - spent_before;
    project.record_with_approvals("gate_approved", cost, message.clone(), votes);
    info!(
        gate = phase.as_str(),
        entered = entered.as_str(),
        %cost,
        forced = decision.force,
        "gate approved"
    );
    Ok(GateOutcome {
        phase,
        approved: true,
        status: project.status,
        cost,
        next_gate,
        warnings,
        message,
    })
}
