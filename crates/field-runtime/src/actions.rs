//! Player action API.
//!
//! Every player-triggered transition is one [`Action`] variant. Actions are
//! plain data so a host can queue, log and replay them; [`apply_action`] is
//! the single dispatch point. Each handler validates everything first and
//! mutates last, so an `Err` leaves the project as it was.

use crate::exploration::{discovered_volume, estimate_reserves};
use crate::gates::{make_gate_decision, GateDecision};
use crate::production::start_production;
use field_core::{
    DevelopmentPlan, EconomicTables, EngineError, EngineResult, Interpretation, Phase, Project,
    RiskModifiers, Role, Well, WellAction, PROBABILITY_MAX, PROBABILITY_MIN,
};
use field_econ::{estimated_field_rate, project_npv, scale_money, to_money};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A discrete player action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SelectGeology { geology: String },
    SecureLease { lease: String },
    StartSeismic { package: String },
    /// Hand over the seismic interpretation: a raw probability in [0, 1] and
    /// named risks.
    RecordInterpretation {
        probability: f64,
        #[serde(default)]
        risks: Vec<String>,
    },
    DrillExplorationWell,
    SelectAppraisal { option: String },
    SelectConcept { concept: String },
    PlanDevelopment { well_count: u32 },
    SelectFacility { tier: String },
    SelectFinancing { structure: String },
    ExecuteWellDrilling,
    ConfirmFacilities,
    SecureLoan { amount: Decimal, source: String },
    SetApproval { role: Role, approved: bool },
    MakeGateDecision {
        approve: bool,
        #[serde(default)]
        force: bool,
    },
    AdvancePhase,
    ShutInWell { well_id: u32 },
    RestartWell { well_id: u32 },
    WorkoverWell { well_id: u32 },
    StimulateWell { well_id: u32 },
    RepairWell { well_id: u32 },
    AbandonWell { well_id: u32 },
}

impl Action {
    /// Stable snake_case name used in the audit log.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SelectGeology { .. } => "select_geology",
            Action::SecureLease { .. } => "secure_lease",
            Action::StartSeismic { .. } => "start_seismic",
            Action::RecordInterpretation { .. } => "record_interpretation",
            Action::DrillExplorationWell => "drill_exploration_well",
            Action::SelectAppraisal { .. } => "select_appraisal",
            Action::SelectConcept { .. } => "select_concept",
            Action::PlanDevelopment { .. } => "plan_development",
            Action::SelectFacility { .. } => "select_facility",
            Action::SelectFinancing { .. } => "select_financing",
            Action::ExecuteWellDrilling => "execute_well_drilling",
            Action::ConfirmFacilities => "confirm_facilities",
            Action::SecureLoan { .. } => "secure_loan",
            Action::SetApproval { .. } => "set_approval",
            Action::MakeGateDecision { .. } => "make_gate_decision",
            Action::AdvancePhase => "advance_phase",
            Action::ShutInWell { .. } => "shut_in_well",
            Action::RestartWell { .. } => "restart_well",
            Action::WorkoverWell { .. } => "workover_well",
            Action::StimulateWell { .. } => "stimulate_well",
            Action::RepairWell { .. } => "repair_well",
            Action::AbandonWell { .. } => "abandon_well",
        }
    }

    /// Target well and transition for well-maintenance actions.
    pub fn well_action(&self) -> Option<(u32, WellAction)> {
        match *self {
            Action::ShutInWell { well_id } => Some((well_id, WellAction::ShutIn)),
            Action::RestartWell { well_id } => Some((well_id, WellAction::Restart)),
            Action::WorkoverWell { well_id } => Some((well_id, WellAction::Workover)),
            Action::StimulateWell { well_id } => Some((well_id, WellAction::Stimulate)),
            Action::RepairWell { well_id } => Some((well_id, WellAction::Repair)),
            Action::AbandonWell { well_id } => Some((well_id, WellAction::Abandon)),
            _ => None,
        }
    }
}

/// Outcome of a committed action.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionReport {
    pub action: &'static str,
    pub message: String,
    pub cost: Decimal,
    /// Set when the action entered a phase that carries a gate.
    pub next_gate: Option<Phase>,
}

impl ActionReport {
    fn new(action: &'static str, message: String, cost: Decimal) -> Self {
        Self {
            action,
            message,
            cost,
            next_gate: None,
        }
    }
}

fn blocked(reason: impl Into<String>) -> EngineError {
    EngineError::PreconditionNotMet(vec![reason.into()])
}

fn require<'a, T>(value: &'a Option<T>, what: &str) -> EngineResult<&'a T> {
    value.as_ref().ok_or_else(|| blocked(what))
}

/// Apply one action to the project.
pub fn apply_action<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    action: &Action,
    rng: &mut R,
) -> EngineResult<ActionReport> {
    let name = action.name();
    let (message, cost) = match action {
        Action::SelectGeology { geology } => select_geology(project, tables, geology)?,
        Action::SecureLease { lease } => secure_lease(project, tables, lease)?,
        Action::StartSeismic { package } => start_seismic(project, tables, package)?,
        Action::RecordInterpretation { probability, risks } => {
            record_interpretation(project, tables, *probability, risks)?
        }
        Action::DrillExplorationWell => drill_exploration_well(project, tables)?,
        Action::SelectAppraisal { option } => select_appraisal(project, tables, option, rng)?,
        Action::SelectConcept { concept } => select_concept(project, tables, concept)?,
        Action::PlanDevelopment { well_count } => plan_development(project, tables, *well_count)?,
        Action::SelectFacility { tier } => select_facility(project, tables, tier)?,
        Action::SelectFinancing { structure } => select_financing(project, tables, structure)?,
        Action::ExecuteWellDrilling => execute_well_drilling(project, tables, rng)?,
        Action::ConfirmFacilities => confirm_facilities(project, tables)?,
        Action::SecureLoan { amount, source } => secure_loan(project, tables, *amount, source)?,
        Action::SetApproval { role, approved } => set_approval(project, tables, *role, *approved)?,
        Action::MakeGateDecision { approve, force } => {
            let decision = GateDecision {
                approve: *approve,
                force: *force,
            };
            let outcome = make_gate_decision(project, tables, decision, rng)?;
            let mut report = ActionReport::new(name, outcome.message, outcome.cost);
            report.next_gate = outcome.next_gate;
            return Ok(report);
        }
        Action::AdvancePhase => {
            let message = advance_phase(project, tables)?;
            project.record(name, Decimal::ZERO, message.clone());
            let mut report = ActionReport::new(name, message, Decimal::ZERO);
            report.next_gate = tables.gate_for(project.phase()).map(|g| g.phase);
            return Ok(report);
        }
        Action::ShutInWell { .. }
        | Action::RestartWell { .. }
        | Action::WorkoverWell { .. }
        | Action::StimulateWell { .. }
        | Action::RepairWell { .. }
        | Action::AbandonWell { .. } => match action.well_action() {
            Some((well_id, kind)) => maintain_well(project, tables, well_id, kind, rng)?,
            None => return Err(EngineError::InvalidInput(format!("{name} has no well target"))),
        },
    };
    project.record(name, cost, message.clone());
    debug!(action = name, %cost, "action applied");
    Ok(ActionReport::new(name, message, cost))
}

type Applied = (String, Decimal);

fn select_geology(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Geology)?;
    if project.geology.is_some() {
        return Err(blocked("geology already selected"));
    }
    let profile = tables.geology(id)?.clone();
    let message = format!("basin geology: {}", profile.name);
    project.geology = Some(profile);
    Ok((message, Decimal::ZERO))
}

fn secure_lease(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Lease)?;
    if project.lease.is_some() {
        return Err(blocked("lease already secured"));
    }
    let lease = tables.lease(id)?;
    project.spend(lease.cost)?;
    project.lease = Some(lease.id.clone());
    Ok((format!("lease secured: {}", lease.name), lease.cost))
}

fn start_seismic(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Seismic)?;
    if project.seismic_package.is_some() {
        return Err(blocked("seismic survey already acquired"));
    }
    let package = tables.seismic_package(id)?;
    let reduction = tables.team_multiplier(&project.team, |b| b.seismic_cost_reduction);
    let cost = scale_money(package.cost, reduction)?;
    project.spend(cost)?;
    project.seismic_package = Some(package.id.clone());
    Ok((format!("{} acquired", package.name), cost))
}

fn record_interpretation(
    project: &mut Project,
    tables: &EconomicTables,
    raw: f64,
    risks: &[String],
) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Seismic)?;
    if !raw.is_finite() || !(0.0..=1.0).contains(&raw) {
        return Err(EngineError::InvalidInput(format!(
            "interpreted probability must be within [0,1], got {raw}"
        )));
    }
    let package_id = require(&project.seismic_package, "seismic package chosen")?;
    let package = tables.seismic_package(package_id)?;
    let geology = require(&project.geology, "geology selected")?;

    let mut modifiers = RiskModifiers::default();
    let mut unmapped = Vec::new();
    for risk in risks {
        match tables.risks.get(risk) {
            Some(m) => modifiers.accumulate(m),
            None => unmapped.push(risk.as_str()),
        }
    }
    let team_bonus = tables.team_bonus(&project.team, |b| b.probability_bonus);
    let probability = (raw * geology.probability_multiplier + package.probability_bonus + team_bonus
        - modifiers.probability_penalty)
        .clamp(PROBABILITY_MIN, PROBABILITY_MAX);
    if !probability.is_finite() {
        return Err(EngineError::NonFinite);
    }

    let mut message = format!("chance of success {:.1}%", probability * 100.0);
    if !unmapped.is_empty() {
        message.push_str(&format!("; risks without modifiers: {}", unmapped.join(", ")));
    }
    project.interpretation = Some(Interpretation {
        raw_probability: raw,
        risks: risks.to_vec(),
    });
    project.probability = Some(probability);
    project.risk_modifiers = modifiers;
    Ok((message, Decimal::ZERO))
}

fn drill_exploration_well(project: &mut Project, tables: &EconomicTables) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Drilling)?;
    if project.exploration.committed {
        return Err(blocked("exploration well already committed"));
    }
    let geology = require(&project.geology, "geology selected")?;
    let reduction = tables.team_multiplier(&project.team, |b| b.drilling_cost_reduction);
    let cost = scale_money(
        tables.costs.exploration_well,
        geology.drilling_cost_multiplier * reduction,
    )?;
    project.spend(cost)?;
    project.exploration.committed = true;
    project.exploration.cost = cost;
    Ok((
        "exploration well committed; it is drilled when the gate is decided".to_string(),
        cost,
    ))
}

fn select_appraisal<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    id: &str,
    rng: &mut R,
) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Appraisal)?;
    if project.appraisal.is_some() {
        return Err(blocked("appraisal programme already completed"));
    }
    let actual = discovered_volume(project).ok_or_else(|| blocked("no discovery to appraise"))?;
    let option = tables.appraisal(id)?;
    project.spend(option.cost)?;
    let estimate = estimate_reserves(actual, &tables.fiscal, option.uncertainty_reduction, rng);
    let message = format!(
        "{}: P90 {:.1} / P50 {:.1} / P10 {:.1} MMbbl",
        option.name,
        estimate.p90_bbl / 1e6,
        estimate.p50_bbl / 1e6,
        estimate.p10_bbl / 1e6
    );
    project.reserves = Some(estimate);
    project.appraisal = Some(option.id.clone());
    Ok((message, option.cost))
}

fn select_concept(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Development)?;
    let concept = tables.feed(id)?;
    project.feed = Some(concept.id.clone());
    Ok((format!("development concept: {}", concept.name), Decimal::ZERO))
}

fn plan_development(
    project: &mut Project,
    tables: &EconomicTables,
    well_count: u32,
) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Development)?;
    let max = tables.fiscal.max_development_wells;
    if well_count == 0 || well_count > max {
        return Err(EngineError::InvalidInput(format!(
            "well count must be within 1..={max}, got {well_count}"
        )));
    }
    let estimated_production = estimated_field_rate(project, well_count)?;
    let npv = project_npv(project, tables, well_count)?;

    let mut message = format!(
        "{well_count} wells, {estimated_production:.0} bpd, NPV {npv}"
    );
    if npv < tables.fiscal.npv_hurdle {
        message.push_str(" (below hurdle)");
    }
    if let Some(id) = project.facility.as_deref() {
        if tables.facility(id)?.capacity_bpd < estimated_production {
            message.push_str(&format!("; facility {id} deselected, too small"));
            project.facility = None;
        }
    }
    project.development_plan = Some(DevelopmentPlan {
        well_count,
        estimated_production,
        npv,
    });
    Ok((message, Decimal::ZERO))
}

fn select_facility(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Development)?;
    let plan = require(&project.development_plan, "development plan defined")?;
    let tier = tables.facility(id)?;
    if tier.capacity_bpd < plan.estimated_production {
        return Err(blocked(format!(
            "{} carries {:.0} bpd, plan needs {:.0} bpd",
            tier.name, tier.capacity_bpd, plan.estimated_production
        )));
    }
    project.facility = Some(tier.id.clone());
    Ok((format!("facility: {}", tier.name), Decimal::ZERO))
}

fn select_financing(project: &mut Project, tables: &EconomicTables, id: &str) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Development)?;
    let option = tables.financing_option(id)?;
    project.financing = Some(option.id.clone());
    Ok((format!("financing: {}", option.name), Decimal::ZERO))
}

fn execute_well_drilling<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    rng: &mut R,
) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Construction)?;
    if project.development_drilled {
        return Err(blocked("development wells already drilled"));
    }
    require(&project.sanction, "field sanctioned")?;
    let plan = require(&project.development_plan, "development plan defined")?;
    let geology = require(&project.geology, "geology selected")?;
    let count = plan.well_count;

    let message = if project.individual_wells {
        let wells: Vec<Well> = (1..=count)
            .map(|id| Well::drill(id, geology, &project.risk_modifiers, &tables.wells, rng))
            .collect();
        let ip: f64 = wells.iter().map(|w| w.initial_productivity).sum();
        project.wells = wells;
        format!("{count} development wells drilled, combined IP {ip:.0} bpd")
    } else {
        format!("{count} development wells drilled")
    };
    project.development_drilled = true;
    info!(wells = count, "development drilling complete");
    Ok((message, Decimal::ZERO))
}

fn confirm_facilities(project: &mut Project, tables: &EconomicTables) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Construction)?;
    if project.facilities_confirmed {
        return Err(blocked("facilities already confirmed"));
    }
    let sanction = require(&project.sanction, "field sanctioned")?;
    let id = require(&project.facility, "facility selected")?;
    let tier = tables.facility(id)?;
    let reduction = tables.team_multiplier(&project.team, |b| b.facility_cost_reduction);
    let selected = scale_money(tier.cost, reduction)?;
    let upgrade = (selected - sanction.facility_cost).max(Decimal::ZERO);
    project.spend(upgrade)?;
    project.facilities_confirmed = true;
    let message = if upgrade > Decimal::ZERO {
        format!("{} confirmed with upgrade", tier.name)
    } else {
        format!("{} confirmed", tier.name)
    };
    Ok((message, upgrade))
}

fn secure_loan(
    project: &mut Project,
    tables: &EconomicTables,
    amount: Decimal,
    source: &str,
) -> EngineResult<Applied> {
    project.ensure_active()?;
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidInput(format!(
            "loan amount must be positive, got {amount}"
        )));
    }
    let option = tables.financing_option(source)?;
    if !option.is_debt() {
        return Err(EngineError::InvalidInput(format!("{} is not a debt structure", option.name)));
    }
    let rate = option.interest_rate * tables.team_multiplier(&project.team, |b| b.interest_reduction);
    let interest = scale_money(amount, rate)?;
    project.originate_loan(amount, interest, &option.id);
    info!(%amount, %interest, source = %option.id, "loan secured");
    Ok((format!("{amount} borrowed from {}, interest {interest}", option.name), interest))
}

fn set_approval(
    project: &mut Project,
    tables: &EconomicTables,
    role: Role,
    approved: bool,
) -> EngineResult<Applied> {
    project.ensure_active()?;
    let phase = project.phase();
    if tables.gate_for(phase).is_none() {
        return Err(blocked(format!("the {} phase has no decision gate", phase.as_str())));
    }
    if !project.has_role(role) {
        return Err(blocked(format!("{} is not on the team", role.as_str())));
    }
    project.approvals.set(role, approved);
    let verb = if approved { "approves" } else { "withholds approval" };
    Ok((format!("{} {verb}", role.as_str()), Decimal::ZERO))
}

/// Move through an ungated phase boundary.
fn advance_phase(project: &mut Project, tables: &EconomicTables) -> EngineResult<String> {
    project.ensure_active()?;
    let phase = project.phase();
    match phase {
        Phase::Geology => {
            require(&project.geology, "geology selected")?;
        }
        Phase::Construction => {
            let mut missing = Vec::new();
            if !project.development_drilled {
                missing.push("development wells drilled".to_string());
            }
            if !project.facilities_confirmed {
                missing.push("facilities confirmed".to_string());
            }
            if !missing.is_empty() {
                return Err(EngineError::PreconditionNotMet(missing));
            }
            start_production(project, tables)?;
        }
        Phase::Production => return Err(blocked("production is the final phase")),
        gated => {
            return Err(blocked(format!(
                "the {} phase closes through its decision gate",
                gated.as_str()
            )))
        }
    }
    project.phase_index += 1;
    project.approvals.clear();
    Ok(format!("entered the {} phase", project.phase().as_str()))
}

fn maintain_well<R: Rng + ?Sized>(
    project: &mut Project,
    tables: &EconomicTables,
    well_id: u32,
    kind: WellAction,
    rng: &mut R,
) -> EngineResult<Applied> {
    project.ensure_phase(Phase::Production)?;
    let index = project
        .wells
        .iter()
        .position(|w| w.id == well_id)
        .ok_or_else(|| EngineError::UnknownOption {
            kind: "well",
            key: well_id.to_string(),
        })?;
    let well = &project.wells[index];
    well.check_action(kind)?;
    let cost = match kind {
        WellAction::ShutIn => {
            project.wells[index].shut_in()?;
            Decimal::ZERO
        }
        WellAction::Restart => {
            let cost = tables.wells.restart_cost;
            project.spend(cost)?;
            project.wells[index].restart()?;
            cost
        }
        WellAction::Abandon => {
            let cost = tables.wells.abandon_cost;
            project.spend(cost)?;
            project.wells[index].abandon()?;
            cost
        }
        WellAction::Workover | WellAction::Stimulate | WellAction::Repair => {
            let plan = well.plan_intervention(kind, &tables.wells, rng)?;
            let reduction =
                tables.team_multiplier(&project.team, |b| b.intervention_cost_reduction);
            let cost = to_money(plan.cost() * reduction)?;
            project.spend(cost)?;
            project.wells[index].apply_intervention(&plan);
            cost
        }
    };
    let status = project.wells[index].status;
    info!(well = well_id, action = kind.as_str(), status = status.as_str(), %cost, "well action");
    Ok((
        format!("well {well_id}: {} -> {}", kind.as_str(), status.as_str()),
        cost,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::{DrillOutcome, ProjectStatus, ReserveEstimate, SimConfig, WellStatus};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (Project, EconomicTables, ChaCha8Rng) {
        (
            Project::new(&SimConfig::default()),
            EconomicTables::standard(),
            ChaCha8Rng::seed_from_u64(21),
        )
    }

    fn at_phase(project: &mut Project, tables: &EconomicTables, phase: Phase) {
        project.phase_index = phase.index();
        project.geology = Some(tables.geology("sandstone").unwrap().clone());
        project.lease = Some("standard".into());
    }

    #[test]
    fn geology_is_selected_once() {
        let (mut p, t, mut rng) = setup();
        let a = Action::SelectGeology {
            geology: "shale".into(),
        };
        apply_action(&mut p, &t, &a, &mut rng).unwrap();
        assert!(apply_action(&mut p, &t, &a, &mut rng).is_err());
        assert_eq!(p.log.len(), 1);
        let report = apply_action(&mut p, &t, &Action::AdvancePhase, &mut rng).unwrap();
        assert_eq!(p.phase(), Phase::Lease);
        assert_eq!(report.next_gate, Some(Phase::Lease));
    }

    #[test]
    fn unaffordable_lease_leaves_state_untouched() {
        let (mut p, t, mut rng) = setup();
        p.phase_index = Phase::Lease.index();
        p.budget = Decimal::new(1_000_000, 0);
        p.initial_budget = p.budget;
        let before = p.clone();
        let err = apply_action(
            &mut p,
            &t,
            &Action::SecureLease {
                lease: "standard".into(),
            },
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientBudget { .. }));
        assert_eq!(p, before);
    }

    #[test]
    fn seismic_cost_reflects_geophysicist() {
        let (mut p, t, mut rng) = setup();
        at_phase(&mut p, &t, Phase::Seismic);
        let report = apply_action(
            &mut p,
            &t,
            &Action::StartSeismic {
                package: "3d".into(),
            },
            &mut rng,
        )
        .unwrap();
        assert_eq!(report.cost, Decimal::new(7_200_000, 0));
    }

    #[test]
    fn interpretation_probability_is_adjusted_and_clamped() {
        let (mut p, t, mut rng) = setup();
        at_phase(&mut p, &t, Phase::Seismic);
        p.team = vec![Role::Geologist];
        p.seismic_package = Some("3d".into());
        let record = |probability: f64, risks: &[&str]| Action::RecordInterpretation {
            probability,
            risks: risks.iter().map(|r| r.to_string()).collect(),
        };
        apply_action(&mut p, &t, &record(0.4, &["fault_seal", "made_up"]), &mut rng).unwrap();
        // 0.4 * 1.0 + 0.05 (3D) + 0.05 (geologist) - 0.10 (fault seal)
        assert!((p.probability.unwrap() - 0.40).abs() < 1e-12);
        assert!((p.risk_modifiers.reserve_modifier + 0.15).abs() < 1e-12);

        apply_action(&mut p, &t, &record(1.0, &[]), &mut rng).unwrap();
        assert_eq!(p.probability, Some(PROBABILITY_MAX));
        assert_eq!(p.risk_modifiers, RiskModifiers::default());

        let err = apply_action(&mut p, &t, &record(1.2, &[]), &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn exploration_well_is_committed_before_the_gate() {
        let (mut p, t, mut rng) = setup();
        at_phase(&mut p, &t, Phase::Drilling);
        let report = apply_action(&mut p, &t, &Action::DrillExplorationWell, &mut rng).unwrap();
        assert_eq!(report.cost, Decimal::new(13_500_000, 0));
        assert!(p.exploration.committed);
        assert!(p.exploration.outcome.is_none());
    }

    #[test]
    fn plan_bounds_and_facility_fit() {
        let (mut p, t, mut rng) = setup();
        at_phase(&mut p, &t, Phase::Development);
        p.reserves = Some(ReserveEstimate {
            p90_bbl: 40e6,
            p50_bbl: 80e6,
            p10_bbl: 120e6,
        });
        let plan = |well_count| Action::PlanDevelopment { well_count };
        assert!(matches!(
            apply_action(&mut p, &t, &plan(0), &mut rng),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(apply_action(&mut p, &t, &plan(31), &mut rng).is_err());
        apply_action(&mut p, &t, &plan(8), &mut rng).unwrap();
        let preview = project_npv(&p, &t, 8).unwrap();
        assert_eq!(p.development_plan.as_ref().map(|d| d.npv), Some(preview));

        let small = Action::SelectFacility {
            tier: "small".into(),
        };
        assert!(apply_action(&mut p, &t, &small, &mut rng).is_err());
        apply_action(
            &mut p,
            &t,
            &Action::SelectFacility {
                tier: "medium".into(),
            },
            &mut rng,
        )
        .unwrap();
        apply_action(&mut p, &t, &plan(20), &mut rng).unwrap();
        assert!(p.facility.is_none());
    }

    #[test]
    fn approvals_only_from_team_members() {
        let (mut p, t, mut rng) = setup();
        p.phase_index = Phase::Lease.index();
        p.team = vec![Role::Geologist];
        let vote = |role| Action::SetApproval {
            role,
            approved: true,
        };
        apply_action(&mut p, &t, &vote(Role::Geologist), &mut rng).unwrap();
        assert!(apply_action(&mut p, &t, &vote(Role::FinanceAnalyst), &mut rng).is_err());
        assert_eq!(p.approvals.approved_count(), 1);
    }

    #[test]
    fn loans_credit_principal_and_charge_interest() {
        let (mut p, t, mut rng) = setup();
        p.team.clear();
        let start = p.budget;
        let report = apply_action(
            &mut p,
            &t,
            &Action::SecureLoan {
                amount: Decimal::new(10_000_000, 0),
                source: "corporate_loan".into(),
            },
            &mut rng,
        )
        .unwrap();
        assert_eq!(report.cost, Decimal::new(1_200_000, 0));
        assert_eq!(p.budget, start + Decimal::new(8_800_000, 0));
        assert!(p.ledger_balanced());
        assert!(apply_action(
            &mut p,
            &t,
            &Action::SecureLoan {
                amount: Decimal::ONE,
                source: "equity".into(),
            },
            &mut rng,
        )
        .is_err());
    }

    fn producing(tables: &EconomicTables) -> Project {
        let mut p = Project::new(&SimConfig::default());
        at_phase(&mut p, tables, Phase::Production);
        p.facility = Some("medium".into());
        p.exploration.outcome = Some(DrillOutcome::Discovery {
            recoverable_bbl: 50e6,
        });
        p.wells = vec![Well::new(1, 2_000.0, 0.1), Well::new(2, 2_000.0, 0.1)];
        start_production(&mut p, tables).unwrap();
        p
    }

    #[test]
    fn well_actions_charge_and_transition() {
        let t = EconomicTables::standard();
        let mut p = producing(&t);
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        apply_action(&mut p, &t, &Action::ShutInWell { well_id: 1 }, &mut rng).unwrap();
        assert_eq!(p.wells[0].status, WellStatus::ShutIn);
        let restart = apply_action(&mut p, &t, &Action::RestartWell { well_id: 1 }, &mut rng).unwrap();
        assert_eq!(restart.cost, Decimal::new(50_000, 0));

        let workover = apply_action(&mut p, &t, &Action::WorkoverWell { well_id: 2 }, &mut rng).unwrap();
        let reduction = t.team_multiplier(&p.team, |b| b.intervention_cost_reduction);
        let lo = to_money(1_500_000.0 * reduction).unwrap();
        let hi = to_money(3_000_000.0 * reduction).unwrap();
        assert!(workover.cost >= lo && workover.cost <= hi);
        assert_eq!(p.wells[1].status, WellStatus::Workover);

        assert!(matches!(
            apply_action(&mut p, &t, &Action::RepairWell { well_id: 9 }, &mut rng),
            Err(EngineError::UnknownOption { .. })
        ));
        apply_action(&mut p, &t, &Action::AbandonWell { well_id: 1 }, &mut rng).unwrap();
        assert!(apply_action(&mut p, &t, &Action::RestartWell { well_id: 1 }, &mut rng).is_err());
        assert!(p.ledger_balanced());
    }

    #[test]
    fn actions_rejected_once_project_closed() {
        let (mut p, t, mut rng) = setup();
        p.status = ProjectStatus::Ended;
        let err = apply_action(
            &mut p,
            &t,
            &Action::SelectGeology {
                geology: "shale".into(),
            },
            &mut rng,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::ProjectClosed(ProjectStatus::Ended));
    }

    #[test]
    fn actions_replay_from_json() {
        let actions = vec![
            Action::SelectGeology {
                geology: "sandstone".into(),
            },
            Action::MakeGateDecision {
                approve: true,
                force: false,
            },
            Action::SetApproval {
                role: Role::FinanceAnalyst,
                approved: true,
            },
        ];
        let json = serde_json::to_string(&actions).unwrap();
        let back: Vec<Action> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, actions);
        let parsed: Action =
            serde_json::from_str(r#"{"action":"make_gate_decision","approve":false}"#).unwrap();
        assert_eq!(
            parsed,
            Action::MakeGateDecision {
                approve: false,
                force: false
            }
        );
    }
}
