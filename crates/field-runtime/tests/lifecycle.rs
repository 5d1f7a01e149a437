use field_core::{EconomicTables, EngineError, Phase, ProjectStatus, Role, SimConfig};
use field_runtime::{Action, FieldSession, Scheduler};
use rust_decimal::Decimal;

fn act(session: &mut FieldSession, action: Action) {
    if let Err(e) = session.apply(&action) {
        panic!("{} failed: {e}", action.name());
    }
}

fn sign_and_approve(session: &mut FieldSession, roles: &[Role]) {
    for role in roles {
        act(
            session,
            Action::SetApproval {
                role: *role,
                approved: true,
            },
        );
    }
    act(
        session,
        Action::MakeGateDecision {
            approve: true,
            force: false,
        },
    );
}

fn new_session(seed: u64, individual_wells: bool) -> FieldSession {
    let config = SimConfig {
        rng_seed: seed,
        individual_wells,
        ..SimConfig::default()
    };
    FieldSession::new(&config, EconomicTables::standard()).unwrap()
}

/// Play through appraisal. `None` when the exploration well is dry.
fn to_development(seed: u64, individual_wells: bool) -> Option<FieldSession> {
    let mut s = new_session(seed, individual_wells);
    act(
        &mut s,
        Action::SelectGeology {
            geology: "sandstone".into(),
        },
    );
    act(&mut s, Action::AdvancePhase);
    act(
        &mut s,
        Action::SecureLease {
            lease: "standard".into(),
        },
    );
    sign_and_approve(&mut s, &[Role::Geologist, Role::FinanceAnalyst]);
    act(
        &mut s,
        Action::StartSeismic {
            package: "3d".into(),
        },
    );
    act(
        &mut s,
        Action::RecordInterpretation {
            probability: 0.9,
            risks: vec!["high_co2".into()],
        },
    );
    sign_and_approve(&mut s, &[Role::Geologist, Role::Geophysicist]);
    act(&mut s, Action::DrillExplorationWell);
    sign_and_approve(&mut s, &[Role::DrillingEngineer, Role::Geologist]);
    if s.project().status != ProjectStatus::Active {
        assert_eq!(s.project().status, ProjectStatus::DryHole);
        return None;
    }
    act(
        &mut s,
        Action::SelectAppraisal {
            option: "two_wells".into(),
        },
    );
    sign_and_approve(&mut s, &[Role::ReservoirEngineer, Role::FinanceAnalyst]);
    assert_eq!(s.project().phase(), Phase::Development);
    Some(s)
}

fn plan(s: &mut FieldSession) {
    act(
        s,
        Action::SelectConcept {
            concept: "fixed_platform".into(),
        },
    );
    act(s, Action::PlanDevelopment { well_count: 8 });
    act(
        s,
        Action::SelectFacility {
            tier: "medium".into(),
        },
    );
    act(
        s,
        Action::SelectFinancing {
            structure: "corporate_loan".into(),
        },
    );
}

fn sanction_and_build(s: &mut FieldSession) {
    sign_and_approve(
        s,
        &[Role::FinanceAnalyst, Role::ReservoirEngineer, Role::FacilitiesEngineer],
    );
    act(s, Action::ExecuteWellDrilling);
    act(s, Action::ConfirmFacilities);
    act(s, Action::AdvancePhase);
}

fn first_field(individual_wells: bool) -> (u64, FieldSession) {
    for seed in 0..64 {
        if let Some(mut s) = to_development(seed, individual_wells) {
            plan(&mut s);
            sanction_and_build(&mut s);
            return (seed, s);
        }
    }
    panic!("no discovery in 64 seeds");
}

#[test]
fn full_campaign_keeps_the_ledger() {
    let (_, mut s) = first_field(true);
    let p = s.project();
    assert_eq!(p.phase(), Phase::Production);
    assert_eq!(p.wells.len(), 8);
    assert!(p.ledger_balanced());
    assert!(p.budget >= Decimal::ZERO);
    let sanction = p.sanction.clone().unwrap();
    assert_eq!(sanction.minimum_facility, "medium");
    assert_eq!(p.loan.as_ref().map(|l| l.amount), Some(sanction.loan_originated));

    let periods = Scheduler::new(30).run_until_halt(&mut s, 500).unwrap();
    assert!(!periods.is_empty());
    let p = s.project();
    assert_eq!(p.status, ProjectStatus::Completed);
    assert!(p.ledger_balanced());
    let prod = p.production.as_ref().unwrap();
    assert!(prod.days_elapsed <= 3_650);
    assert_eq!(prod.total_revenue, p.revenue);
    let booked: Decimal = prod.history.iter().map(|h| h.revenue).sum();
    assert_eq!(booked, prod.total_revenue);
    assert!(prod.history.windows(2).all(|w| w[0].day < w[1].day));
    let net: Decimal = periods.iter().map(|x| x.net_cash).sum();
    assert_eq!(net, prod.cumulative_net_cash);
    assert!(s.advance_day().unwrap().is_none());
}

#[test]
fn preview_and_hurdle_use_the_same_valuation() {
    let mut s = (0..64)
        .find_map(|seed| to_development(seed, true))
        .expect("a discovery");
    plan(&mut s);
    let stored = s.project().development_plan.as_ref().map(|d| d.npv);
    let preview = s.preview_npv(8).unwrap();
    assert_eq!(stored, Some(preview));
    assert_eq!(preview, s.preview_npv(8).unwrap());

    let a = s.evaluate_gate().unwrap();
    let b = s.evaluate_gate().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.can_proceed, preview >= s.tables().fiscal.npv_hurdle);
}

#[test]
fn equal_seeds_replay_identically() {
    let (seed, mut a) = first_field(true);
    let mut b = to_development(seed, true).unwrap();
    plan(&mut b);
    sanction_and_build(&mut b);
    for _ in 0..400 {
        let ra = a.advance_day().unwrap();
        let rb = b.advance_day().unwrap();
        assert_eq!(ra, rb);
    }
    assert_eq!(a.snapshot().unwrap(), b.snapshot().unwrap());
}

#[test]
fn aggregate_mode_produces_without_wells() {
    let (_, mut s) = first_field(false);
    assert!(s.project().wells.is_empty());
    let summary = Scheduler::new(365).run_period(&mut s).unwrap();
    assert_eq!(summary.days, 365);
    assert!(summary.output > 0.0);
    assert!(s.project().ledger_balanced());
    assert_eq!(s.project().production.as_ref().unwrap().history.len(), 12);
}

#[test]
fn small_team_can_force_a_gate_with_warnings() {
    let config = SimConfig {
        team: vec![Role::Geologist],
        ..SimConfig::default()
    };
    let mut s = FieldSession::new(&config, EconomicTables::standard()).unwrap();
    act(
        &mut s,
        Action::SelectGeology {
            geology: "carbonate".into(),
        },
    );
    act(&mut s, Action::AdvancePhase);
    act(
        &mut s,
        Action::SecureLease {
            lease: "sliding_scale".into(),
        },
    );
    act(
        &mut s,
        Action::SetApproval {
            role: Role::Geologist,
            approved: true,
        },
    );
    let eval = s.evaluate_gate().unwrap();
    assert_eq!(eval.quorum, 1);
    let err = s
        .apply(&Action::MakeGateDecision {
            approve: true,
            force: false,
        })
        .unwrap_err();
    assert_eq!(err, EngineError::RequiredRolesMissing(vec![Role::FinanceAnalyst]));

    let report = s
        .apply(&Action::MakeGateDecision {
            approve: true,
            force: true,
        })
        .unwrap();
    assert_eq!(report.next_gate, Some(Phase::Seismic));
    let record = &s.project().gate_history[0];
    assert!(record.forced);
    assert!(!record.warnings.is_empty());
}

#[test]
fn rejection_is_terminal() {
    let mut s = new_session(3, true);
    act(
        &mut s,
        Action::SelectGeology {
            geology: "shale".into(),
        },
    );
    act(&mut s, Action::AdvancePhase);
    let spent_before = s.project().total_spent;
    act(
        &mut s,
        Action::MakeGateDecision {
            approve: false,
            force: false,
        },
    );
    assert_eq!(s.project().status, ProjectStatus::Ended);
    assert_eq!(s.project().total_spent, spent_before);
    let err = s
        .apply(&Action::SecureLease {
            lease: "standard".into(),
        })
        .unwrap_err();
    assert_eq!(err, EngineError::ProjectClosed(ProjectStatus::Ended));
    let log = &s.project().log;
    assert_eq!(log.last().map(|e| e.action.as_str()), Some("gate_rejected"));
}

#[test]
fn snapshot_round_trips_mid_campaign() {
    let s = to_development(0, true).or_else(|| to_development(1, true));
    if let Some(s) = s {
        let json = s.snapshot().unwrap();
        let back: field_core::Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back.phase(), Phase::Development);
        assert_eq!(back.log.len(), s.project().log.len());
    }
}

const OPENING_SCRIPT: &str = r#"
- action: select_geology
  geology: sandstone
- action: advance_phase
- action: secure_lease
  lease: standard
- action: set_approval
  role: geologist
  approved: true
- action: set_approval
  role: finance_analyst
  approved: true
- action: make_gate_decision
  approve: true
- action: start_seismic
  package: 3d
"#;

#[test]
fn yaml_script_replays_through_the_session() {
    let script: Vec<Action> = serde_yaml::from_str(OPENING_SCRIPT).unwrap();
    assert_eq!(script.len(), 7);
    let mut s = new_session(11, true);
    let reports = s.apply_all(&script).unwrap();
    assert_eq!(reports.len(), script.len());
    assert_eq!(reports[5].next_gate, Some(Phase::Seismic));

    let project = s.into_project();
    assert_eq!(project.phase(), Phase::Seismic);
    assert_eq!(project.seismic_package.as_deref(), Some("3d"));
    assert_eq!(project.gate_history.len(), 1);
    assert!(project.ledger_balanced());
}

#[test]
fn script_stops_at_the_first_failure() {
    let script: Vec<Action> = serde_yaml::from_str(OPENING_SCRIPT).unwrap();
    let mut s = new_session(12, true);
    // without the geology selection nothing after it can run
    let err = s.apply_all(&script[1..]).unwrap_err();
    assert!(matches!(err, EngineError::PreconditionNotMet(_)));
    assert_eq!(s.project().phase(), Phase::Geology);
    assert!(s.project().log.is_empty());
}
