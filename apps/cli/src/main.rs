#![deny(warnings)]

//! Headless CLI: plays a scripted campaign through every decision gate, then
//! runs the producing field on the scheduler and prints KPIs.

use anyhow::{bail, Context, Result};
use field_core::{EconomicTables, Phase, ProjectStatus, SimConfig};
use field_econ::estimated_field_rate;
use field_runtime::{Action, FieldSession, Scheduler};
use rust_decimal::Decimal;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<String>,
    tables: Option<String>,
    years: Option<u32>,
    seed: Option<u64>,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next(),
            "--tables" => args.tables = it.next(),
            "--years" => args.years = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

fn load(args: &Args) -> Result<(SimConfig, EconomicTables)> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            SimConfig::from_yaml_str(&text)?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    let tables = match &args.tables {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            EconomicTables::from_yaml_str(&text)?
        }
        None => EconomicTables::standard(),
    };
    Ok((config, tables))
}

fn act(session: &mut FieldSession, action: Action) -> Result<()> {
    let name = action.name();
    let report = session
        .apply(&action)
        .with_context(|| format!("{name} failed"))?;
    info!(action = name, cost = %report.cost, "{}", report.message);
    Ok(())
}

/// Every team member signs, then the gate is approved. Required roles
/// missing from the team are forced through.
fn pass_gate(session: &mut FieldSession) -> Result<()> {
    for role in session.project().team.clone() {
        act(session, Action::SetApproval { role, approved: true })?;
    }
    let eval = session.evaluate_gate()?;
    if !eval.can_proceed {
        bail!("{} blocked: {}", eval.title, eval.missing.join(", "));
    }
    let force = !eval.missing_required.is_empty();
    if force {
        warn!(gate = %eval.title, "forcing gate without required roles");
    }
    act(
        session,
        Action::MakeGateDecision {
            approve: true,
            force,
        },
    )
}

/// Well count with the best NPV preview that some facility can carry.
fn best_well_count(session: &FieldSession) -> Result<(u32, String)> {
    let tables = session.tables();
    let mut best: Option<(Decimal, u32, String)> = None;
    for n in 1..=tables.fiscal.max_development_wells {
        let rate = estimated_field_rate(session.project(), n)?;
        let Some(tier) = tables.minimum_facility(rate) else {
            break;
        };
        let npv = session.preview_npv(n)?;
        if best.as_ref().map_or(true, |(b, _, _)| npv > *b) {
            best = Some((npv, n, tier.id.clone()));
        }
    }
    match best {
        Some((npv, n, tier)) => {
            info!(wells = n, %npv, facility = %tier, "development plan chosen");
            Ok((n, tier))
        }
        None => bail!("no facility can carry a single well"),
    }
}

fn campaign(session: &mut FieldSession) -> Result<bool> {
    act(session, Action::SelectGeology { geology: "sandstone".into() })?;
    act(session, Action::AdvancePhase)?;
    act(session, Action::SecureLease { lease: "standard".into() })?;
    pass_gate(session)?;
    act(session, Action::StartSeismic { package: "3d".into() })?;
    act(
        session,
        Action::RecordInterpretation {
            probability: 0.55,
            risks: vec!["compartmentalization".into()],
        },
    )?;
    pass_gate(session)?;
    act(session, Action::DrillExplorationWell)?;
    pass_gate(session)?;
    if session.project().status == ProjectStatus::DryHole {
        return Ok(false);
    }
    act(session, Action::SelectAppraisal { option: "two_wells".into() })?;
    pass_gate(session)?;

    act(session, Action::SelectConcept { concept: "fixed_platform".into() })?;
    let (wells, tier) = best_well_count(session)?;
    act(session, Action::PlanDevelopment { well_count: wells })?;
    act(session, Action::SelectFacility { tier })?;
    act(session, Action::SelectFinancing { structure: "corporate_loan".into() })?;
    pass_gate(session)?;

    act(session, Action::ExecuteWellDrilling)?;
    act(session, Action::ConfirmFacilities)?;
    act(session, Action::AdvancePhase)?;
    Ok(session.project().phase() == Phase::Production)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, rev = env!("FIELD_SIM_REV"), "starting CLI");
    let (config, tables) = load(&args)?;
    let scheduler = Scheduler::from_config(&config);
    let mut session = FieldSession::new(&config, tables)?;

    if !campaign(&mut session)? {
        let p = session.project();
        println!(
            "Dry hole | spent: ${} | budget left: ${}",
            p.total_spent, p.budget
        );
        return Ok(());
    }

    let max_days = args.years.map_or(u32::MAX, |y| y.saturating_mul(365));
    let max_periods = max_days.div_ceil(scheduler.period_days());
    let periods = scheduler.run_until_halt(&mut session, max_periods)?;
    let shocks: usize = periods.iter().map(|p| p.shocks.len()).sum();
    let events: usize = periods.iter().map(|p| p.well_events).sum();

    let p = session.project();
    if !p.ledger_balanced() {
        bail!("ledger out of balance");
    }
    let npv = p.development_plan.as_ref().map(|d| d.npv).unwrap_or_default();
    let loan = p.loan.as_ref().map(|l| l.amount).unwrap_or_default();
    if let Some(prod) = &p.production {
        println!(
            "Field {} | status: {:?} | wells: {} | FID NPV: ${} | loan: ${}",
            p.name,
            p.status,
            p.wells.len(),
            npv,
            loan
        );
        println!(
            "KPI | days: {} | output: {:.0} bbl | revenue: ${} | royalties: ${} | opex: ${} | tax: ${} | net: ${} | budget: ${} | shocks: {} | well events: {}",
            prod.days_elapsed,
            prod.cumulative_output,
            prod.total_revenue,
            prod.total_royalties,
            prod.total_opex,
            prod.total_tax,
            prod.cumulative_net_cash,
            p.budget,
            shocks,
            events
        );
    }
    if args.json {
        println!("{}", session.snapshot()?);
    }
    Ok(())
}
