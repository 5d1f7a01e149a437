//! Exploration well outcome and reserve estimation.

use field_core::{
    uniform, DrillOutcome, EngineError, EngineResult, FiscalTerms, Project, ReserveEstimate,
    PROBABILITY_MIN,
};
use rand::Rng;

/// Roll the exploration well against the computed chance of success. A
/// discovery draws the hidden recoverable volume from the geology range.
pub fn roll_exploration_well<R: Rng + ?Sized>(
    project: &Project,
    rng: &mut R,
) -> EngineResult<DrillOutcome> {
    let geology = project
        .geology
        .as_ref()
        .ok_or_else(|| EngineError::PreconditionNotMet(vec!["geology not selected".into()]))?;
    let chance = project.probability.unwrap_or(PROBABILITY_MIN);
    if rng.gen::<f64>() >= chance {
        return Ok(DrillOutcome::DryHole);
    }
    let base = uniform(rng, geology.reserves_p90_bbl, geology.reserves_p10_bbl);
    let recoverable_bbl = base * (1.0 + project.risk_modifiers.reserve_modifier).max(0.0);
    Ok(DrillOutcome::Discovery { recoverable_bbl })
}

/// Noisy percentile estimate around the true volume. `reduction` in [0, 1]
/// narrows both the P50 error and the P90-P10 spread.
pub fn estimate_reserves<R: Rng + ?Sized>(
    actual_bbl: f64,
    fiscal: &FiscalTerms,
    reduction: f64,
    rng: &mut R,
) -> ReserveEstimate {
    let keep = (1.0 - reduction).clamp(0.0, 1.0);
    let error = fiscal.reserve_estimate_error * keep;
    let spread = fiscal.reserve_estimate_spread * keep;
    let p50_bbl = actual_bbl * uniform(rng, 1.0 - error, 1.0 + error);
    ReserveEstimate {
        p90_bbl: p50_bbl * (1.0 - spread).max(0.0),
        p50_bbl,
        p10_bbl: p50_bbl * (1.0 + spread),
    }
}

/// True recoverable volume, if the well found oil.
pub fn discovered_volume(project: &Project) -> Option<f64> {
    match project.exploration.outcome {
        Some(DrillOutcome::Discovery { recoverable_bbl }) => Some(recoverable_bbl),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_core::{EconomicTables, SimConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn project() -> Project {
        let tables = EconomicTables::standard();
        let mut p = Project::new(&SimConfig::default());
        p.geology = Some(tables.geology("sandstone").unwrap().clone());
        p
    }

    #[test]
    fn discovery_volume_is_inside_geology_range() {
        let mut p = project();
        p.probability = Some(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        match roll_exploration_well(&p, &mut rng).unwrap() {
            DrillOutcome::Discovery { recoverable_bbl } => {
                assert!((40e6..=140e6).contains(&recoverable_bbl));
            }
            DrillOutcome::DryHole => panic!("certain discovery came up dry"),
        }
    }

    #[test]
    fn zero_chance_is_always_dry() {
        let mut p = project();
        p.probability = Some(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..50 {
            assert_eq!(roll_exploration_well(&p, &mut rng).unwrap(), DrillOutcome::DryHole);
        }
    }

    #[test]
    fn appraisal_narrows_the_estimate() {
        let fiscal = EconomicTables::standard().fiscal;
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let wide = estimate_reserves(100e6, &fiscal, 0.0, &mut rng);
        let narrow = estimate_reserves(100e6, &fiscal, 0.65, &mut rng);
        assert!((wide.p10_bbl - wide.p90_bbl) / wide.p50_bbl > (narrow.p10_bbl - narrow.p90_bbl) / narrow.p50_bbl);
        assert!((70e6..=130e6).contains(&wide.p50_bbl));
        assert!((89.5e6..=110.5e6).contains(&narrow.p50_bbl));
        assert!(narrow.p90_bbl <= narrow.p50_bbl && narrow.p50_bbl <= narrow.p10_bbl);
    }
}
