use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::SeedableRng;

fn producing_field(tables: &field_core::EconomicTables, wells: u32) -> field_core::Project {
    let mut p = field_core::Project::new(&field_core::SimConfig::default());
    p.phase_index = field_core::Phase::Production.index();
    p.geology = tables.geology("sandstone").ok().cloned();
    p.lease = Some("standard".into());
    p.facility = Some("large".into());
    p.exploration.outcome = Some(field_core::DrillOutcome::Discovery {
        recoverable_bbl: 120e6,
    });
    p.development_plan = Some(field_core::DevelopmentPlan {
        well_count: wells,
        estimated_production: 2_000.0 * f64::from(wells),
        npv: rust_decimal::Decimal::ZERO,
    });
    p.wells = (1..=wells)
        .map(|id| field_core::Well::new(id, 2_000.0, 0.12))
        .collect();
    field_runtime::start_production(&mut p, tables).unwrap();
    p
}

fn bench_ticks(c: &mut Criterion) {
    let tables = field_core::EconomicTables::standard();
    let field = producing_field(&tables, 16);
    c.bench_function("production_month", |b| {
        b.iter_batched(
            || (field.clone(), rand_chacha::ChaCha8Rng::seed_from_u64(42)),
            |(mut p, mut rng)| {
                for _ in 0..30 {
                    let _ = field_runtime::advance_day(&mut p, &tables, &mut rng);
                }
                p
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
