//! Static economic tables: costs, option catalogs, role bonuses, market and
//! well parameters, and gate definitions.
//!
//! The engine only reads these. [`EconomicTables::standard`] carries the
//! built-in values; hosts may load replacements from YAML and must pass them
//! through [`validate_tables`].

use crate::error::{EngineError, EngineResult};
use crate::gate::{GateDefinition, ProjectFlag, Requirement, RoleRequirements};
use crate::project::{Phase, RiskModifiers};
use crate::roles::{Role, RoleBonus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Entries addressable by a string key.
pub trait CatalogEntry {
    fn key(&self) -> &str;
}

macro_rules! catalog_entry {
    ($($ty:ty),* $(,)?) => {
        $(impl CatalogEntry for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })*
    };
}

fn lookup<'a, T: CatalogEntry>(items: &'a [T], key: &str, kind: &'static str) -> EngineResult<&'a T> {
    items
        .iter()
        .find(|item| item.key() == key)
        .ok_or_else(|| EngineError::UnknownOption {
            kind,
            key: key.to_string(),
        })
}

/// Basin geology. Copied into the project when selected and never changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeologicalProfile {
    pub id: String,
    pub name: String,
    /// Scales the interpreted chance of success.
    pub probability_multiplier: f64,
    /// Low-case (P90) recoverable volume in barrels.
    pub reserves_p90_bbl: f64,
    /// High-case (P10) recoverable volume in barrels.
    pub reserves_p10_bbl: f64,
    pub ip_min_bpd: f64,
    pub ip_max_bpd: f64,
    pub decline_rate_annual: f64,
    pub opex_multiplier: f64,
    pub drilling_cost_multiplier: f64,
}

/// Royalty owed under lease terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoyaltyTerms {
    Flat {
        rate: f64,
    },
    /// Rate slides with price around a reference, within bounds.
    Sliding {
        base_rate: f64,
        reference_price: f64,
        rate_per_dollar: f64,
        min_rate: f64,
        max_rate: f64,
    },
}

impl RoyaltyTerms {
    /// Effective royalty rate at `price`.
    pub fn rate_at(&self, price: f64) -> f64 {
        match *self {
            RoyaltyTerms::Flat { rate } => rate,
            RoyaltyTerms::Sliding {
                base_rate,
                reference_price,
                rate_per_dollar,
                min_rate,
                max_rate,
            } => (base_rate + (price - reference_price) * rate_per_dollar).clamp(min_rate, max_rate),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaseOption {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
    pub royalty: RoyaltyTerms,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeismicPackage {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
    /// Added to the interpreted chance of success.
    pub probability_bonus: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppraisalOption {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
    /// Fraction of estimate error and P90-P10 spread removed.
    pub uncertainty_reduction: f64,
}

/// Development concept produced by front-end engineering design.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedOption {
    pub id: String,
    pub name: String,
    pub cost: Decimal,
    pub opex_multiplier: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacilityTier {
    pub id: String,
    pub name: String,
    /// Processing capacity in barrels per day.
    pub capacity_bpd: f64,
    pub cost: Decimal,
}

/// Financing structure. A zero multiplier means equity only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancingOption {
    pub id: String,
    pub name: String,
    /// Loan principal as a multiple of the shortfall.
    pub loan_multiplier: f64,
    /// Total interest charged on origination, as a fraction of principal.
    pub interest_rate: f64,
}

impl FinancingOption {
    pub fn is_debt(&self) -> bool {
        self.loan_multiplier > 0.0
    }
}

catalog_entry!(
    GeologicalProfile,
    LeaseOption,
    SeismicPackage,
    AppraisalOption,
    FeedOption,
    FacilityTier,
    FinancingOption,
);

/// Fixed cost constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostTable {
    pub exploration_well: Decimal,
    pub development_well: Decimal,
    pub well_abandonment: Decimal,
    /// Facility decommissioning as a fraction of facility cost.
    pub facility_abandonment_fraction: f64,
    pub fixed_opex_daily: f64,
    pub variable_opex_per_bbl: f64,
    pub per_well_opex_daily: f64,
    pub shut_in_standby_daily: f64,
}

/// Tax, discounting and production horizon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FiscalTerms {
    pub tax_rate: f64,
    pub discount_rate: f64,
    pub npv_hurdle: Decimal,
    pub projection_years: u32,
    /// Price assumed by valuations before first oil.
    pub planning_price: f64,
    pub production_limit_days: u32,
    /// Days between financial history snapshots.
    pub history_interval_days: u32,
    pub max_development_wells: u32,
    /// Initial half-width of the P90-P10 range around P50, as a fraction.
    pub reserve_estimate_spread: f64,
    /// Initial maximum relative error of the P50 estimate.
    pub reserve_estimate_error: f64,
}

/// Discrete quarterly market event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShockEvent {
    pub id: String,
    pub weight: f64,
    pub impact_min: f64,
    pub impact_max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketTable {
    pub initial_price: f64,
    pub floor: f64,
    pub ceiling: f64,
    /// Half-width of the symmetric daily drift.
    pub daily_drift: f64,
    pub quarter_days: u32,
    /// Plain drift days are logged only on multiples of this.
    pub history_interval_days: u32,
    /// Weighted shocks; the remainder of the unit weight is "stable".
    pub shocks: Vec<ShockEvent>,
}

/// Random cost and downtime window of a well intervention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterventionCost {
    pub cost_min: f64,
    pub cost_max: f64,
    pub downtime_min: u32,
    pub downtime_max: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WellEventEffect {
    /// Immediate water cut increase.
    WaterCutJump { min: f64, max: f64 },
    /// Multiplies the production modifier; cleared by workover.
    ProductionDamage { factor_min: f64, factor_max: f64 },
    /// Forces the well to `failed` until repaired or abandoned.
    MechanicalFailure,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellEventDef {
    pub id: String,
    /// Independent probability per check.
    pub probability: f64,
    pub effect: WellEventEffect,
}

/// Well behaviour parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellTable {
    /// Health points lost per producing day.
    pub health_decay_per_day: f64,
    /// Multiplier on health decay while shut in.
    pub shut_in_decay_factor: f64,
    pub event_interval_days: u32,
    pub initial_water_cut_max: f64,
    pub water_cut_growth_min: f64,
    pub water_cut_growth_max: f64,
    pub decline_jitter: f64,
    pub workover: InterventionCost,
    pub workover_ip_fraction_min: f64,
    pub workover_ip_fraction_max: f64,
    pub stimulation: InterventionCost,
    pub stimulation_boost_min: f64,
    pub stimulation_boost_max: f64,
    pub stimulation_days_min: u32,
    pub stimulation_days_max: u32,
    pub repair: InterventionCost,
    pub restart_cost: Decimal,
    pub abandon_cost: Decimal,
    pub events: Vec<WellEventDef>,
}

/// Every static table the engine reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicTables {
    pub costs: CostTable,
    pub fiscal: FiscalTerms,
    pub market: MarketTable,
    pub wells: WellTable,
    pub geologies: Vec<GeologicalProfile>,
    pub leases: Vec<LeaseOption>,
    pub seismic_packages: Vec<SeismicPackage>,
    pub appraisal_options: Vec<AppraisalOption>,
    pub feed_options: Vec<FeedOption>,
    pub facility_tiers: Vec<FacilityTier>,
    pub financing: Vec<FinancingOption>,
    pub role_bonuses: BTreeMap<Role, RoleBonus>,
    /// Interpretation risk name to modifiers.
    pub risks: BTreeMap<String, RiskModifiers>,
    pub gates: Vec<GateDefinition>,
}

impl Default for EconomicTables {
    fn default() -> Self {
        Self::standard()
    }
}

fn usd(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

fn geology(
    id: &str,
    name: &str,
    probability_multiplier: f64,
    reserves: (f64, f64),
    ip: (f64, f64),
    decline_rate_annual: f64,
    opex_multiplier: f64,
    drilling_cost_multiplier: f64,
) -> GeologicalProfile {
    GeologicalProfile {
        id: id.into(),
        name: name.into(),
        probability_multiplier,
        reserves_p90_bbl: reserves.0,
        reserves_p10_bbl: reserves.1,
        ip_min_bpd: ip.0,
        ip_max_bpd: ip.1,
        decline_rate_annual,
        opex_multiplier,
        drilling_cost_multiplier,
    }
}

fn gate(
    phase: Phase,
    title: &str,
    requirements: Vec<Requirement>,
    risks: &[&str],
    cost: Decimal,
    roles: (Vec<Role>, Vec<Role>, usize),
) -> GateDefinition {
    GateDefinition {
        phase,
        title: title.into(),
        requirements,
        risks: risks.iter().map(|r| r.to_string()).collect(),
        cost,
        roles: RoleRequirements {
            required: roles.0,
            recommended: roles.1,
            minimum_signatures: roles.2,
        },
    }
}

impl EconomicTables {
    /// Built-in tables.
    pub fn standard() -> Self {
        let costs = CostTable {
            exploration_well: usd(15_000_000),
            development_well: usd(12_000_000),
            well_abandonment: usd(1_500_000),
            facility_abandonment_fraction: 0.10,
            fixed_opex_daily: 20_000.0,
            variable_opex_per_bbl: 9.0,
            per_well_opex_daily: 1_500.0,
            shut_in_standby_daily: 400.0,
        };
        let fiscal = FiscalTerms {
            tax_rate: 0.30,
            discount_rate: 0.10,
            npv_hurdle: Decimal::ZERO,
            projection_years: 20,
            planning_price: 70.0,
            production_limit_days: 3_650,
            history_interval_days: 30,
            max_development_wells: 30,
            reserve_estimate_spread: 0.5,
            reserve_estimate_error: 0.3,
        };
        let shock = |id: &str, weight: f64, lo: f64, hi: f64| ShockEvent {
            id: id.into(),
            weight,
            impact_min: lo,
            impact_max: hi,
        };
        let market = MarketTable {
            initial_price: 75.0,
            floor: 20.0,
            ceiling: 150.0,
            daily_drift: 0.5,
            quarter_days: 90,
            history_interval_days: 7,
            shocks: vec![
                shock("opec_cut", 0.10, 5.0, 15.0),
                shock("demand_surge", 0.08, 3.0, 10.0),
                shock("recession", 0.07, -15.0, -5.0),
                shock("supply_glut", 0.08, -10.0, -3.0),
                shock("geopolitical_crisis", 0.04, 10.0, 25.0),
            ],
        };
        let wells = WellTable {
            health_decay_per_day: 0.01,
            shut_in_decay_factor: 0.2,
            event_interval_days: 30,
            initial_water_cut_max: 0.05,
            water_cut_growth_min: 0.000_05,
            water_cut_growth_max: 0.000_15,
            decline_jitter: 0.1,
            workover: InterventionCost {
                cost_min: 1_500_000.0,
                cost_max: 3_000_000.0,
                downtime_min: 14,
                downtime_max: 30,
            },
            workover_ip_fraction_min: 0.6,
            workover_ip_fraction_max: 0.8,
            stimulation: InterventionCost {
                cost_min: 800_000.0,
                cost_max: 1_500_000.0,
                downtime_min: 5,
                downtime_max: 10,
            },
            stimulation_boost_min: 1.3,
            stimulation_boost_max: 1.6,
            stimulation_days_min: 365,
            stimulation_days_max: 730,
            repair: InterventionCost {
                cost_min: 500_000.0,
                cost_max: 1_200_000.0,
                downtime_min: 7,
                downtime_max: 21,
            },
            restart_cost: usd(50_000),
            abandon_cost: usd(750_000),
            events: vec![
                WellEventDef {
                    id: "water_breakthrough".into(),
                    probability: 0.02,
                    effect: WellEventEffect::WaterCutJump {
                        min: 0.05,
                        max: 0.15,
                    },
                },
                WellEventDef {
                    id: "scale_buildup".into(),
                    probability: 0.03,
                    effect: WellEventEffect::ProductionDamage {
                        factor_min: 0.80,
                        factor_max: 0.95,
                    },
                },
                WellEventDef {
                    id: "sand_production".into(),
                    probability: 0.015,
                    effect: WellEventEffect::ProductionDamage {
                        factor_min: 0.85,
                        factor_max: 0.95,
                    },
                },
                WellEventDef {
                    id: "pump_failure".into(),
                    probability: 0.01,
                    effect: WellEventEffect::MechanicalFailure,
                },
            ],
        };
        let geologies = vec![
            geology("sandstone", "Clastic sandstone", 1.0, (40e6, 140e6), (1_500.0, 3_000.0), 0.12, 1.0, 1.0),
            geology("carbonate", "Fractured carbonate", 0.85, (60e6, 220e6), (2_500.0, 5_000.0), 0.15, 1.15, 1.2),
            geology("shale", "Tight shale", 1.1, (20e6, 70e6), (800.0, 1_800.0), 0.30, 0.9, 0.8),
            geology("deepwater_turbidite", "Deepwater turbidite", 0.75, (80e6, 300e6), (4_000.0, 8_000.0), 0.10, 1.4, 1.8),
        ];
        let leases = vec![
            LeaseOption {
                id: "standard".into(),
                name: "Standard terms".into(),
                cost: usd(5_000_000),
                royalty: RoyaltyTerms::Flat { rate: 0.125 },
            },
            LeaseOption {
                id: "low_royalty".into(),
                name: "Low royalty, high bonus".into(),
                cost: usd(9_000_000),
                royalty: RoyaltyTerms::Flat { rate: 0.08 },
            },
            LeaseOption {
                id: "sliding_scale".into(),
                name: "Price-linked sliding scale".into(),
                cost: usd(6_000_000),
                royalty: RoyaltyTerms::Sliding {
                    base_rate: 0.10,
                    reference_price: 70.0,
                    rate_per_dollar: 0.002,
                    min_rate: 0.05,
                    max_rate: 0.20,
                },
            },
        ];
        let seismic_packages = vec![
            SeismicPackage {
                id: "2d".into(),
                name: "2D regional lines".into(),
                cost: usd(3_000_000),
                probability_bonus: 0.0,
            },
            SeismicPackage {
                id: "3d".into(),
                name: "3D survey".into(),
                cost: usd(8_000_000),
                probability_bonus: 0.05,
            },
            SeismicPackage {
                id: "wide_azimuth_3d".into(),
                name: "Wide-azimuth 3D".into(),
                cost: usd(14_000_000),
                probability_bonus: 0.08,
            },
        ];
        let appraisal_options = vec![
            AppraisalOption {
                id: "single_well".into(),
                name: "Single appraisal well".into(),
                cost: usd(12_000_000),
                uncertainty_reduction: 0.40,
            },
            AppraisalOption {
                id: "extended_well_test".into(),
                name: "Extended well test".into(),
                cost: usd(18_000_000),
                uncertainty_reduction: 0.55,
            },
            AppraisalOption {
                id: "two_wells".into(),
                name: "Two appraisal wells".into(),
                cost: usd(22_000_000),
                uncertainty_reduction: 0.65,
            },
        ];
        let feed_options = vec![
            FeedOption {
                id: "subsea_tieback".into(),
                name: "Subsea tieback".into(),
                cost: usd(15_000_000),
                opex_multiplier: 1.15,
            },
            FeedOption {
                id: "fixed_platform".into(),
                name: "Fixed platform".into(),
                cost: usd(25_000_000),
                opex_multiplier: 0.95,
            },
            FeedOption {
                id: "fpso".into(),
                name: "Floating production (FPSO)".into(),
                cost: usd(35_000_000),
                opex_multiplier: 1.0,
            },
        ];
        let tier = |id: &str, name: &str, capacity_bpd: f64, cost: i64| FacilityTier {
            id: id.into(),
            name: name.into(),
            capacity_bpd,
            cost: usd(cost),
        };
        let facility_tiers = vec![
            tier("small", "Small processing train", 10_000.0, 60_000_000),
            tier("medium", "Medium processing train", 25_000.0, 110_000_000),
            tier("large", "Large processing train", 50_000.0, 180_000_000),
            tier("mega", "Dual-train hub", 100_000.0, 300_000_000),
        ];
        let financing = vec![
            FinancingOption {
                id: "equity".into(),
                name: "Equity only".into(),
                loan_multiplier: 0.0,
                interest_rate: 0.0,
            },
            FinancingOption {
                id: "corporate_loan".into(),
                name: "Corporate loan".into(),
                loan_multiplier: 1.2,
                interest_rate: 0.12,
            },
            FinancingOption {
                id: "project_finance".into(),
                name: "Project finance".into(),
                loan_multiplier: 1.3,
                interest_rate: 0.18,
            },
        ];
        let mut role_bonuses = BTreeMap::new();
        role_bonuses.insert(
            Role::Geologist,
            RoleBonus {
                probability_bonus: 0.05,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::Geophysicist,
            RoleBonus {
                probability_bonus: 0.02,
                seismic_cost_reduction: 0.10,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::DrillingEngineer,
            RoleBonus {
                drilling_cost_reduction: 0.10,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::ReservoirEngineer,
            RoleBonus {
                intervention_cost_reduction: 0.05,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::FacilitiesEngineer,
            RoleBonus {
                facility_cost_reduction: 0.08,
                opex_reduction: 0.03,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::ProductionEngineer,
            RoleBonus {
                opex_reduction: 0.10,
                intervention_cost_reduction: 0.10,
                ..RoleBonus::default()
            },
        );
        role_bonuses.insert(
            Role::FinanceAnalyst,
            RoleBonus {
                interest_reduction: 0.10,
                ..RoleBonus::default()
            },
        );
        let risk = |probability_penalty: f64,
                    opex_modifier: f64,
                    production_modifier: f64,
                    decline_rate_bonus: f64,
                    reserve_modifier: f64| RiskModifiers {
            probability_penalty,
            opex_modifier,
            production_modifier,
            decline_rate_bonus,
            reserve_modifier,
        };
        let mut risks = BTreeMap::new();
        risks.insert("fault_seal".to_string(), risk(0.10, 0.0, 0.0, 0.0, -0.15));
        risks.insert("compartmentalization".to_string(), risk(0.0, 0.0, -0.10, 0.15, -0.10));
        risks.insert("high_co2".to_string(), risk(0.0, 0.15, 0.0, 0.0, 0.0));
        risks.insert("shallow_gas".to_string(), risk(0.05, 0.05, 0.0, 0.0, 0.0));
        risks.insert("poor_reservoir_quality".to_string(), risk(0.0, 0.0, -0.20, 0.10, 0.0));
        risks.insert("overpressure".to_string(), risk(0.03, 0.10, 0.0, 0.0, 0.0));

        let gates = vec![
            gate(
                Phase::Lease,
                "Exploration licence",
                vec![
                    Requirement::flag(ProjectFlag::GeologySelected),
                    Requirement::flag(ProjectFlag::LeaseSecured),
                    Requirement::GateCost,
                ],
                &["Acreage may prove non-prospective", "Licence terms can be revised"],
                usd(2_000_000),
                (vec![Role::Geologist, Role::FinanceAnalyst], vec![Role::Geophysicist], 2),
            ),
            gate(
                Phase::Seismic,
                "Drill or drop",
                vec![
                    Requirement::flag(ProjectFlag::InterpretationRecorded),
                    Requirement::ProbabilityComputed,
                    Requirement::GateCost,
                ],
                &["Interpretation may overstate trap integrity"],
                usd(6_500_000),
                (vec![Role::Geologist, Role::Geophysicist], vec![Role::DrillingEngineer], 2),
            ),
            gate(
                Phase::Drilling,
                "Exploration well",
                vec![Requirement::flag(ProjectFlag::ExplorationWellCommitted)],
                &["Dry hole", "Well control incident"],
                Decimal::ZERO,
                (vec![Role::DrillingEngineer], vec![Role::Geologist], 2),
            ),
            gate(
                Phase::Appraisal,
                "Commerciality",
                vec![Requirement::ReservesEstimated, Requirement::GateCost],
                &["Reserves may fall below P50"],
                usd(1_500_000),
                (vec![Role::ReservoirEngineer], vec![Role::FinanceAnalyst], 2),
            ),
            gate(
                Phase::Development,
                "Field sanction (FID)",
                vec![Requirement::NpvAboveHurdle],
                &["Cost overrun", "Oil price collapse"],
                Decimal::ZERO,
                (
                    vec![Role::FinanceAnalyst, Role::ReservoirEngineer, Role::FacilitiesEngineer],
                    vec![Role::ProductionEngineer],
                    3,
                ),
            ),
        ];

        Self {
            costs,
            fiscal,
            market,
            wells,
            geologies,
            leases,
            seismic_packages,
            appraisal_options,
            feed_options,
            facility_tiers,
            financing,
            role_bonuses,
            risks,
            gates,
        }
    }

    /// Parse tables from YAML and validate them.
    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        let tables: EconomicTables =
            serde_yaml::from_str(text).map_err(|e| EngineError::InvalidTable(e.to_string()))?;
        validate_tables(&tables)?;
        Ok(tables)
    }

    pub fn geology(&self, id: &str) -> EngineResult<&GeologicalProfile> {
        lookup(&self.geologies, id, "geology")
    }

    pub fn lease(&self, id: &str) -> EngineResult<&LeaseOption> {
        lookup(&self.leases, id, "lease option")
    }

    pub fn seismic_package(&self, id: &str) -> EngineResult<&SeismicPackage> {
        lookup(&self.seismic_packages, id, "seismic package")
    }

    pub fn appraisal(&self, id: &str) -> EngineResult<&AppraisalOption> {
        lookup(&self.appraisal_options, id, "appraisal option")
    }

    pub fn feed(&self, id: &str) -> EngineResult<&FeedOption> {
        lookup(&self.feed_options, id, "FEED option")
    }

    pub fn facility(&self, id: &str) -> EngineResult<&FacilityTier> {
        lookup(&self.facility_tiers, id, "facility tier")
    }

    pub fn financing_option(&self, id: &str) -> EngineResult<&FinancingOption> {
        lookup(&self.financing, id, "financing structure")
    }

    /// Gate closing `phase`, if that phase is gated.
    pub fn gate_for(&self, phase: Phase) -> Option<&GateDefinition> {
        self.gates.iter().find(|g| g.phase == phase)
    }

    /// Smallest-capacity tier able to carry `rate_bpd`.
    pub fn minimum_facility(&self, rate_bpd: f64) -> Option<&FacilityTier> {
        self.facility_tiers
            .iter()
            .filter(|t| t.capacity_bpd >= rate_bpd)
            .min_by(|a, b| a.capacity_bpd.total_cmp(&b.capacity_bpd))
    }

    /// Sum of an additive bonus over the team.
    pub fn team_bonus(&self, team: &[Role], field: impl Fn(&RoleBonus) -> f64) -> f64 {
        team_roles(team)
            .filter_map(|r| self.role_bonuses.get(&r))
            .map(field)
            .sum()
    }

    /// Product of `(1 - reduction)` over the team.
    pub fn team_multiplier(&self, team: &[Role], field: impl Fn(&RoleBonus) -> f64) -> f64 {
        team_roles(team)
            .filter_map(|r| self.role_bonuses.get(&r))
            .map(|b| 1.0 - field(b))
            .product()
    }
}

/// Distinct roles on a team; duplicates do not stack bonuses.
fn team_roles(team: &[Role]) -> impl Iterator<Item = Role> {
    team.iter().copied().collect::<BTreeSet<_>>().into_iter()
}

fn check(cond: bool, msg: impl FnOnce() -> String) -> EngineResult<()> {
    if cond {
        Ok(())
    } else {
        Err(EngineError::InvalidTable(msg()))
    }
}

fn check_unique<T: CatalogEntry>(items: &[T], kind: &str) -> EngineResult<()> {
    let mut seen = BTreeSet::new();
    for item in items {
        check(seen.insert(item.key()), || format!("duplicate {kind} id {}", item.key()))?;
    }
    check(!items.is_empty(), || format!("{kind} catalog is empty"))
}

fn check_fraction(value: f64, what: &str) -> EngineResult<()> {
    check(value.is_finite() && (0.0..=1.0).contains(&value), || {
        format!("{what} must be within [0,1], got {value}")
    })
}

fn check_intervention(c: &InterventionCost, what: &str) -> EngineResult<()> {
    check(
        c.cost_min >= 0.0 && c.cost_min <= c.cost_max && c.downtime_min <= c.downtime_max,
        || format!("{what} cost/downtime window is inverted or negative"),
    )
}

/// Validate table invariants: unique ids, ordered ranges, shock weights
/// summing to at most 1, and debt structures that cover their own interest.
pub fn validate_tables(t: &EconomicTables) -> EngineResult<()> {
    check_unique(&t.geologies, "geology")?;
    check_unique(&t.leases, "lease option")?;
    check_unique(&t.seismic_packages, "seismic package")?;
    check_unique(&t.appraisal_options, "appraisal option")?;
    check_unique(&t.feed_options, "FEED option")?;
    check_unique(&t.facility_tiers, "facility tier")?;
    check_unique(&t.financing, "financing structure")?;

    for g in &t.geologies {
        check(g.reserves_p90_bbl > 0.0 && g.reserves_p90_bbl <= g.reserves_p10_bbl, || {
            format!("geology {} reserve range must satisfy 0 < P90 <= P10", g.id)
        })?;
        check(g.ip_min_bpd > 0.0 && g.ip_min_bpd <= g.ip_max_bpd, || {
            format!("geology {} IP range must satisfy 0 < min <= max", g.id)
        })?;
        check(
            g.decline_rate_annual >= 0.0 && g.decline_rate_annual < 1.0,
            || format!("geology {} decline must be within [0,1)", g.id),
        )?;
        check(g.probability_multiplier > 0.0 && g.opex_multiplier > 0.0, || {
            format!("geology {} multipliers must be positive", g.id)
        })?;
    }
    for l in &t.leases {
        check(l.cost >= Decimal::ZERO, || format!("lease {} has negative cost", l.id))?;
        match l.royalty {
            RoyaltyTerms::Flat { rate } => check_fraction(rate, "royalty rate")?,
            RoyaltyTerms::Sliding {
                min_rate, max_rate, ..
            } => {
                check_fraction(min_rate, "royalty min rate")?;
                check_fraction(max_rate, "royalty max rate")?;
                check(min_rate <= max_rate, || format!("lease {} royalty bounds inverted", l.id))?;
            }
        }
    }
    for a in &t.appraisal_options {
        check_fraction(a.uncertainty_reduction, "appraisal uncertainty reduction")?;
    }
    for f in &t.financing {
        if f.is_debt() {
            check_fraction(f.interest_rate, "financing interest rate")?;
            check(f.loan_multiplier * (1.0 - f.interest_rate) >= 1.0, || {
                format!("financing {} cannot cover its own interest", f.id)
            })?;
        }
    }

    let m = &t.market;
    check(m.floor > 0.0 && m.floor < m.ceiling, || "market floor must be below ceiling".into())?;
    check((m.floor..=m.ceiling).contains(&m.initial_price), || {
        "initial price outside [floor, ceiling]".into()
    })?;
    check(m.quarter_days > 0 && m.history_interval_days > 0, || {
        "market intervals must be positive".into()
    })?;
    let mut weight = 0.0;
    for s in &m.shocks {
        check_fraction(s.weight, "shock weight")?;
        check(s.impact_min <= s.impact_max, || format!("shock {} impact range inverted", s.id))?;
        weight += s.weight;
    }
    check(weight <= 1.0 + 1e-9, || format!("shock weights sum to {weight} > 1"))?;

    let w = &t.wells;
    check(w.event_interval_days > 0, || "well event interval must be positive".into())?;
    check_fraction(w.shut_in_decay_factor, "shut-in decay factor")?;
    check(w.water_cut_growth_min <= w.water_cut_growth_max, || {
        "water cut growth range inverted".into()
    })?;
    check_intervention(&w.workover, "workover")?;
    check_intervention(&w.stimulation, "stimulation")?;
    check_intervention(&w.repair, "repair")?;
    check(w.stimulation_days_min <= w.stimulation_days_max, || {
        "stimulation window inverted".into()
    })?;
    for e in &w.events {
        check_fraction(e.probability, "well event probability")?;
        let ordered = match e.effect {
            WellEventEffect::WaterCutJump { min, max } => min <= max,
            WellEventEffect::ProductionDamage {
                factor_min,
                factor_max,
            } => factor_min <= factor_max,
            WellEventEffect::MechanicalFailure => true,
        };
        check(ordered, || format!("well event {} range inverted", e.id))?;
    }

    let f = &t.fiscal;
    check_fraction(f.tax_rate, "tax rate")?;
    check(f.discount_rate > -1.0, || "discount rate must exceed -100%".into())?;
    check(f.history_interval_days > 0 && f.projection_years > 0, || {
        "fiscal intervals must be positive".into()
    })?;

    let mut phases = BTreeSet::new();
    for g in &t.gates {
        check(phases.insert(g.phase), || format!("duplicate gate for {}", g.phase.as_str()))?;
        check(g.cost >= Decimal::ZERO, || format!("gate {} has negative cost", g.title))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn standard_tables_validate() {
        validate_tables(&EconomicTables::standard()).unwrap();
    }

    #[test]
    fn overweight_shocks_are_rejected() {
        let mut t = EconomicTables::standard();
        t.market.shocks[0].weight = 0.9;
        assert!(matches!(validate_tables(&t), Err(EngineError::InvalidTable(_))));
    }

    #[test]
    fn debt_that_cannot_cover_interest_is_rejected() {
        let mut t = EconomicTables::standard();
        t.financing[1].loan_multiplier = 1.0;
        assert!(validate_tables(&t).is_err());
    }

    #[test]
    fn unknown_option_names_catalog() {
        let t = EconomicTables::standard();
        let err = t.lease("free").unwrap_err();
        assert_eq!(err.to_string(), "unknown lease option: free");
    }

    #[test]
    fn minimum_facility_picks_smallest_sufficient_tier() {
        let t = EconomicTables::standard();
        assert_eq!(t.minimum_facility(8_000.0).map(|f| f.id.as_str()), Some("small"));
        assert_eq!(t.minimum_facility(10_000.0).map(|f| f.id.as_str()), Some("small"));
        assert_eq!(t.minimum_facility(30_000.0).map(|f| f.id.as_str()), Some("large"));
        assert!(t.minimum_facility(1e9).is_none());
    }

    #[test]
    fn team_bonuses_do_not_stack_duplicates() {
        let t = EconomicTables::standard();
        let team = [Role::ProductionEngineer, Role::ProductionEngineer, Role::FacilitiesEngineer];
        let m = t.team_multiplier(&team, |b| b.opex_reduction);
        assert!((m - 0.9 * 0.97).abs() < 1e-12);
        let p = t.team_bonus(&[Role::Geologist, Role::Geophysicist], |b| b.probability_bonus);
        assert!((p - 0.07).abs() < 1e-12);
    }

    #[test]
    fn tables_survive_yaml() {
        let t = EconomicTables::standard();
        let yaml = serde_yaml::to_string(&t).unwrap();
        let back = EconomicTables::from_yaml_str(&yaml).unwrap();
        assert_eq!(back.gates.len(), t.gates.len());
        assert_eq!(back.leases, t.leases);
    }

    proptest! {
        #[test]
        fn sliding_royalty_stays_in_bounds(price in 0.0f64..500.0) {
            let t = EconomicTables::standard();
            let lease = t.lease("sliding_scale").unwrap();
            let rate = lease.royalty.rate_at(price);
            prop_assert!((0.05..=0.20).contains(&rate));
        }
    }
}
