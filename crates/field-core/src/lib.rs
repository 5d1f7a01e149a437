#![deny(warnings)]

//! Core domain model for the oil-field project simulation.
//!
//! This crate defines the serializable project aggregate, the well model and
//! its daily decline rule, team roles and approvals, static economic tables
//! with validation, and the error taxonomy shared by the engine crates.

pub mod config;
pub mod error;
pub mod gate;
pub mod project;
pub mod roles;
pub mod tables;
pub mod well;

pub use config::SimConfig;
pub use error::{EngineError, EngineResult};
pub use gate::{injected_requirements, GateDefinition, ProjectFlag, Requirement, RoleRequirements};
pub use project::{
    AggregateProduction, DevelopmentPlan, DrillOutcome, ExplorationWell, FinancialHistoryEntry,
    GateRecord, Interpretation, Loan, LogEntry, MarketPrice, MonthlyAccumulator, Phase, PricePoint,
    Project, ProjectStatus, ReserveEstimate, RiskModifiers, SanctionRecord, PROBABILITY_MAX,
    PROBABILITY_MIN,
};
pub use roles::{ApprovalSet, Role, RoleBonus};
pub use tables::{
    validate_tables, AppraisalOption, CostTable, EconomicTables, FacilityTier, FeedOption,
    FinancingOption, FiscalTerms, GeologicalProfile, InterventionCost, LeaseOption, MarketTable,
    RoyaltyTerms, SeismicPackage, ShockEvent, WellEventDef, WellEventEffect, WellTable,
};
pub use well::{uniform, InterventionPlan, Well, WellAction, WellStatus, MAX_HEALTH, MAX_WATER_CUT};
