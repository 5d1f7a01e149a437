//! Static decision gate definitions.

use crate::project::Phase;
use crate::roles::Role;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Boolean facts about project progress that gates can require.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectFlag {
    GeologySelected,
    LeaseSecured,
    SeismicPackageChosen,
    InterpretationRecorded,
    ExplorationWellCommitted,
    AppraisalComplete,
    DevelopmentPlanned,
    FeedSelected,
    FacilitySelected,
    FinancingSelected,
    WellsDrilled,
    FacilitiesConfirmed,
}

impl ProjectFlag {
    pub fn describe(self) -> &'static str {
        match self {
            ProjectFlag::GeologySelected => "Geological profile selected",
            ProjectFlag::LeaseSecured => "Lease secured",
            ProjectFlag::SeismicPackageChosen => "Seismic package chosen",
            ProjectFlag::InterpretationRecorded => "Seismic interpretation recorded",
            ProjectFlag::ExplorationWellCommitted => "Exploration well committed",
            ProjectFlag::AppraisalComplete => "Appraisal programme completed",
            ProjectFlag::DevelopmentPlanned => "Development plan defined",
            ProjectFlag::FeedSelected => "Development concept (FEED) selected",
            ProjectFlag::FacilitySelected => "Facility tier selected",
            ProjectFlag::FinancingSelected => "Financing structure selected",
            ProjectFlag::WellsDrilled => "Development wells drilled",
            ProjectFlag::FacilitiesConfirmed => "Facilities confirmed",
        }
    }
}

/// One readiness requirement of a gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// A project flag must hold.
    Flag { flag: ProjectFlag },
    /// `budget >= amount`.
    Budget { amount: Decimal },
    /// `budget >= ` the gate's own cost.
    GateCost,
    /// Chance of success has been computed from the interpretation.
    ProbabilityComputed,
    /// A reserve estimate exists.
    ReservesEstimated,
    /// Development NPV is at least the fiscal hurdle.
    NpvAboveHurdle,
}

impl Requirement {
    pub fn flag(flag: ProjectFlag) -> Self {
        Requirement::Flag { flag }
    }
}

/// Roles that must, or should, sign off on a gate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleRequirements {
    pub required: Vec<Role>,
    #[serde(default)]
    pub recommended: Vec<Role>,
    pub minimum_signatures: usize,
}

impl RoleRequirements {
    /// Approvals needed given the team size.
    pub fn quorum(&self, team_size: usize) -> usize {
        self.minimum_signatures.min(team_size)
    }
}

/// Static definition of the gate closing a phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateDefinition {
    pub phase: Phase,
    pub title: String,
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub risks: Vec<String>,
    pub cost: Decimal,
    pub roles: RoleRequirements,
}

/// Requirements every gate of `phase` carries on top of its static list.
pub fn injected_requirements(phase: Phase) -> Vec<Requirement> {
    match phase {
        Phase::Seismic => vec![Requirement::flag(ProjectFlag::SeismicPackageChosen)],
        Phase::Appraisal => vec![Requirement::flag(ProjectFlag::AppraisalComplete)],
        Phase::Development => vec![
            Requirement::flag(ProjectFlag::DevelopmentPlanned),
            Requirement::flag(ProjectFlag::FeedSelected),
            Requirement::flag(ProjectFlag::FacilitySelected),
            Requirement::flag(ProjectFlag::FinancingSelected),
        ],
        _ => Vec::new(),
    }
}
