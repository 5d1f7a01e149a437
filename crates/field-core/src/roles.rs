//! Team roles, their skill bonuses, and per-gate approval sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A discipline on the project team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Interprets basin geology; raises the chance of success estimate.
    Geologist,
    /// Runs the seismic programme.
    Geophysicist,
    /// Plans and drills wells.
    DrillingEngineer,
    /// Owns reserves and the depletion plan.
    ReservoirEngineer,
    /// Designs and builds surface facilities.
    FacilitiesEngineer,
    /// Runs the producing field day to day.
    ProductionEngineer,
    /// Owns economics and financing.
    FinanceAnalyst,
}

impl Role {
    /// Every role in declaration order.
    pub const ALL: [Role; 7] = [
        Role::Geologist,
        Role::Geophysicist,
        Role::DrillingEngineer,
        Role::ReservoirEngineer,
        Role::FacilitiesEngineer,
        Role::ProductionEngineer,
        Role::FinanceAnalyst,
    ];

    /// Stable snake_case identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Geologist => "geologist",
            Role::Geophysicist => "geophysicist",
            Role::DrillingEngineer => "drilling_engineer",
            Role::ReservoirEngineer => "reservoir_engineer",
            Role::FacilitiesEngineer => "facilities_engineer",
            Role::ProductionEngineer => "production_engineer",
            Role::FinanceAnalyst => "finance_analyst",
        }
    }

    /// Parse a snake_case identifier.
    pub fn parse(s: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|r| r.as_str() == s.trim())
    }
}

/// Skill bonuses a role contributes while on the team.
///
/// Reductions are fractions in [0, 1) applied multiplicatively across roles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleBonus {
    /// Added to the exploration chance of success.
    pub probability_bonus: f64,
    /// Seismic acquisition cost reduction.
    pub seismic_cost_reduction: f64,
    /// Exploration and development well cost reduction.
    pub drilling_cost_reduction: f64,
    /// Facility and concept cost reduction.
    pub facility_cost_reduction: f64,
    /// Daily OPEX reduction.
    pub opex_reduction: f64,
    /// Well intervention cost reduction.
    pub intervention_cost_reduction: f64,
    /// Loan interest reduction.
    pub interest_reduction: f64,
}

/// Role approvals for the gate currently open. Reset whenever the phase changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSet(BTreeMap<Role, bool>);

impl ApprovalSet {
    /// Record a role's vote, replacing any earlier vote.
    pub fn set(&mut self, role: Role, approved: bool) {
        self.0.insert(role, approved);
    }

    /// Number of roles voting to approve.
    pub fn approved_count(&self) -> usize {
        self.0.values().filter(|v| **v).count()
    }

    /// Whether `role` has voted to approve.
    pub fn is_approved(&self, role: Role) -> bool {
        self.0.get(&role).copied().unwrap_or(false)
    }

    /// All recorded votes in role order.
    pub fn votes(&self) -> Vec<(Role, bool)> {
        self.0.iter().map(|(r, v)| (*r, *v)).collect()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
