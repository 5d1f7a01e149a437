//! Per-well state, the daily decline rule, interventions and random events.

use crate::error::{EngineError, EngineResult};
use crate::project::RiskModifiers;
use crate::tables::{GeologicalProfile, InterventionCost, WellEventDef, WellEventEffect, WellTable};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAX_WATER_CUT: f64 = 0.95;
pub const MAX_HEALTH: f64 = 100.0;

/// Uniform draw on `[lo, hi]`; a degenerate range returns `lo`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

fn uniform_days<R: Rng + ?Sized>(rng: &mut R, lo: u32, hi: u32) -> u32 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Operating state of a development well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellStatus {
    /// Online and declining.
    Producing,
    /// Closed in by the operator; decline is paused, health decays slowly.
    ShutIn,
    /// Down for a workover until the downtime counter clears.
    Workover,
    /// Down for stimulation. The boost window counts down from the start.
    Stimulation,
    /// Down for repair of a failure incident.
    Repair,
    /// No longer producing. Only a well with an incident can be repaired.
    Failed,
    /// Plugged and retired for good.
    Abandoned,
}

impl WellStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WellStatus::Producing => "producing",
            WellStatus::ShutIn => "shut_in",
            WellStatus::Workover => "workover",
            WellStatus::Stimulation => "stimulation",
            WellStatus::Repair => "repair",
            WellStatus::Failed => "failed",
            WellStatus::Abandoned => "abandoned",
        }
    }

    /// In an intervention with a downtime counter.
    pub fn is_down(self) -> bool {
        matches!(
            self,
            WellStatus::Workover | WellStatus::Stimulation | WellStatus::Repair
        )
    }
}

/// Player-triggered well transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellAction {
    ShutIn,
    Restart,
    Workover,
    Stimulate,
    Repair,
    Abandon,
}

impl WellAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WellAction::ShutIn => "shut_in",
            WellAction::Restart => "restart",
            WellAction::Workover => "workover",
            WellAction::Stimulate => "stimulate",
            WellAction::Repair => "repair",
            WellAction::Abandon => "abandon",
        }
    }
}

/// Drawn parameters of an intervention, computed before any state changes so
/// the caller can check the budget first.
#[derive(Clone, Debug, PartialEq)]
pub enum InterventionPlan {
    Workover {
        cost: f64,
        downtime: u32,
        ip_fraction: f64,
    },
    Stimulation {
        cost: f64,
        downtime: u32,
        boost: f64,
        window_days: u32,
    },
    Repair {
        cost: f64,
        downtime: u32,
    },
}

impl InterventionPlan {
    pub fn cost(&self) -> f64 {
        match *self {
            InterventionPlan::Workover { cost, .. }
            | InterventionPlan::Stimulation { cost, .. }
            | InterventionPlan::Repair { cost, .. } => cost,
        }
    }
}

/// One development well and its daily state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Well {
    /// 1-based, unique within the project.
    pub id: u32,
    /// Rate the decline law starts from (IP).
    pub initial_productivity: f64,
    /// IP at completion; workovers restore toward a fraction of it.
    pub original_productivity: f64,
    /// Fractional rate lost per 365 producing days.
    pub decline_rate_annual: f64,
    /// Produced water fraction, clamped to `MAX_WATER_CUT`.
    pub water_cut: f64,
    /// Water cut added per producing day.
    pub water_cut_growth_rate: f64,
    /// Mechanical condition in `[0, MAX_HEALTH]`; zero fails the well.
    pub health: f64,
    /// Multiplicative damage factor, 1.0 when undamaged.
    pub production_modifier: f64,
    /// Output multiplier while a stimulation window is open.
    pub stimulation_boost: f64,
    pub stimulation_days_remaining: u32,
    /// Days left before a workover, stimulation or repair completes.
    pub action_downtime_remaining: u32,
    pub status: WellStatus,
    /// Event that forced a repairable failure.
    pub incident: Option<String>,
    /// Producing days only; the decline clock ignores downtime.
    pub days_producing: u32,
    /// Barrels produced on the last tick.
    pub daily_production: u32,
    /// Barrels produced over the well's life. Never decreases.
    pub cumulative_production: u64,
}

impl Well {
    pub fn new(id: u32, ip: f64, decline_rate_annual: f64) -> Self {
        Self {
            id,
            initial_productivity: ip,
            original_productivity: ip,
            decline_rate_annual,
            water_cut: 0.0,
            water_cut_growth_rate: 0.0,
            health: MAX_HEALTH,
            production_modifier: 1.0,
            stimulation_boost: 1.0,
            stimulation_days_remaining: 0,
            action_downtime_remaining: 0,
            status: WellStatus::Producing,
            incident: None,
            days_producing: 0,
            daily_production: 0,
            cumulative_production: 0,
        }
    }

    /// Complete a development well with randomized properties.
    pub fn drill<R: Rng + ?Sized>(
        id: u32,
        geology: &GeologicalProfile,
        risk: &RiskModifiers,
        params: &WellTable,
        rng: &mut R,
    ) -> Self {
        let ip = uniform(rng, geology.ip_min_bpd, geology.ip_max_bpd)
            * (1.0 + risk.production_modifier).max(0.0);
        let jitter = uniform(rng, 1.0 - params.decline_jitter, 1.0 + params.decline_jitter);
        let decline =
            (geology.decline_rate_annual * (1.0 + risk.decline_rate_bonus) * jitter).clamp(0.0, 0.99);
        let mut well = Well::new(id, ip, decline);
        well.water_cut = uniform(rng, 0.0, params.initial_water_cut_max).min(MAX_WATER_CUT);
        well.water_cut_growth_rate =
            uniform(rng, params.water_cut_growth_min, params.water_cut_growth_max);
        well
    }

    /// Retired for good: abandoned, or failed without a repairable incident.
    pub fn is_retired(&self) -> bool {
        match self.status {
            WellStatus::Abandoned => true,
            WellStatus::Failed => self.incident.is_none(),
            _ => false,
        }
    }

    /// `(1 - d)^(days_producing / 365)`.
    pub fn decline_factor(&self) -> f64 {
        (1.0 - self.decline_rate_annual).powf(f64::from(self.days_producing) / 365.0)
    }

    pub fn stimulation_factor(&self) -> f64 {
        if self.stimulation_days_remaining > 0 {
            self.stimulation_boost
        } else {
            1.0
        }
    }

    /// Unfloored rate the well would make today; zero unless producing.
    pub fn potential_rate(&self) -> f64 {
        if self.status != WellStatus::Producing {
            return 0.0;
        }
        let rate = self.initial_productivity
            * self.decline_factor()
            * self.stimulation_factor()
            * self.production_modifier
            * (1.0 - self.water_cut)
            * (self.health / MAX_HEALTH);
        if rate.is_finite() {
            rate.max(0.0)
        } else {
            0.0
        }
    }

    /// Today's rate floored to whole barrels.
    pub fn current_rate(&self) -> u32 {
        self.potential_rate().floor() as u32
    }

    fn degrade(&mut self, amount: f64) {
        self.health = (self.health - amount).clamp(0.0, MAX_HEALTH);
        if self.health <= 0.0 && !self.is_retired() {
            debug!(well = self.id, "health depleted, well failed");
            self.retire(WellStatus::Failed);
        }
    }

    fn retire(&mut self, status: WellStatus) {
        self.status = status;
        self.incident = None;
        self.action_downtime_remaining = 0;
        self.stimulation_days_remaining = 0;
        self.stimulation_boost = 1.0;
        self.daily_production = 0;
    }

    /// Advance one day. `choke` in [0, 1] scales output for facility and
    /// reserve limits. Returns barrels produced.
    pub fn advance_day(&mut self, choke: f64, params: &WellTable) -> u32 {
        let mut produced = 0;
        match self.status {
            WellStatus::Producing => {
                produced = (self.potential_rate() * choke.clamp(0.0, 1.0)).floor() as u32;
                self.cumulative_production += u64::from(produced);
                self.days_producing += 1;
                self.water_cut = (self.water_cut + self.water_cut_growth_rate).min(MAX_WATER_CUT);
                self.degrade(params.health_decay_per_day);
            }
            WellStatus::ShutIn => {
                self.degrade(params.health_decay_per_day * params.shut_in_decay_factor);
            }
            WellStatus::Workover | WellStatus::Stimulation | WellStatus::Repair => {
                self.action_downtime_remaining = self.action_downtime_remaining.saturating_sub(1);
                if self.action_downtime_remaining == 0 {
                    self.status = WellStatus::Producing;
                }
            }
            WellStatus::Failed | WellStatus::Abandoned => {}
        }
        if !matches!(self.status, WellStatus::Failed | WellStatus::Abandoned)
            && self.stimulation_days_remaining > 0
        {
            self.stimulation_days_remaining -= 1;
            if self.stimulation_days_remaining == 0 {
                self.stimulation_boost = 1.0;
            }
        }
        self.daily_production = produced;
        produced
    }

    fn ineligible(&self, action: WellAction) -> EngineError {
        EngineError::PreconditionNotMet(vec![format!(
            "well {} is {}; cannot {}",
            self.id,
            self.status.as_str(),
            action.as_str()
        )])
    }

    /// Check that `action` is allowed from the current status.
    pub fn check_action(&self, action: WellAction) -> EngineResult<()> {
        let allowed = match action {
            WellAction::ShutIn => self.status == WellStatus::Producing,
            WellAction::Restart => self.status == WellStatus::ShutIn,
            WellAction::Workover | WellAction::Stimulate => {
                matches!(self.status, WellStatus::Producing | WellStatus::ShutIn)
            }
            WellAction::Repair => match self.status {
                WellStatus::Producing | WellStatus::ShutIn => true,
                WellStatus::Failed => self.incident.is_some(),
                _ => false,
            },
            WellAction::Abandon => self.status != WellStatus::Abandoned,
        };
        if allowed {
            Ok(())
        } else {
            Err(self.ineligible(action))
        }
    }

    /// Draw the cost and effect window of an intervention without mutating.
    pub fn plan_intervention<R: Rng + ?Sized>(
        &self,
        action: WellAction,
        params: &WellTable,
        rng: &mut R,
    ) -> EngineResult<InterventionPlan> {
        self.check_action(action)?;
        let draw = |c: &InterventionCost, rng: &mut R| {
            (
                uniform(rng, c.cost_min, c.cost_max),
                uniform_days(rng, c.downtime_min, c.downtime_max),
            )
        };
        match action {
            WellAction::Workover => {
                let (cost, downtime) = draw(&params.workover, &mut *rng);
                let ip_fraction = uniform(
                    rng,
                    params.workover_ip_fraction_min,
                    params.workover_ip_fraction_max,
                );
                Ok(InterventionPlan::Workover {
                    cost,
                    downtime,
                    ip_fraction,
                })
            }
            WellAction::Stimulate => {
                let (cost, downtime) = draw(&params.stimulation, &mut *rng);
                let boost = uniform(rng, params.stimulation_boost_min, params.stimulation_boost_max);
                let window_days =
                    uniform_days(rng, params.stimulation_days_min, params.stimulation_days_max);
                Ok(InterventionPlan::Stimulation {
                    cost,
                    downtime,
                    boost,
                    window_days,
                })
            }
            WellAction::Repair => {
                let (cost, downtime) = draw(&params.repair, &mut *rng);
                Ok(InterventionPlan::Repair { cost, downtime })
            }
            other => Err(EngineError::InvalidInput(format!(
                "{} is not an intervention",
                other.as_str()
            ))),
        }
    }

    fn begin_downtime(&mut self, status: WellStatus, days: u32) {
        self.action_downtime_remaining = days;
        self.status = if days == 0 {
            WellStatus::Producing
        } else {
            status
        };
        self.daily_production = 0;
    }

    /// Apply a previously drawn intervention.
    pub fn apply_intervention(&mut self, plan: &InterventionPlan) {
        match *plan {
            InterventionPlan::Workover {
                downtime,
                ip_fraction,
                ..
            } => {
                let target = self.original_productivity * ip_fraction;
                let current = self.initial_productivity * self.decline_factor();
                if target > current {
                    self.initial_productivity = target;
                    self.days_producing = 0;
                }
                self.water_cut *= 0.7;
                self.health = (self.health + 20.0).min(MAX_HEALTH);
                self.production_modifier = 1.0;
                self.begin_downtime(WellStatus::Workover, downtime);
            }
            InterventionPlan::Stimulation {
                downtime,
                boost,
                window_days,
                ..
            } => {
                self.stimulation_boost = boost;
                self.stimulation_days_remaining = window_days;
                self.begin_downtime(WellStatus::Stimulation, downtime);
            }
            InterventionPlan::Repair { downtime, .. } => {
                self.incident = None;
                self.health = (self.health + 10.0).min(MAX_HEALTH);
                self.begin_downtime(WellStatus::Repair, downtime);
            }
        }
    }

    pub fn shut_in(&mut self) -> EngineResult<()> {
        self.check_action(WellAction::ShutIn)?;
        self.status = WellStatus::ShutIn;
        self.daily_production = 0;
        Ok(())
    }

    pub fn restart(&mut self) -> EngineResult<()> {
        self.check_action(WellAction::Restart)?;
        self.status = WellStatus::Producing;
        Ok(())
    }

    pub fn abandon(&mut self) -> EngineResult<()> {
        self.check_action(WellAction::Abandon)?;
        self.retire(WellStatus::Abandoned);
        Ok(())
    }

    /// Roll each event independently for a producing well. Returns the ids
    /// of the events that fired.
    pub fn roll_events<R: Rng + ?Sized>(&mut self, events: &[WellEventDef], rng: &mut R) -> Vec<String> {
        let mut fired = Vec::new();
        if self.status != WellStatus::Producing {
            return fired;
        }
        for def in events {
            if rng.gen::<f64>() >= def.probability {
                continue;
            }
            match def.effect {
                WellEventEffect::WaterCutJump { min, max } => {
                    self.water_cut = (self.water_cut + uniform(rng, min, max)).clamp(0.0, MAX_WATER_CUT);
                }
                WellEventEffect::ProductionDamage {
                    factor_min,
                    factor_max,
                } => {
                    self.production_modifier *= uniform(rng, factor_min, factor_max);
                }
                WellEventEffect::MechanicalFailure => {
                    self.status = WellStatus::Failed;
                    self.incident = Some(def.id.clone());
                    self.daily_production = 0;
                }
            }
            fired.push(def.id.clone());
        }
        fired
    }
}
