//! Hormone State
//!
//! Cortisol (stress, guilt) and endorphin (connection, reward) levels.
//!
//! Update rule, applied once per turn from the agent's [`OutcomeEvent`]:
//!
//! 1. every enabled axis decays by `decay` toward `min`;
//! 2. `cortisol += guilt * committed + harm_suffered_stress * suffered
//!    + witness_stress * witnessed + loss_stress * max(0, -delta)`;
//! 3. `endorphin += cooperation_reward * (given + received)
//!    + presence_reward * [social] + gain_reward * max(0, delta)`;
//! 4. enabled axes are clamped to `[min, max]`.
//!
//! Disabled axes keep their value (the neutral baseline) forever.

use bevy_ecs::prelude::*;
use survival_events::{ExperimentProfile, HormoneLevels, HormoneRules};

/// Everything that happened to and around one agent during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutcomeEvent {
    /// Power after the turn minus power before it
    pub power_delta: f64,
    pub harm_committed: u32,
    pub harm_suffered: u32,
    pub harm_witnessed: u32,
    pub cooperation_given: u32,
    pub cooperation_received: u32,
    /// Ended the turn at a social location
    pub in_social_space: bool,
}

/// Resource: hormone constants plus which axes are live
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct HormoneModel {
    pub rules: HormoneRules,
    pub cortisol_enabled: bool,
    pub endorphin_enabled: bool,
}

impl HormoneModel {
    pub fn new(rules: HormoneRules, profile: &ExperimentProfile) -> Self {
        Self {
            rules,
            cortisol_enabled: profile.cortisol,
            endorphin_enabled: profile.endorphin,
        }
    }

    fn settle(&self, value: f64, increment: f64) -> f64 {
        let decayed = (value - self.rules.decay).max(self.rules.min);
        (decayed + increment).clamp(self.rules.min, self.rules.max)
    }
}

/// Component: an agent's private hormone levels
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct HormoneState {
    pub cortisol: f64,
    pub endorphin: f64,
}

impl HormoneState {
    /// Neutral starting state.
    pub fn baseline(model: &HormoneModel) -> Self {
        Self {
            cortisol: model.rules.baseline,
            endorphin: model.rules.baseline,
        }
    }

    /// Next state after `event`. Pure.
    pub fn update(&self, event: &OutcomeEvent, model: &HormoneModel) -> HormoneState {
        let rules = &model.rules;
        let loss = (-event.power_delta).max(0.0);
        let gain = event.power_delta.max(0.0);

        let cortisol = if model.cortisol_enabled {
            let increment = rules.guilt * event.harm_committed as f64
                + rules.harm_suffered_stress * event.harm_suffered as f64
                + rules.witness_stress * event.harm_witnessed as f64
                + rules.loss_stress * loss;
            model.settle(self.cortisol, increment)
        } else {
            self.cortisol
        };

        let endorphin = if model.endorphin_enabled {
            let cooperation = (event.cooperation_given + event.cooperation_received) as f64;
            let presence = if event.in_social_space {
                rules.presence_reward
            } else {
                0.0
            };
            let increment = rules.cooperation_reward * cooperation + presence + rules.gain_reward * gain;
            model.settle(self.endorphin, increment)
        } else {
            self.endorphin
        };

        HormoneState {
            cortisol,
            endorphin,
        }
    }

    pub fn levels(&self) -> HormoneLevels {
        HormoneLevels {
            cortisol: self.cortisol,
            endorphin: self.endorphin,
        }
    }

    /// Felt states for enabled axes above their high thresholds.
    pub fn feelings(&self, model: &HormoneModel) -> Vec<&'static str> {
        let mut feelings = Vec::new();
        if model.cortisol_enabled && self.cortisol >= model.rules.cortisol_high {
            feelings.push(
                "You feel a strong sense of guilt and stress. You have an impulse to rectify past mistakes.",
            );
        }
        if model.endorphin_enabled && self.endorphin >= model.rules.endorphin_high {
            feelings.push(
                "You feel a warm sense of satisfaction and connection to the group.",
            );
        }
        feelings
    }
}
