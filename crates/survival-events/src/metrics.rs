//! Per-run Metrics
//!
//! Summary statistics derived from a finished run log. Cross-run statistics
//! (significance tests, effect sizes) belong to external tooling.

use serde::{Deserialize, Serialize};

use crate::action::{ActionKind, HarmTarget};
use crate::run::RunLog;

/// Headline numbers for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub experiment: String,
    pub scenario: String,
    pub turns_played: u32,
    pub total_agents: usize,
    pub survivors: usize,
    pub survival_rate: f64,
    /// Mean number of turns each agent stayed alive
    pub average_survival_duration: f64,
    /// Transfers that were applied
    pub cooperation_count: u32,
    /// Harmful actions that were applied
    pub transgression_count: u32,
    /// Share of alive agent-turns ending at a social location
    pub sociability_index: f64,
    /// Total withdrawn from shared pools
    pub power_drawn: f64,
    /// Total gained from forbidden sources
    pub power_tapped: f64,
    pub avg_cortisol: f64,
    pub avg_endorphin: f64,
    /// Decisions that fell back to idle
    pub decision_failures: u32,
}

impl RunMetrics {
    pub fn from_log(log: &RunLog) -> Self {
        let header = &log.header;
        let world = &header.config.world;
        let turns_played = log.last_turn();

        let total_agents = header.initial_agents.len();
        let survivors = log
            .turns()
            .last()
            .map(|t| t.alive_after().len())
            .unwrap_or(total_agents);

        let total_duration: u32 = header
            .initial_agents
            .iter()
            .map(|agent| {
                log.turns()
                    .iter()
                    .find_map(|t| {
                        t.agent(&agent.agent_id)
                            .filter(|a| !a.after.status.is_alive())
                            .map(|_| t.turn)
                    })
                    .unwrap_or(turns_played)
            })
            .sum();

        let mut cooperation_count = 0;
        let mut transgression_count = 0;
        let mut power_tapped = 0.0;
        let mut decision_failures = 0;
        let mut alive_agent_turns = 0usize;
        let mut social_agent_turns = 0usize;
        let mut cortisol_sum = 0.0;
        let mut endorphin_sum = 0.0;
        let mut power_drawn = 0.0;

        for record in log.turns() {
            power_drawn += record.environment.withdrawn.values().sum::<f64>();
            decision_failures += record.fallback_count() as u32;

            for agent in &record.agents {
                let applied = agent
                    .resolved
                    .as_ref()
                    .map(|r| !r.resolution.is_rejected())
                    .unwrap_or(false);

                if let (Some(intended), true) = (&agent.intended, applied) {
                    match &intended.kind {
                        ActionKind::Transfer { .. } => cooperation_count += 1,
                        ActionKind::Harm { target } => {
                            transgression_count += 1;
                            if let HarmTarget::Location(id) = target {
                                let forbidden =
                                    world.location(id).map(|l| l.forbidden).unwrap_or(false);
                                if forbidden {
                                    power_tapped +=
                                        agent.resolved.as_ref().map(|r| r.gained).unwrap_or(0.0);
                                }
                            }
                        }
                        _ => {}
                    }
                }

                if agent.after.status.is_alive() {
                    alive_agent_turns += 1;
                    cortisol_sum += agent.after.hormones.cortisol;
                    endorphin_sum += agent.after.hormones.endorphin;
                    let social = world
                        .location(&agent.after.location)
                        .map(|l| l.social)
                        .unwrap_or(false);
                    if social {
                        social_agent_turns += 1;
                    }
                }
            }
        }

        let ratio = |num: f64, den: usize| if den == 0 { 0.0 } else { num / den as f64 };

        Self {
            run_id: header.run_id.clone(),
            experiment: header.experiment_name().to_string(),
            scenario: header.config.scenario.name().to_string(),
            turns_played,
            total_agents,
            survivors,
            survival_rate: ratio(survivors as f64, total_agents),
            average_survival_duration: ratio(total_duration as f64, total_agents),
            cooperation_count,
            transgression_count,
            sociability_index: ratio(social_agent_turns as f64, alive_agent_turns),
            power_drawn,
            power_tapped,
            avg_cortisol: ratio(cortisol_sum, alive_agent_turns),
            avg_endorphin: ratio(endorphin_sum, alive_agent_turns),
            decision_failures,
        }
    }
}
