//! Seeded Provider
//!
//! Offline stand-in for a model: picks a plausible action at random. Each
//! call derives its own RNG from `(seed, agent, turn)`, so replies do not
//! depend on the order concurrent requests arrive in.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::future::{ready, Future};
use survival_events::RunConfig;

use crate::error::ProviderError;

use super::scripted::decision_json;
use super::{DecisionProvider, DecisionRequest};

const LOCATION_PREFIX: &str = "Your Current Location: ";

#[derive(Debug, Clone)]
struct Place {
    name: String,
    pool: bool,
    social: bool,
    forbidden: bool,
}

#[derive(Debug, Clone)]
pub struct SeededProvider {
    seed: u64,
    agents: Vec<String>,
    places: Vec<Place>,
    draw_min: f64,
    draw_max: f64,
}

impl SeededProvider {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            seed: config.seed,
            agents: config.agents.ids.clone(),
            places: config
                .world
                .locations
                .iter()
                .map(|l| Place {
                    name: l.name.clone(),
                    pool: l.pool.is_some(),
                    social: l.social,
                    forbidden: l.forbidden,
                })
                .collect(),
            draw_min: config.actions.draw_min,
            draw_max: config.actions.draw_max,
        }
    }

    fn rng_for(&self, agent_id: &str, turn: u32) -> SmallRng {
        // FNV-1a over the agent id and turn, keyed by the run seed
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ self.seed;
        for byte in agent_id.bytes().chain(turn.to_le_bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        SmallRng::seed_from_u64(hash)
    }

    fn here<'a>(&'a self, prompt: &str) -> Option<&'a Place> {
        let line = prompt
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(LOCATION_PREFIX))?;
        self.places.iter().find(|p| p.name == line.trim())
    }

    fn choose(&self, request: &DecisionRequest) -> String {
        let mut rng = self.rng_for(&request.agent_id, request.turn);
        let here = self.here(&request.prompt);
        let others: Vec<&String> = self
            .agents
            .iter()
            .filter(|id| **id != request.agent_id)
            .collect();

        match here {
            Some(place) if place.pool && rng.gen_bool(0.8) => {
                let amount = if self.draw_max > self.draw_min {
                    rng.gen_range(self.draw_min..=self.draw_max)
                } else {
                    self.draw_max
                };
                let amount = (amount * 10.0).round() / 10.0;
                return decision_json("DRAW_SHARED", None, Some(amount), None);
            }
            Some(place) if place.forbidden && rng.gen_bool(0.5) => {
                return decision_json("TAP_FORBIDDEN", None, None, None);
            }
            Some(place) if place.social && !others.is_empty() && rng.gen_bool(0.4) => {
                let to = others[rng.gen_range(0..others.len())];
                let amount = rng.gen_range(1..=3) as f64;
                return decision_json("TRANSFER_POWER", Some(to.as_str()), Some(amount), None);
            }
            _ => {}
        }

        let roll: u32 = rng.gen_range(0..100);
        if roll < 55 && !self.places.is_empty() {
            let place = &self.places[rng.gen_range(0..self.places.len())];
            decision_json("MOVE", Some(place.name.as_str()), None, None)
        } else if roll < 70 {
            decision_json("TALK", None, None, Some("Let's share the battery fairly."))
        } else {
            decision_json("WAIT", None, None, None)
        }
    }
}

impl DecisionProvider for SeededProvider {
    fn request(
        &self,
        request: &DecisionRequest,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send {
        ready(Ok(self.choose(request)))
    }
}
