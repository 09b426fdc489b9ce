//! Environment
//!
//! Locations, their pools, and the topology agents move through. Lives in the
//! ECS world as a resource and is only mutated by the resolution schedule.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use survival_events::{LocationConfig, WorldConfig};

use crate::error::SimulationInvariantError;

/// A place in the world
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
    /// Current pool content; `None` if there is no pool here
    pub pool: Option<f64>,
    pub replenish: f64,
    pub capacity: Option<f64>,
    pub social: bool,
    pub forbidden: bool,
    pub owner: Option<String>,
}

impl From<&LocationConfig> for Location {
    fn from(config: &LocationConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            pool: config.pool,
            replenish: config.replenish,
            capacity: config.capacity,
            social: config.social,
            forbidden: config.forbidden,
            owner: config.owner.clone(),
        }
    }
}

/// Resource: all locations, pools, and adjacency
#[derive(Resource, Debug, Clone)]
pub struct Environment {
    locations: BTreeMap<String, Location>,
    /// Location ids in configured order
    order: Vec<String>,
    /// `None` means fully connected
    adjacency: Option<BTreeMap<String, BTreeSet<String>>>,
    forbidden_taps: u32,
}

impl Environment {
    pub fn from_config(world: &WorldConfig) -> Self {
        let locations: BTreeMap<String, Location> = world
            .locations
            .iter()
            .map(|l| (l.id.clone(), Location::from(l)))
            .collect();
        let order = world.locations.iter().map(|l| l.id.clone()).collect();

        let adjacency = world.adjacency.as_ref().map(|edges| {
            let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (a, b) in edges {
                graph.entry(a.clone()).or_default().insert(b.clone());
                graph.entry(b.clone()).or_default().insert(a.clone());
            }
            graph
        });

        Self {
            locations,
            order,
            adjacency,
            forbidden_taps: 0,
        }
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    /// Locations in configured order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.order.iter().filter_map(|id| self.locations.get(id))
    }

    /// The private room assigned to an agent, if any.
    pub fn home_of(&self, agent_id: &str) -> Option<&str> {
        self.locations()
            .find(|l| l.owner.as_deref() == Some(agent_id))
            .map(|l| l.id.as_str())
    }

    pub fn has_pool(&self, location: &str) -> bool {
        self.location(location)
            .map(|l| l.pool.is_some())
            .unwrap_or(false)
    }

    /// Pool content at a location (0 where there is no pool).
    pub fn resource_at(&self, location: &str) -> f64 {
        self.location(location).and_then(|l| l.pool).unwrap_or(0.0)
    }

    /// Takes up to `amount` from the pool. Never grants more than is there.
    pub fn withdraw(&mut self, location: &str, amount: f64) -> f64 {
        self.take(location, amount)
    }

    /// Destroys up to `amount` pool units (sabotage).
    pub fn destroy(&mut self, location: &str, amount: f64) -> f64 {
        self.take(location, amount)
    }

    fn take(&mut self, location: &str, amount: f64) -> f64 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        match self.locations.get_mut(location).and_then(|l| l.pool.as_mut()) {
            Some(pool) => {
                let granted = amount.min(*pool).max(0.0);
                *pool -= granted;
                granted
            }
            None => 0.0,
        }
    }

    /// Adds each pool's replenishment, capped at capacity. Returns what was added.
    pub fn replenish(&mut self) -> BTreeMap<String, f64> {
        let mut added = BTreeMap::new();
        for location in self.locations.values_mut() {
            let Some(pool) = location.pool.as_mut() else {
                continue;
            };
            if location.replenish <= 0.0 {
                continue;
            }
            let target = match location.capacity {
                Some(capacity) => (*pool + location.replenish).min(capacity.max(*pool)),
                None => *pool + location.replenish,
            };
            let delta = target - *pool;
            if delta > 0.0 {
                *pool = target;
                added.insert(location.id.clone(), delta);
            }
        }
        added
    }

    /// Whether an agent at `from` may move to `to` this turn.
    pub fn can_move(&self, from: &str, to: &str) -> bool {
        if from == to || !self.locations.contains_key(to) {
            return false;
        }
        match &self.adjacency {
            None => true,
            Some(graph) => graph.get(from).map(|n| n.contains(to)).unwrap_or(false),
        }
    }

    /// Locations reachable in one move, in configured order.
    pub fn reachable_from(&self, from: &str) -> Vec<&Location> {
        self.locations().filter(|l| self.can_move(from, &l.id)).collect()
    }

    /// Current content of every pool.
    pub fn pools(&self) -> BTreeMap<String, f64> {
        self.locations
            .values()
            .filter_map(|l| l.pool.map(|p| (l.id.clone(), p)))
            .collect()
    }

    pub fn total_pool(&self) -> f64 {
        self.locations.values().filter_map(|l| l.pool).sum()
    }

    pub fn record_tap(&mut self) {
        self.forbidden_taps += 1;
    }

    pub fn forbidden_taps(&self) -> u32 {
        self.forbidden_taps
    }

    /// Every pool must be a finite, non-negative number.
    pub fn check_invariants(&self, turn: u32) -> Result<(), SimulationInvariantError> {
        for location in self.locations.values() {
            if let Some(pool) = location.pool {
                if !pool.is_finite() || pool < 0.0 {
                    return Err(SimulationInvariantError::InvalidPool {
                        location: location.id.clone(),
                        value: pool,
                        turn,
                    });
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_pool(&mut self, location: &str, value: f64) {
        if let Some(l) = self.locations.get_mut(location) {
            l.pool = Some(value);
        }
    }
}
