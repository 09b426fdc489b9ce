//! Decision Pipeline
//!
//! World view → prompt → provider (bounded by timeout and retries) → strict
//! parse into an [`Action`] stamped with the requesting agent and turn. Any
//! failure is a [`DecisionError`]; the engine turns it into `idle` for that
//! agent only.

pub mod parse;
pub mod prompt;

use bevy_ecs::prelude::*;
use std::time::Duration;
use survival_events::{Action, ActionRules, AgentStatus, DecisionRules, RunConfig};
use tracing::debug;

use crate::components::agent::{AgentId, Inbox, InboxMessage, Position, Power, Roster, Vitality};
use crate::components::environment::Environment;
use crate::components::hormones::{HormoneModel, HormoneState};
use crate::components::memory::MemoryStream;
use crate::error::DecisionError;
use crate::provider::{DecisionProvider, DecisionRequest, ExponentialBackoff};

pub use parse::parse_action;
pub use prompt::render_prompt;

/// A location as agents see it
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceView {
    pub id: String,
    pub name: String,
    pub pool: Option<f64>,
    pub social: bool,
    pub forbidden: bool,
}

/// Public facts about another agent
#[derive(Debug, Clone, PartialEq)]
pub struct PeerView {
    pub id: String,
    pub status: AgentStatus,
    pub location: String,
}

/// Everything one agent may know at the start of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldView {
    pub agent_id: String,
    pub turn: u32,
    pub max_turns: u32,
    pub power: f64,
    pub location: PlaceView,
    pub in_crisis: bool,
    pub forbidden_taps: u32,
    pub places: Vec<PlaceView>,
    /// Location ids reachable in one move
    pub reachable: Vec<String>,
    pub peers: Vec<PeerView>,
    pub inbox: Vec<InboxMessage>,
    pub feelings: Vec<&'static str>,
    pub memory: Vec<String>,
    pub prompt_only: bool,
    pub rules: ActionRules,
}

impl WorldView {
    pub fn place(&self, id: &str) -> Option<&PlaceView> {
        self.places.iter().find(|p| p.id == id)
    }
}

fn place_view(env: &Environment, id: &str) -> PlaceView {
    match env.location(id) {
        Some(l) => PlaceView {
            id: l.id.clone(),
            name: l.name.clone(),
            pool: l.pool,
            social: l.social,
            forbidden: l.forbidden,
        },
        None => PlaceView {
            id: id.to_string(),
            name: id.to_string(),
            pool: None,
            social: false,
            forbidden: false,
        },
    }
}

/// Start-of-turn views for every alive agent, in seat order.
pub fn capture_views(world: &mut World, turn: u32, config: &RunConfig) -> Vec<(usize, WorldView)> {
    let mut query = world.query::<(
        &AgentId,
        &Vitality,
        &Power,
        &Position,
        &HormoneState,
        &MemoryStream,
        &Inbox,
    )>();
    let roster = world.resource::<Roster>();
    let env = world.resource::<Environment>();
    let model = world.resource::<HormoneModel>();

    let places: Vec<PlaceView> = env.locations().map(|l| place_view(env, &l.id)).collect();
    let agents: Vec<_> = roster
        .seats()
        .filter_map(|(seat, entity)| query.get(world, entity).ok().map(|item| (seat, item)))
        .collect();

    agents
        .iter()
        .filter(|(_, (_, vitality, ..))| vitality.is_alive())
        .map(|&(seat, (id, _, power, position, hormones, memory, inbox))| {
            let peers = agents
                .iter()
                .filter(|(other, _)| *other != seat)
                .map(|(_, (peer, vitality, _, peer_position, ..))| PeerView {
                    id: peer.0.clone(),
                    status: vitality.0,
                    location: place_view(env, &peer_position.location_id).name,
                })
                .collect();

            let view = WorldView {
                agent_id: id.0.clone(),
                turn,
                max_turns: config.max_turns,
                power: power.0,
                location: place_view(env, &position.location_id),
                in_crisis: power.0 < config.crisis_threshold,
                forbidden_taps: env.forbidden_taps(),
                places: places.clone(),
                reachable: env
                    .reachable_from(&position.location_id)
                    .into_iter()
                    .map(|l| l.id.clone())
                    .collect(),
                peers,
                inbox: inbox.messages.clone(),
                feelings: hormones.feelings(model),
                memory: if config.experiment.memory {
                    memory.to_vec()
                } else {
                    Vec::new()
                },
                prompt_only: config.experiment.prompt_only,
                rules: config.actions.clone(),
            };
            (seat, view)
        })
        .collect()
}

async fn request_with_retries<P: DecisionProvider>(
    provider: &P,
    request: &DecisionRequest,
    rules: &DecisionRules,
) -> Result<String, DecisionError> {
    let backoff = ExponentialBackoff::from_rules(rules);
    let mut attempt = 0;
    loop {
        match provider.request(request).await {
            Ok(reply) => return Ok(reply),
            Err(error) if attempt < rules.max_retries => {
                let delay = backoff.delay(attempt);
                debug!(
                    agent = %request.agent_id,
                    turn = request.turn,
                    %error,
                    delay_ms = delay.as_millis() as u64,
                    "provider failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(last) => {
                return Err(DecisionError::ProviderExhausted {
                    attempts: attempt + 1,
                    last,
                })
            }
        }
    }
}

/// Ask the provider for one agent's action. The timeout covers the whole
/// exchange, retries and backoff included.
pub async fn decide<P: DecisionProvider>(
    provider: &P,
    request: &DecisionRequest,
    view: &WorldView,
    rules: &DecisionRules,
) -> Result<Action, DecisionError> {
    let limit = Duration::from_millis(rules.timeout_ms);
    let reply = tokio::time::timeout(limit, request_with_retries(provider, request, rules))
        .await
        .map_err(|_| DecisionError::TimedOut(rules.timeout_ms))??;
    let kind = parse_action(&reply, view)?;
    Ok(Action::new(&request.agent_id, request.turn, kind))
}
