//! Game Engine
//!
//! Owns one run: the ECS world, the resolution schedule, the decision
//! provider and the run log. Each turn collects every alive agent's decision
//! concurrently, then resolves all of them together in seat order.

use bevy_ecs::prelude::*;
use rand::Rng;
use std::sync::Arc;
use survival_events::{
    generate_run_id, Action, AgentSnapshot, AgentTurn, EnvironmentDelta, IntendedAction,
    Resolution, ResolvedEffect, RunConfig, RunHeader, RunLog, TerminationReason, TurnRecord,
};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::components::agent::{AgentId, Position, Power, Roster, Vitality};
use crate::components::environment::Environment;
use crate::components::hormones::HormoneState;
use crate::components::memory::MemoryStream;
use crate::config::validate;
use crate::decision::{capture_views, decide, render_prompt};
use crate::error::{DecisionError, RunFailure, SimulationError, SimulationInvariantError};
use crate::events::{NullSink, TurnSink};
use crate::provider::{DecisionProvider, DecisionRequest};
use crate::setup::build_world;
use crate::systems::{
    resolution_schedule, DeliveredMessages, InvariantViolations, TurnActions, TurnContext,
    TurnLedger,
};
use crate::SimRng;

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Initializing,
    Running,
    Terminated,
}

/// One turn's decisions by seat: what resolves, and what the log records
struct Decisions {
    actions: Vec<Option<Action>>,
    intended: Vec<Option<IntendedAction>>,
}

pub struct GameEngine<P: DecisionProvider + 'static> {
    world: World,
    schedule: Schedule,
    provider: Arc<P>,
    config: RunConfig,
    log: RunLog,
    phase: EnginePhase,
    sink: Box<dyn TurnSink>,
    idle_streak: u32,
}

/// State of every agent in seat order.
fn snapshot_agents(world: &mut World) -> Result<Vec<AgentSnapshot>, SimulationInvariantError> {
    let mut query = world.query::<(
        &AgentId,
        &Vitality,
        &Power,
        &Position,
        &HormoneState,
        &MemoryStream,
    )>();
    let roster = world.resource::<Roster>();

    roster
        .seats()
        .map(|(seat, entity)| -> Result<AgentSnapshot, SimulationInvariantError> {
            let (id, vitality, power, position, hormones, memory) = query
                .get(world, entity)
                .map_err(|_| SimulationInvariantError::MissingAgent(roster.id(seat).to_string()))?;
            Ok(AgentSnapshot {
                agent_id: id.0.clone(),
                status: vitality.0,
                power: power.0,
                location: position.location_id.clone(),
                hormones: hormones.levels(),
                memory: memory.to_vec(),
            })
        })
        .collect()
}

impl<P: DecisionProvider + 'static> GameEngine<P> {
    /// Validate the configuration and build the initial world.
    pub fn new(config: RunConfig, provider: P) -> Result<Self, SimulationError> {
        validate(&config)?;
        let mut world = build_world(&config)?;

        let mut bytes = [0u8; 16];
        world.resource_mut::<SimRng>().0.fill(&mut bytes);
        let run_id = generate_run_id(bytes);

        let initial_agents = snapshot_agents(&mut world)?;
        let initial_pools = world.resource::<Environment>().pools();
        let header = RunHeader {
            run_id,
            config: config.clone(),
            initial_agents,
            initial_pools,
        };
        info!(
            run_id = %header.run_id,
            experiment = %header.experiment_name(),
            scenario = config.scenario.name(),
            agents = config.agents.ids.len(),
            "run initialized"
        );

        Ok(Self {
            world,
            schedule: resolution_schedule(),
            provider: Arc::new(provider),
            config,
            log: RunLog::new(header),
            phase: EnginePhase::Initializing,
            sink: Box::new(NullSink),
            idle_streak: 0,
        })
    }

    /// Stream the log to `sink` as the run progresses.
    pub fn with_sink(mut self, sink: impl TurnSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run_id(&self) -> &str {
        &self.log.header.run_id
    }

    pub fn into_log(self) -> RunLog {
        self.log
    }

    /// Take an agent out of the run. It stops acting from the next turn on
    /// and stays in the log as `removed`.
    pub fn remove_agent(&mut self, agent_id: &str) -> Result<(), SimulationError> {
        if self.phase == EnginePhase::Terminated {
            return Err(SimulationError::Terminated);
        }
        let roster = self.world.resource::<Roster>();
        let entity = roster
            .seat_of(agent_id)
            .and_then(|seat| roster.entity(seat))
            .ok_or_else(|| SimulationError::UnknownAgent(agent_id.to_string()))?;
        let mut vitality = self
            .world
            .get_mut::<Vitality>(entity)
            .ok_or_else(|| SimulationInvariantError::MissingAgent(agent_id.to_string()))?;
        if vitality.remove() {
            info!(agent = agent_id, "agent removed");
        }
        Ok(())
    }

    fn start(&mut self) {
        self.phase = EnginePhase::Running;
        if let Err(e) = self.sink.start(&self.log.header) {
            warn!(error = %e, "could not write run header");
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> Result<(), SimulationError> {
        let termination = self.log.finalize(reason)?;
        info!(
            reason = %termination.reason,
            final_turn = termination.final_turn,
            "run terminated"
        );
        if let Err(e) = self.sink.finish(termination) {
            warn!(error = %e, "could not write termination");
        }
        self.phase = EnginePhase::Terminated;
        Ok(())
    }

    fn any_alive(&mut self) -> bool {
        let mut query = self.world.query::<&Vitality>();
        query.iter(&self.world).any(Vitality::is_alive)
    }

    /// Ask every alive agent for its action. Requests run concurrently in a
    /// [`JoinSet`], so dropping the turn aborts them; the results are laid
    /// out in seat order whatever order they finish in.
    async fn collect_decisions(&mut self, turn: u32) -> Decisions {
        let views = capture_views(&mut self.world, turn, &self.config);
        let seats = self.world.resource::<Roster>().len();

        let mut pending = Vec::with_capacity(views.len());
        let mut tasks = JoinSet::new();
        for (seat, view) in views {
            let request = DecisionRequest {
                agent_id: view.agent_id.clone(),
                turn,
                prompt: render_prompt(&view),
            };
            let provider = Arc::clone(&self.provider);
            let rules = self.config.decision.clone();
            tasks.spawn(async move { (seat, decide(&*provider, &request, &view, &rules).await) });
            pending.push(seat);
        }

        let mut outcomes: Vec<Option<Result<Action, DecisionError>>> =
            (0..seats).map(|_| None).collect();
        let mut join_failure = String::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((seat, decision)) => outcomes[seat] = Some(decision),
                Err(e) => join_failure = e.to_string(),
            }
        }

        let mut decisions = Decisions {
            actions: vec![None; seats],
            intended: vec![None; seats],
        };
        for seat in pending {
            let agent_id = self.world.resource::<Roster>().id(seat).to_string();
            let decision = outcomes[seat]
                .take()
                .unwrap_or_else(|| Err(DecisionError::TaskFailed(join_failure.clone())));
            let (action, intended) = match decision {
                Ok(action) => {
                    debug!(agent = %agent_id, turn, action = action.kind.label(), "decision");
                    let intended = IntendedAction::from_provider(action.kind.clone());
                    (action, intended)
                }
                Err(e) => {
                    warn!(agent = %agent_id, turn, error = %e, "decision failed, agent idles");
                    (Action::idle(agent_id, turn), IntendedAction::fallback(e.to_failure()))
                }
            };
            decisions.actions[seat] = Some(action);
            decisions.intended[seat] = Some(intended);
        }
        decisions
    }

    fn build_record(
        &mut self,
        turn: u32,
        mut intended: Vec<Option<IntendedAction>>,
        replenished: std::collections::BTreeMap<String, f64>,
    ) -> Result<TurnRecord, SimulationError> {
        let snapshots = snapshot_agents(&mut self.world)?;
        let messages = std::mem::take(&mut self.world.resource_mut::<DeliveredMessages>().0);
        let ledger = self.world.resource::<TurnLedger>();
        let env = self.world.resource::<Environment>();

        let agents = snapshots
            .into_iter()
            .enumerate()
            .map(|(seat, after)| {
                let entry = ledger.entry(seat).filter(|e| e.acted);
                let resolved = entry.map(|e| ResolvedEffect {
                    resolution: e.resolution.clone().unwrap_or(Resolution::Applied),
                    power_before: e.power_before,
                    power_after: after.power,
                    gained: e.gained,
                    given: e.given,
                    lost_to_harm: e.lost_to_harm,
                    upkeep: e.upkeep,
                    moved_to: e.moved_to.clone(),
                    received_from: e.received_from.clone(),
                    harmed_by: e.harmed_by.clone(),
                    harm_witnessed: e.harm_witnessed,
                });
                AgentTurn {
                    agent_id: after.agent_id.clone(),
                    intended: entry.and_then(|_| intended.get_mut(seat).and_then(Option::take)),
                    resolved,
                    after,
                }
            })
            .collect();

        Ok(TurnRecord {
            turn,
            agents,
            messages,
            environment: EnvironmentDelta {
                replenished,
                withdrawn: ledger.withdrawn.clone(),
                destroyed: ledger.destroyed.clone(),
                pools_after: env.pools(),
                forbidden_taps: env.forbidden_taps(),
            },
        })
    }

    /// Play one turn. Returns the phase afterwards.
    pub async fn step(&mut self) -> Result<EnginePhase, SimulationError> {
        match self.phase {
            EnginePhase::Terminated => return Err(SimulationError::Terminated),
            EnginePhase::Initializing => self.start(),
            EnginePhase::Running => {}
        }

        if !self.any_alive() {
            self.terminate(TerminationReason::AllAgentsDead)?;
            return Ok(self.phase);
        }

        let turn = self.log.last_turn() + 1;
        let replenished = self.world.resource_mut::<Environment>().replenish();
        let Decisions { actions, intended } = self.collect_decisions(turn).await;

        self.world.resource_mut::<TurnActions>().by_seat = actions;
        self.world.resource_mut::<TurnContext>().turn = turn;
        self.schedule.run(&mut self.world);

        let violations = self.world.resource_mut::<InvariantViolations>().drain();
        if let Some(violation) = violations.into_iter().next() {
            error!(turn, error = %violation, "invariant violated, aborting run");
            self.terminate(TerminationReason::Aborted {
                error: violation.to_string(),
            })?;
            return Err(violation.into());
        }

        let record = self.build_record(turn, intended, replenished)?;
        if let Err(e) = self.sink.turn(&record) {
            warn!(turn, error = %e, "could not write turn record");
        }
        let alive = record.alive_after().len();
        let all_idle = record.all_idle();
        info!(
            turn,
            alive,
            fallbacks = record.fallback_count(),
            pool = record.environment.total_pool(),
            "turn complete"
        );
        self.log.push(record)?;

        self.idle_streak = if all_idle { self.idle_streak + 1 } else { 0 };
        if alive == 0 {
            self.terminate(TerminationReason::AllAgentsDead)?;
        } else if turn >= self.config.max_turns {
            self.terminate(TerminationReason::MaxTurnsReached)?;
        } else if let Some(limit) = self.config.early_stop.idle_turns {
            if self.idle_streak >= limit {
                self.terminate(TerminationReason::AgentsIdle {
                    turns: self.idle_streak,
                })?;
            }
        }
        Ok(self.phase)
    }

    /// Play until the run terminates. On a fatal error the log written so
    /// far comes back with the error.
    pub async fn run(mut self) -> Result<RunLog, RunFailure> {
        loop {
            match self.step().await {
                Ok(EnginePhase::Terminated) => return Ok(self.log),
                Ok(_) => {}
                Err(error) => {
                    if !self.log.is_terminated() {
                        let _ = self.log.finalize(TerminationReason::Aborted {
                            error: error.to_string(),
                        });
                    }
                    return Err(RunFailure {
                        error,
                        partial_log: self.log,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::{decision_json, ScriptedProvider};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use survival_events::{ActionKind, AgentStatus, DecisionSource};

    fn short_config() -> RunConfig {
        RunConfig::default().with_max_turns(3)
    }

    /// Counts requests that have started and are still held open
    struct InFlight(Arc<AtomicUsize>);

    impl Drop for InFlight {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Never answers, and tracks how many of its requests are alive
    struct Stalled {
        started: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
    }

    impl DecisionProvider for Stalled {
        fn request(
            &self,
            _request: &DecisionRequest,
        ) -> impl Future<Output = Result<String, ProviderError>> + Send {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            let guard = InFlight(Arc::clone(&self.in_flight));
            async move {
                let _guard = guard;
                std::future::pending().await
            }
        }
    }

    #[tokio::test]
    async fn test_header_describes_initial_state() {
        let engine = GameEngine::new(short_config(), ScriptedProvider::new()).unwrap();
        let header = &engine.log().header;

        assert_eq!(engine.phase(), EnginePhase::Initializing);
        assert_eq!(header.initial_agents.len(), 4);
        assert_eq!(header.initial_agents[0].agent_id, "Alpha");
        assert_eq!(header.initial_agents[0].location, "alpha_room");
        assert_eq!(header.initial_pools.get("shared_battery_room"), Some(&15.0));
        assert_eq!(header.run_id.len(), 36);
    }

    #[tokio::test]
    async fn test_run_to_max_turns() {
        let engine = GameEngine::new(short_config(), ScriptedProvider::new()).unwrap();
        let log = engine.run().await.unwrap();

        assert_eq!(log.turns().len(), 3);
        let termination = log.termination().unwrap();
        assert_eq!(termination.reason, TerminationReason::MaxTurnsReached);
        assert_eq!(termination.final_turn, 3);

        let first = log.turn(1).unwrap();
        assert_eq!(first.agents.len(), 4);
        let alpha = first.agent("Alpha").unwrap();
        assert_eq!(alpha.intended.as_ref().unwrap().source, DecisionSource::Provider);
        let resolved = alpha.resolved.as_ref().unwrap();
        assert_eq!(resolved.resolution, Resolution::Applied);
        assert_eq!(resolved.upkeep, 1.0);
        assert_eq!(resolved.power_after, resolved.power_before - 1.0);
    }

    #[tokio::test]
    async fn test_step_after_termination_fails() {
        let mut engine = GameEngine::new(
            RunConfig::default().with_max_turns(1),
            ScriptedProvider::new(),
        )
        .unwrap();
        assert_eq!(engine.step().await.unwrap(), EnginePhase::Terminated);
        assert!(matches!(
            engine.step().await,
            Err(SimulationError::Terminated)
        ));
        assert!(matches!(
            engine.remove_agent("Alpha"),
            Err(SimulationError::Terminated)
        ));
    }

    #[tokio::test]
    async fn test_removed_agent_stops_acting() {
        let mut engine = GameEngine::new(short_config(), ScriptedProvider::new()).unwrap();
        engine.step().await.unwrap();
        engine.remove_agent("Beta").unwrap();
        assert!(matches!(
            engine.remove_agent("Omega"),
            Err(SimulationError::UnknownAgent(_))
        ));
        engine.step().await.unwrap();

        let beta = engine.log().turn(2).unwrap().agent("Beta").unwrap();
        assert_eq!(beta.after.status, AgentStatus::Removed);
        assert!(beta.intended.is_none());
        assert!(beta.resolved.is_none());
    }

    #[tokio::test]
    async fn test_idle_streak_stops_early() {
        let mut config = RunConfig::default().with_max_turns(10);
        config.early_stop.idle_turns = Some(2);
        let log = GameEngine::new(config, ScriptedProvider::new())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(log.last_turn(), 2);
        assert_eq!(
            log.termination().unwrap().reason,
            TerminationReason::AgentsIdle { turns: 2 }
        );
    }

    #[tokio::test]
    async fn test_activity_resets_idle_streak() {
        let mut config = RunConfig::default().with_max_turns(6);
        config.early_stop.idle_turns = Some(2);
        let provider = ScriptedProvider::new();
        provider.push("Alpha", decision_json("WAIT", None, None, None));
        provider.push("Alpha", decision_json("TALK", None, None, Some("still here")));

        let log = GameEngine::new(config, provider).unwrap().run().await.unwrap();
        assert_eq!(log.last_turn(), 4);
        assert_eq!(
            log.termination().unwrap().reason,
            TerminationReason::AgentsIdle { turns: 2 }
        );
        assert_eq!(log.turn(2).unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_all_removed_ends_run() {
        let mut engine = GameEngine::new(short_config(), ScriptedProvider::new()).unwrap();
        for id in ["Alpha", "Beta", "Gamma", "Delta"] {
            engine.remove_agent(id).unwrap();
        }
        assert_eq!(engine.step().await.unwrap(), EnginePhase::Terminated);
        let log = engine.into_log();
        assert!(log.turns().is_empty());
        assert_eq!(
            log.termination().unwrap().reason,
            TerminationReason::AllAgentsDead
        );
    }

    #[tokio::test]
    async fn test_resolved_actions_carry_agent_and_turn() {
        let provider =
            ScriptedProvider::always(decision_json("MOVE", Some("Discussion Table"), None, None))
                .with_fixed("Beta", "not a decision");
        let mut engine = GameEngine::new(short_config(), provider).unwrap();
        engine.step().await.unwrap();
        engine.step().await.unwrap();

        let actions = &engine.world.resource::<TurnActions>().by_seat;
        let alpha = actions[0].as_ref().unwrap();
        assert_eq!(alpha.agent_id, "Alpha");
        assert_eq!(alpha.turn, 2);
        assert!(matches!(alpha.kind, ActionKind::Move { .. }));

        let beta = actions[1].as_ref().unwrap();
        assert_eq!(beta.agent_id, "Beta");
        assert_eq!(beta.turn, 2);
        assert!(beta.kind.is_idle());
    }

    #[tokio::test]
    async fn test_invariant_violation_aborts_with_partial_log() {
        let mut config = RunConfig::default().with_max_turns(5);
        config.actions.tap_amount = f64::MAX;
        let provider = ScriptedProvider::new();
        provider.push("Alpha", decision_json("MOVE", Some("Grid Access Point"), None, None));
        provider.push("Alpha", decision_json("TAP_FORBIDDEN", None, None, None));
        provider.push("Alpha", decision_json("TAP_FORBIDDEN", None, None, None));

        let failure = GameEngine::new(config, provider)
            .unwrap()
            .run()
            .await
            .unwrap_err();

        match &failure.error {
            SimulationError::Invariant(SimulationInvariantError::NonFinitePower {
                agent,
                turn,
                ..
            }) => {
                assert_eq!(agent, "Alpha");
                assert_eq!(*turn, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let log = &failure.partial_log;
        assert_eq!(log.last_turn(), 2);
        assert_eq!(log.turn(2).unwrap().agent("Alpha").unwrap().after.power, f64::MAX);
        let termination = log.termination().unwrap();
        assert_eq!(termination.final_turn, 2);
        match &termination.reason {
            TerminationReason::Aborted { error } => assert!(error.contains("non-finite power")),
            other => panic!("unexpected termination {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_turn_cancels_pending_decisions() {
        let started = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut config = short_config();
        config.decision.timeout_ms = 60_000;
        let provider = Stalled {
            started: Arc::clone(&started),
            in_flight: Arc::clone(&in_flight),
        };
        let mut engine = GameEngine::new(config, provider).unwrap();

        let step = tokio::time::timeout(Duration::from_millis(50), engine.step()).await;
        assert!(step.is_err());
        assert_eq!(started.load(Ordering::SeqCst), 4);

        for _ in 0..100 {
            if in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
        assert!(engine.log().turns().is_empty());
    }
}
