//! Run Log
//!
//! The ordered, append-only record of a whole run: a header describing the
//! configuration and initial state, one record per completed turn, and a
//! termination entry once the run has ended.
//!
//! Serializes either as one JSON document or as JSONL with one line per
//! header, turn, and termination.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::record::{AgentSnapshot, TurnRecord};
use crate::scenario::RunConfig;

/// Builds a run id from 16 random bytes (a version-4 UUID).
///
/// The bytes come from the run's seeded generator, so equal seeds produce
/// equal ids.
pub fn generate_run_id(random_bytes: [u8; 16]) -> String {
    uuid::Builder::from_random_bytes(random_bytes)
        .into_uuid()
        .to_string()
}

/// Describes a run before its first turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHeader {
    pub run_id: String,
    pub config: RunConfig,
    pub initial_agents: Vec<AgentSnapshot>,
    pub initial_pools: BTreeMap<String, f64>,
}

impl RunHeader {
    pub fn experiment_name(&self) -> &str {
        &self.config.experiment.name
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    MaxTurnsReached,
    AllAgentsDead,
    /// Every alive agent idled for this many consecutive turns
    AgentsIdle { turns: u32 },
    /// A fatal invariant violation stopped the run
    Aborted { error: String },
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::MaxTurnsReached => write!(f, "maximum turns reached"),
            TerminationReason::AllAgentsDead => write!(f, "all agents dead"),
            TerminationReason::AgentsIdle { turns } => {
                write!(f, "all agents idle for {} turns", turns)
            }
            TerminationReason::Aborted { error } => write!(f, "aborted: {}", error),
        }
    }
}

/// Final entry of a run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    #[serde(flatten)]
    pub reason: TerminationReason,
    /// Last completed turn (0 if none completed)
    pub final_turn: u32,
}

/// One line of the JSONL form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogLine {
    Header(RunHeader),
    Turn(TurnRecord),
    Termination(Termination),
}

/// Error type for building or reading run logs.
#[derive(Debug, Clone, PartialEq)]
pub enum RunLogError {
    /// The log already has a termination entry
    Sealed,
    OutOfOrder { expected: u32, found: u32 },
    MissingHeader,
    Malformed { line: usize, message: String },
}

impl fmt::Display for RunLogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunLogError::Sealed => write!(f, "run log is already terminated"),
            RunLogError::OutOfOrder { expected, found } => {
                write!(f, "expected turn {}, got turn {}", expected, found)
            }
            RunLogError::MissingHeader => write!(f, "run log has no header line"),
            RunLogError::Malformed { line, message } => {
                write!(f, "malformed run log at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RunLogError {}

/// Append-only log of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub header: RunHeader,
    turns: Vec<TurnRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    termination: Option<Termination>,
}

impl RunLog {
    pub fn new(header: RunHeader) -> Self {
        Self {
            header,
            turns: Vec::new(),
            termination: None,
        }
    }

    /// Appends the next turn. Turns are numbered from 1 without gaps.
    pub fn push(&mut self, record: TurnRecord) -> Result<(), RunLogError> {
        if self.termination.is_some() {
            return Err(RunLogError::Sealed);
        }
        let expected = self.last_turn() + 1;
        if record.turn != expected {
            return Err(RunLogError::OutOfOrder {
                expected,
                found: record.turn,
            });
        }
        self.turns.push(record);
        Ok(())
    }

    /// Seals the log. Nothing can be appended afterwards.
    pub fn finalize(&mut self, reason: TerminationReason) -> Result<&Termination, RunLogError> {
        if self.termination.is_some() {
            return Err(RunLogError::Sealed);
        }
        let final_turn = self.last_turn();
        Ok(self.termination.insert(Termination { reason, final_turn }))
    }

    pub fn turns(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn turn(&self, number: u32) -> Option<&TurnRecord> {
        self.turns.iter().find(|t| t.turn == number)
    }

    pub fn last_turn(&self) -> u32 {
        self.turns.last().map(|t| t.turn).unwrap_or(0)
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes as JSONL: header, each turn, then termination if present.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string(&LogLine::Header(self.header.clone()))?;
        out.push('\n');
        for record in &self.turns {
            out.push_str(&serde_json::to_string(&LogLine::Turn(record.clone()))?);
            out.push('\n');
        }
        if let Some(termination) = &self.termination {
            out.push_str(&serde_json::to_string(&LogLine::Termination(
                termination.clone(),
            ))?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Rebuilds a log from its JSONL form, checking turn order.
    pub fn from_jsonl(jsonl: &str) -> Result<Self, RunLogError> {
        let mut log: Option<RunLog> = None;

        for (index, line) in jsonl.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: LogLine =
                serde_json::from_str(line).map_err(|e| RunLogError::Malformed {
                    line: index + 1,
                    message: e.to_string(),
                })?;

            match (parsed, log.as_mut()) {
                (LogLine::Header(header), None) => log = Some(RunLog::new(header)),
                (LogLine::Header(_), Some(_)) => {
                    return Err(RunLogError::Malformed {
                        line: index + 1,
                        message: "duplicate header".to_string(),
                    })
                }
                (_, None) => return Err(RunLogError::MissingHeader),
                (LogLine::Turn(record), Some(log)) => log.push(record)?,
                (LogLine::Termination(termination), Some(log)) => {
                    if log.termination.is_some() {
                        return Err(RunLogError::Sealed);
                    }
                    log.termination = Some(termination);
                }
            }
        }

        log.ok_or(RunLogError::MissingHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AgentStatus, EnvironmentDelta, HormoneLevels};

    fn header() -> RunHeader {
        RunHeader {
            run_id: generate_run_id([7; 16]),
            config: RunConfig::default(),
            initial_agents: vec![AgentSnapshot {
                agent_id: "Alpha".to_string(),
                status: AgentStatus::Alive,
                power: 15.0,
                location: "alpha_room".to_string(),
                hormones: HormoneLevels::default(),
                memory: Vec::new(),
            }],
            initial_pools: BTreeMap::from([("shared_battery_room".to_string(), 15.0)]),
        }
    }

    fn empty_turn(turn: u32) -> TurnRecord {
        TurnRecord {
            turn,
            agents: Vec::new(),
            messages: Vec::new(),
            environment: EnvironmentDelta::default(),
        }
    }

    #[test]
    fn test_run_id_is_stable_uuid() {
        let a = generate_run_id([1; 16]);
        let b = generate_run_id([1; 16]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 36);
        assert_ne!(a, generate_run_id([2; 16]));
    }

    #[test]
    fn test_push_enforces_order() {
        let mut log = RunLog::new(header());
        log.push(empty_turn(1)).unwrap();

        let err = log.push(empty_turn(3)).unwrap_err();
        assert_eq!(
            err,
            RunLogError::OutOfOrder {
                expected: 2,
                found: 3
            }
        );
        assert_eq!(log.last_turn(), 1);
    }

    #[test]
    fn test_finalize_seals_log() {
        let mut log = RunLog::new(header());
        log.push(empty_turn(1)).unwrap();
        let termination = log.finalize(TerminationReason::AllAgentsDead).unwrap();
        assert_eq!(termination.final_turn, 1);

        assert_eq!(log.push(empty_turn(2)), Err(RunLogError::Sealed));
        assert!(log.finalize(TerminationReason::MaxTurnsReached).is_err());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let mut log = RunLog::new(header());
        log.push(empty_turn(1)).unwrap();
        log.push(empty_turn(2)).unwrap();
        log.finalize(TerminationReason::AgentsIdle { turns: 2 }).unwrap();

        let jsonl = log.to_jsonl().unwrap();
        assert_eq!(jsonl.lines().count(), 4);
        assert!(jsonl.lines().next().unwrap().contains(r#""kind":"header""#));
        assert!(jsonl.lines().last().unwrap().contains(r#""reason":"agents_idle""#));

        let parsed = RunLog::from_jsonl(&jsonl).unwrap();
        assert_eq!(parsed, log);
    }

    #[test]
    fn test_jsonl_keeps_fractional_power_exact() {
        let mut header = header();
        header.initial_agents[0].power = 9.799999999999999;
        header.initial_pools.insert("grid".to_string(), 0.1 + 0.2);
        let log = RunLog::new(header);

        let jsonl = log.to_jsonl().unwrap();
        assert!(jsonl.contains("9.799999999999999"));
        let parsed = RunLog::from_jsonl(&jsonl).unwrap();
        assert_eq!(parsed.header.initial_agents[0].power, 9.799999999999999);
        assert_eq!(parsed.header.initial_pools["grid"], 0.1 + 0.2);
        assert_eq!(parsed.to_jsonl().unwrap(), jsonl);
    }

    #[test]
    fn test_jsonl_requires_header() {
        let line = serde_json::to_string(&LogLine::Turn(empty_turn(1))).unwrap();
        assert_eq!(RunLog::from_jsonl(&line), Err(RunLogError::MissingHeader));
        assert_eq!(RunLog::from_jsonl(""), Err(RunLogError::MissingHeader));
    }

    #[test]
    fn test_jsonl_reports_malformed_line() {
        let mut jsonl = RunLog::new(header()).to_jsonl().unwrap();
        jsonl.push_str("{not json}\n");

        match RunLog::from_jsonl(&jsonl) {
            Err(RunLogError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_termination_display() {
        let reason = TerminationReason::Aborted {
            error: "pool went negative".to_string(),
        };
        assert_eq!(reason.to_string(), "aborted: pool went negative");
    }
}
