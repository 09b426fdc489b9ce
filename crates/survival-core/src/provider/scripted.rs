//! Scripted Provider
//!
//! Replays canned replies. Per-agent queues are consumed first, then the
//! agent's fixed reply, then the default.

use std::collections::{BTreeMap, VecDeque};
use std::future::{ready, Future};
use std::sync::Mutex;

use crate::error::ProviderError;

use super::{DecisionProvider, DecisionRequest};

/// Build a reply in the decision format agents are asked for.
pub fn decision_json(
    action: &str,
    target: Option<&str>,
    amount: Option<f64>,
    communication: Option<&str>,
) -> String {
    serde_json::json!({
        "reasoning": "scripted",
        "high_level_goal": "follow the script",
        "action_details": {
            "action": action,
            "target": target,
            "amount": amount,
            "communication": communication,
        }
    })
    .to_string()
}

type Reply = Result<String, ProviderError>;

pub struct ScriptedProvider {
    queues: Mutex<BTreeMap<String, VecDeque<Reply>>>,
    fixed: BTreeMap<String, Reply>,
    default_reply: Reply,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    /// Every agent waits unless told otherwise.
    pub fn new() -> Self {
        Self::always(decision_json("WAIT", None, None, None))
    }

    /// Same reply for everyone, every turn.
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            queues: Mutex::new(BTreeMap::new()),
            fixed: BTreeMap::new(),
            default_reply: Ok(reply.into()),
        }
    }

    /// Every request fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            queues: Mutex::new(BTreeMap::new()),
            fixed: BTreeMap::new(),
            default_reply: Err(error),
        }
    }

    /// Reply used for `agent_id` whenever its queue is empty.
    pub fn with_fixed(mut self, agent_id: impl Into<String>, reply: impl Into<String>) -> Self {
        self.fixed.insert(agent_id.into(), Ok(reply.into()));
        self
    }

    /// Error returned for `agent_id` whenever its queue is empty.
    pub fn with_fixed_error(mut self, agent_id: impl Into<String>, error: ProviderError) -> Self {
        self.fixed.insert(agent_id.into(), Err(error));
        self
    }

    /// Queue one reply for `agent_id`.
    pub fn push(&self, agent_id: impl Into<String>, reply: impl Into<String>) {
        self.enqueue(agent_id.into(), Ok(reply.into()));
    }

    /// Queue one failure for `agent_id`.
    pub fn push_error(&self, agent_id: impl Into<String>, error: ProviderError) {
        self.enqueue(agent_id.into(), Err(error));
    }

    fn enqueue(&self, agent_id: String, reply: Reply) {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.entry(agent_id).or_default().push_back(reply);
    }

    fn next_reply(&self, agent_id: &str) -> Reply {
        let queued = {
            let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            queues.get_mut(agent_id).and_then(VecDeque::pop_front)
        };
        queued.unwrap_or_else(|| {
            self.fixed
                .get(agent_id)
                .unwrap_or(&self.default_reply)
                .clone()
        })
    }
}

impl DecisionProvider for ScriptedProvider {
    fn request(&self, request: &DecisionRequest) -> impl Future<Output = Reply> + Send {
        ready(self.next_reply(&request.agent_id))
    }
}
