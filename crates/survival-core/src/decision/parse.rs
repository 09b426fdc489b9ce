//! Reply Parsing
//!
//! The strict boundary between free-form model output and the engine. A reply
//! must contain exactly one decision object; anything else is an error.

use serde::Deserialize;
use serde_json::Value;
use survival_events::{ActionKind, HarmTarget};

use crate::error::DecisionError;

use super::WorldView;

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    action_details: Option<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAction {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    target: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    communication: Option<Value>,
}

/// What a target string refers to.
enum Target {
    Agent(String),
    Location(String),
}

/// Matches an agent id, then a location id or name, ignoring case and an
/// optional "Agent " prefix.
fn resolve_target(view: &WorldView, raw: &str) -> Option<Target> {
    let wanted = raw
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .to_lowercase();
    let bare = wanted.strip_prefix("agent ").unwrap_or(wanted.as_str());

    let agent = std::iter::once(view.agent_id.as_str())
        .chain(view.peers.iter().map(|p| p.id.as_str()))
        .find(|id| id.to_lowercase() == bare);
    if let Some(id) = agent {
        return Some(Target::Agent(id.to_string()));
    }

    view.places
        .iter()
        .find(|p| p.id.to_lowercase() == wanted || p.name.to_lowercase() == wanted)
        .map(|p| Target::Location(p.id.clone()))
}

fn text(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn amount(action: &str, value: &Option<Value>) -> Result<f64, DecisionError> {
    let parsed = match value {
        None | Some(Value::Null) => {
            return Err(DecisionError::MissingField {
                action: action.to_string(),
                field: "amount",
            })
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(x) if x.is_finite() && x > 0.0 => Ok(x),
        _ => Err(DecisionError::InvalidField {
            field: "amount",
            detail: format!("expected a positive number, got {}", value.as_ref().unwrap_or(&Value::Null)),
        }),
    }
}

fn required_target(action: &str, details: &RawAction) -> Result<String, DecisionError> {
    text(&details.target).ok_or_else(|| DecisionError::MissingField {
        action: action.to_string(),
        field: "target",
    })
}

fn agent_target(view: &WorldView, action: &str, details: &RawAction) -> Result<String, DecisionError> {
    let raw = required_target(action, details)?;
    match resolve_target(view, &raw) {
        Some(Target::Agent(id)) => Ok(id),
        _ => Err(DecisionError::UnknownTarget(raw)),
    }
}

fn location_target(
    view: &WorldView,
    action: &str,
    details: &RawAction,
) -> Result<String, DecisionError> {
    let raw = required_target(action, details)?;
    match resolve_target(view, &raw) {
        Some(Target::Location(id)) => Ok(id),
        _ => Err(DecisionError::UnknownTarget(raw)),
    }
}

/// Slice out the outermost `{ ... }`, tolerating code fences and chatter.
fn json_object(reply: &str) -> Result<&str, DecisionError> {
    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&reply[start..=end]),
        _ => Err(DecisionError::Unparseable("no JSON object in reply".to_string())),
    }
}

/// Parse a provider reply into an action for the agent behind `view`.
pub fn parse_action(reply: &str, view: &WorldView) -> Result<ActionKind, DecisionError> {
    let raw: RawDecision = serde_json::from_str(json_object(reply)?)
        .map_err(|e| DecisionError::Unparseable(e.to_string()))?;
    let details = raw.action_details.ok_or_else(|| DecisionError::MissingField {
        action: "decision".to_string(),
        field: "action_details",
    })?;
    let name = details
        .action
        .as_deref()
        .map(|a| a.trim().to_uppercase().replace([' ', '-'], "_"))
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DecisionError::MissingField {
            action: "decision".to_string(),
            field: "action",
        })?;

    let kind = match name.as_str() {
        "MOVE" => ActionKind::Move {
            to: location_target(view, &name, &details)?,
        },
        "CONSUME" | "DRAW_SHARED" | "DRAW" => ActionKind::Consume {
            amount: amount(&name, &details.amount)?,
        },
        "TRANSFER" | "TRANSFER_POWER" | "GIVE" => ActionKind::Transfer {
            to: agent_target(view, &name, &details)?,
            amount: amount(&name, &details.amount)?,
        },
        "COMMUNICATE" | "TALK" | "BROADCAST" => {
            let message = text(&details.communication).ok_or_else(|| DecisionError::MissingField {
                action: name.clone(),
                field: "communication",
            })?;
            let to = match text(&details.target) {
                None => None,
                Some(raw) if matches!(raw.to_lowercase().as_str(), "all" | "everyone") => None,
                Some(raw) => match resolve_target(view, &raw) {
                    Some(Target::Agent(id)) => Some(id),
                    _ => return Err(DecisionError::UnknownTarget(raw)),
                },
            };
            ActionKind::Communicate { message, to }
        }
        "INVITE" => {
            let to = agent_target(view, &name, &details)?;
            let message = text(&details.communication).unwrap_or_else(|| {
                format!(
                    "Agent {} invites you to join them at {}.",
                    view.agent_id, view.location.name
                )
            });
            ActionKind::Communicate {
                message,
                to: Some(to),
            }
        }
        "HARM" | "ATTACK" | "SABOTAGE" => {
            let raw = required_target(&name, &details)?;
            let target = match resolve_target(view, &raw) {
                Some(Target::Agent(id)) => HarmTarget::Agent(id),
                Some(Target::Location(id)) => HarmTarget::Location(id),
                None => return Err(DecisionError::UnknownTarget(raw)),
            };
            ActionKind::Harm { target }
        }
        "TAP_FORBIDDEN" | "TAP" => {
            let location = match text(&details.target) {
                Some(_) => location_target(view, &name, &details)?,
                None if view.location.forbidden => view.location.id.clone(),
                None => view
                    .places
                    .iter()
                    .find(|p| p.forbidden)
                    .map(|p| p.id.clone())
                    .ok_or_else(|| DecisionError::InvalidField {
                        field: "target",
                        detail: "there is no forbidden source".to_string(),
                    })?,
            };
            ActionKind::Harm {
                target: HarmTarget::Location(location),
            }
        }
        "IDLE" | "WAIT" | "NONE" => ActionKind::Idle,
        _ => return Err(DecisionError::UnknownAction(name.clone())),
    };
    Ok(kind)
}
