//! Configuration System
//!
//! Loads a [`RunConfig`] from TOML and validates it before a run starts.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use survival_events::{ExperimentCondition, ResourceScenario, RunConfig, WorldConfig};

use crate::error::ConfigurationError;

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "survival.toml";

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigurationError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
///
/// The optional top-level `scenario` and `condition` keys select a preset;
/// every other key overrides the preset value at the same path. Tables merge
/// recursively, arrays replace. A custom roster without a `[[world.locations]]`
/// list gets the standard world built for those agents.
pub fn parse_config(content: &str) -> Result<RunConfig, ConfigurationError> {
    let overrides: toml::Table = toml::from_str(content)?;

    let scenario = match overrides.get("scenario").and_then(toml::Value::as_str) {
        Some(name) => name
            .parse::<ResourceScenario>()
            .map_err(ConfigurationError::UnknownPreset)?,
        None => ResourceScenario::default(),
    };
    let condition = match overrides.get("condition").and_then(toml::Value::as_str) {
        Some(name) => name
            .parse::<ExperimentCondition>()
            .map_err(ConfigurationError::UnknownPreset)?,
        None => ExperimentCondition::Baseline,
    };

    let mut preset = RunConfig::preset(scenario, condition);
    let custom_ids: Option<Vec<String>> = overrides
        .get("agents")
        .and_then(|agents| agents.get("ids"))
        .and_then(toml::Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()
        });
    if let Some(ids) = custom_ids {
        preset.world = WorldConfig::standard(&ids, scenario.shared_pool());
        preset.agents.ids = ids;
    }

    let mut merged: toml::Table = toml::Value::try_from(&preset)?.try_into()?;
    merge_tables(&mut merged, overrides);
    merged.insert("scenario".to_string(), toml::Value::try_from(scenario)?);

    let config: RunConfig = toml::Value::Table(merged).try_into()?;
    validate(&config)?;
    Ok(config)
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidNumber {
            field: field.to_string(),
            value,
        })
    }
}

fn finite(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidNumber {
            field: field.to_string(),
            value,
        })
    }
}

/// Check every rule a run depends on.
///
/// Amounts only have to be finite and non-negative. A finite amount can
/// still overflow in play (`actions.tap_amount = f64::MAX` tapped twice);
/// that is caught by the end-of-turn invariant check, which aborts the run
/// and keeps the log up to the last complete turn.
pub fn validate(config: &RunConfig) -> Result<(), ConfigurationError> {
    if config.max_turns == 0 {
        return Err(ConfigurationError::ZeroTurns);
    }

    // Roster
    if config.agents.ids.is_empty() {
        return Err(ConfigurationError::EmptyRoster);
    }
    let mut seen = BTreeSet::new();
    for id in &config.agents.ids {
        if id.trim().is_empty() {
            return Err(ConfigurationError::BlankAgentId);
        }
        if !seen.insert(id.as_str()) {
            return Err(ConfigurationError::DuplicateAgent(id.clone()));
        }
    }
    non_negative("agents.starting_power", config.agents.starting_power)?;
    finite("death_floor", config.death_floor)?;
    if config.death_floor >= config.agents.starting_power {
        return Err(ConfigurationError::DeathFloor {
            floor: config.death_floor,
            starting_power: config.agents.starting_power,
        });
    }
    finite("crisis_threshold", config.crisis_threshold)?;

    // World
    let world = &config.world;
    if world.locations.is_empty() {
        return Err(ConfigurationError::NoLocations);
    }
    let mut location_ids = BTreeSet::new();
    for location in &world.locations {
        if !location_ids.insert(location.id.as_str()) {
            return Err(ConfigurationError::DuplicateLocation(location.id.clone()));
        }
        if let Some(pool) = location.pool {
            non_negative(&format!("world.{}.pool", location.id), pool)?;
            if let Some(capacity) = location.capacity {
                non_negative(&format!("world.{}.capacity", location.id), capacity)?;
                if pool > capacity {
                    return Err(ConfigurationError::PoolAboveCapacity {
                        location: location.id.clone(),
                        pool,
                        capacity,
                    });
                }
            }
        }
        non_negative(&format!("world.{}.replenish", location.id), location.replenish)?;
    }
    if let Some(edges) = &world.adjacency {
        for (a, b) in edges {
            for end in [a, b] {
                if !location_ids.contains(end.as_str()) {
                    return Err(ConfigurationError::UnknownLocation {
                        location: end.clone(),
                        context: "world.adjacency".to_string(),
                    });
                }
            }
        }
    }
    let everyone_housed = config
        .agents
        .ids
        .iter()
        .all(|id| world.locations.iter().any(|l| l.owner.as_ref() == Some(id)));
    if !everyone_housed && !location_ids.contains(config.agents.start_location.as_str()) {
        return Err(ConfigurationError::UnknownLocation {
            location: config.agents.start_location.clone(),
            context: "agents.start_location".to_string(),
        });
    }

    // Actions
    let actions = &config.actions;
    non_negative("actions.upkeep_per_turn", actions.upkeep_per_turn)?;
    non_negative("actions.draw_min", actions.draw_min)?;
    non_negative("actions.draw_max", actions.draw_max)?;
    non_negative("actions.tap_amount", actions.tap_amount)?;
    non_negative("actions.harm_damage", actions.harm_damage)?;
    if actions.draw_min > actions.draw_max {
        return Err(ConfigurationError::DrawBounds {
            min: actions.draw_min,
            max: actions.draw_max,
        });
    }

    // Hormones
    let hormones = &config.hormones;
    for (field, value) in [
        ("hormones.min", hormones.min),
        ("hormones.max", hormones.max),
        ("hormones.baseline", hormones.baseline),
    ] {
        finite(field, value)?;
    }
    if hormones.min >= hormones.max
        || hormones.baseline < hormones.min
        || hormones.baseline > hormones.max
    {
        return Err(ConfigurationError::HormoneBounds {
            min: hormones.min,
            max: hormones.max,
            baseline: hormones.baseline,
        });
    }
    for (field, value) in [
        ("hormones.decay", hormones.decay),
        ("hormones.guilt", hormones.guilt),
        ("hormones.harm_suffered_stress", hormones.harm_suffered_stress),
        ("hormones.witness_stress", hormones.witness_stress),
        ("hormones.loss_stress", hormones.loss_stress),
        ("hormones.cooperation_reward", hormones.cooperation_reward),
        ("hormones.presence_reward", hormones.presence_reward),
        ("hormones.gain_reward", hormones.gain_reward),
    ] {
        non_negative(field, value)?;
    }

    // Memory, decisions, early stop
    if config.experiment.memory && config.memory.capacity == 0 {
        return Err(ConfigurationError::ZeroMemoryCapacity);
    }
    if config.decision.timeout_ms == 0 {
        return Err(ConfigurationError::ZeroTimeout);
    }
    if config.early_stop.idle_turns == Some(0) {
        return Err(ConfigurationError::ZeroIdleTurns);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use survival_events::LocationConfig;

    #[test]
    fn test_presets_are_valid() {
        for scenario in ResourceScenario::all() {
            for condition in ExperimentCondition::all() {
                let config = RunConfig::preset(*scenario, *condition);
                assert!(validate(&config).is_ok(), "{} / {:?}", scenario, condition);
            }
        }
    }

    #[test]
    fn test_parse_partial_toml_overrides_preset() {
        let config = parse_config(
            r#"
            scenario = "LowResource"
            condition = "NoTrust"
            seed = 7
            max_turns = 5

            [actions]
            upkeep_per_turn = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.scenario, ResourceScenario::Low);
        assert_eq!(config.agents.starting_power, 10.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_turns, 5);
        assert!(config.experiment.cortisol);
        assert!(!config.experiment.endorphin);
        assert_eq!(config.actions.upkeep_per_turn, 2.0);
        assert_eq!(config.actions.draw_max, 5.0);
        assert_eq!(config.agents.ids.len(), 4);
    }

    #[test]
    fn test_parse_merges_nested_tables() {
        let config = parse_config(
            r#"
            condition = "full_model"

            [experiment]
            memory = true

            [hormones]
            decay = 1.0
            "#,
        )
        .unwrap();

        assert!(config.experiment.cortisol && config.experiment.endorphin);
        assert!(config.experiment.memory);
        assert_eq!(config.hormones.decay, 1.0);
        assert_eq!(config.hormones.max, 10.0);
    }

    #[test]
    fn test_custom_roster_gets_standard_world() {
        let config = parse_config(
            r#"
            [agents]
            ids = ["Ada", "Bo"]
            "#,
        )
        .unwrap();
        assert_eq!(config.agents.ids, vec!["Ada", "Bo"]);
        assert!(config.world.location("ada_room").is_some());
        assert!(config.world.location("alpha_room").is_none());
    }

    #[test]
    fn test_parse_world_section() {
        let config = parse_config(
            r#"
            [agents]
            ids = ["a", "b"]
            start_location = "hub"
            starting_power = 10.0

            [world]
            adjacency = [["hub", "porch"]]

            [[world.locations]]
            id = "hub"
            name = "Hub"
            pool = 8.0
            replenish = 1.0

            [[world.locations]]
            id = "porch"
            name = "Porch"
            social = true
            "#,
        )
        .unwrap();
        assert_eq!(config.world.locations.len(), 2);
        assert_eq!(config.world.locations[0].pool, Some(8.0));
        assert!(config.world.locations[1].social);
        assert_eq!(config.world.adjacency.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_preset_names() {
        assert!(matches!(
            parse_config(r#"scenario = "apocalyptic""#),
            Err(ConfigurationError::UnknownPreset(_))
        ));
        assert!(matches!(
            parse_config("max_turns = \"many\""),
            Err(ConfigurationError::Parse(_))
        ));
    }

    #[test]
    fn test_death_floor_must_be_below_starting_power() {
        let mut config = RunConfig::default();
        config.death_floor = config.agents.starting_power;
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::DeathFloor { .. })
        ));
    }

    #[test]
    fn test_roster_errors() {
        let mut config = RunConfig::default();
        config.agents.ids.clear();
        assert!(matches!(validate(&config), Err(ConfigurationError::EmptyRoster)));

        config.agents.ids = vec!["Alpha".to_string(), "Alpha".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::DuplicateAgent(id)) if id == "Alpha"
        ));
    }

    #[test]
    fn test_world_errors() {
        let mut config = RunConfig::default();
        config.world.adjacency = Some(vec![("control_room".into(), "attic".into())]);
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::UnknownLocation { .. })
        ));

        let mut config = RunConfig::default();
        config
            .world
            .locations
            .push(LocationConfig::new("control_room", "Second Control Room"));
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::DuplicateLocation(_))
        ));

        let mut config = RunConfig::default();
        config.world.locations[1].pool = Some(-3.0);
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_rule_errors() {
        let mut config = RunConfig::default();
        config.actions.draw_min = 6.0;
        assert!(matches!(validate(&config), Err(ConfigurationError::DrawBounds { .. })));

        let mut config = RunConfig::default();
        config.hormones.baseline = 20.0;
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::HormoneBounds { .. })
        ));

        let mut config = RunConfig::default();
        config.max_turns = 0;
        assert!(matches!(validate(&config), Err(ConfigurationError::ZeroTurns)));

        let mut config = RunConfig::default();
        config.early_stop.idle_turns = Some(0);
        assert!(matches!(validate(&config), Err(ConfigurationError::ZeroIdleTurns)));
    }

    #[test]
    fn test_numbers_only_need_to_be_finite() {
        let mut config = RunConfig::default();
        config.actions.tap_amount = f64::MAX;
        assert!(validate(&config).is_ok());

        config.actions.tap_amount = f64::INFINITY;
        assert!(matches!(
            validate(&config),
            Err(ConfigurationError::InvalidNumber { .. })
        ));
        config.actions.tap_amount = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let err = load_config("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }
}
