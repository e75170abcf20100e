use crate::core::event::RaceScript;
use crate::core::progress::integrate;
use crate::core::race::{RaceConfig, SimConstants};
use crate::core::stats::EntityStats;
use crate::core::timeline::{normalize, validate, ScriptError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

/// RaceScenario is used to store everything a race needs: the race configuration, the scripts of
/// all entities and their stats.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceScenario {
    pub race_config: RaceConfig,
    pub scripts: Vec<RaceScript>,
    pub stats: HashMap<String, EntityStats>,
}

impl RaceScenario {
    /// The method returns all script contract violations, one per offending entity.
    pub fn validate_scripts(&self) -> Vec<(String, ScriptError)> {
        self.scripts
            .iter()
            .filter_map(|script| {
                validate(script)
                    .err()
                    .map(|err| (script.entity_id.to_owned(), err))
            })
            .collect()
    }

    /// The method returns the race time after which nothing changes anymore: the latest finish,
    /// derived arrival, or scripted event of any entity, but at least the loiter phase.
    pub fn estimated_end(&self, sim_consts: &SimConstants) -> f64 {
        let mut t_end = sim_consts.loiter_duration;

        for script in self.scripts.iter() {
            let timeline = normalize(script);
            let t_last_event = timeline.last().map_or(0.0, |entry| entry.t);

            let t_entity = match script.authoritative_finish() {
                Some(t_fin) => t_fin,
                None => {
                    let speed = self
                        .stats
                        .get(&script.entity_id)
                        .map_or(0.0, |stats| stats.usable_speed());
                    integrate(&timeline, speed, self.race_config.total_distance, f64::MAX)
                        .t_finished
                        .unwrap_or(t_last_event)
                }
            };

            if t_entity.is_finite() {
                t_end = t_end.max(t_entity).max(t_last_event);
            }
        }

        t_end
    }
}

/// read_race_scenario reads the JSON file and decodes the JSON string into the race scenario
/// struct.
pub fn read_race_scenario(filepath: &Path) -> anyhow::Result<RaceScenario> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open race scenario file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse race scenario file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// Read simulation constants (synthesizer tuning, stat gain table) from a JSON file. Missing keys
/// keep their default values.
pub fn read_sim_constants(filepath: &Path) -> anyhow::Result<SimConstants> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open simulation constants file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse simulation constants file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}
