use serde::{Deserialize, Serialize};

/// RaceEvent is a single scripted occurrence on an entity's race timeline. `t` is always given in
/// seconds since race start.
///
/// * `JoinedGroup` - Entity joins the flock `group_id`
/// * `LeftGroup` - Entity leaves its current flock and flies solo
/// * `Strayed` - (s) Progress pauses for `duration` seconds starting at `t`
/// * `Overshot` - (m) Entity flew past its loft and must cover `distance` extra meters
/// * `Lost` - Progress halts until a matching `Returned`
/// * `Returned` - Clears a `Lost` condition
/// * `Accident` - Progress halts permanently
/// * `Death` - Progress halts permanently
/// * `MiracleFinish` - Entity finishes at `t` regardless of integrated progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceEvent {
    JoinedGroup { t: f64, group_id: String },
    LeftGroup { t: f64 },
    Strayed { t: f64, duration: f64 },
    Overshot { t: f64, distance: f64 },
    Lost { t: f64 },
    Returned { t: f64 },
    Accident { t: f64 },
    Death { t: f64 },
    MiracleFinish { t: f64 },
}

impl RaceEvent {
    /// The method returns the timestamp of the event.
    pub fn t(&self) -> f64 {
        match self {
            RaceEvent::JoinedGroup { t, .. }
            | RaceEvent::LeftGroup { t }
            | RaceEvent::Strayed { t, .. }
            | RaceEvent::Overshot { t, .. }
            | RaceEvent::Lost { t }
            | RaceEvent::Returned { t }
            | RaceEvent::Accident { t }
            | RaceEvent::Death { t }
            | RaceEvent::MiracleFinish { t } => *t,
        }
    }

    /// True for events after which the entity never moves again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RaceEvent::Accident { .. } | RaceEvent::Death { .. } | RaceEvent::MiracleFinish { .. }
        )
    }
}

/// Terminal outcome of an entity's race as decided by the script generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Finished,
    Lost,
    Injured,
    Dead,
    Dnf,
    Returned,
}

/// * `entity_id` - Identifier of the pigeon the script belongs to
/// * `events` - Scripted events, in any order
/// * `outcome` - Terminal outcome of the race
/// * `finish_time` - (s) Authoritative finish time, present iff `outcome` is `Finished`
/// * `home_base_index` - Index into `RaceConfig::home_bases` selecting the entity's loft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceScript {
    pub entity_id: String,
    #[serde(default)]
    pub events: Vec<RaceEvent>,
    pub outcome: Outcome,
    #[serde(default)]
    pub finish_time: Option<f64>,
    #[serde(default)]
    pub home_base_index: usize,
}

impl RaceScript {
    /// The method returns the finish time if the script carries an authoritative finish, i.e. the
    /// outcome is `Finished` and a usable finish time is set.
    pub fn authoritative_finish(&self) -> Option<f64> {
        match (self.outcome, self.finish_time) {
            (Outcome::Finished, Some(t_fin)) if t_fin.is_finite() && t_fin > 0.0 => Some(t_fin),
            _ => None,
        }
    }
}
