use crate::core::event::{Outcome, RaceScript};
use serde::{Deserialize, Serialize};

/// Stat increase granted after a race.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainDelta {
    pub experience: f64,
    pub racing: f64,
}

impl GainDelta {
    pub const fn new(experience: f64, racing: f64) -> GainDelta {
        GainDelta { experience, racing }
    }
}

/// StatGainTable maps every race outcome to its stat gain. Outcomes mapped to `None` receive no gain
/// and are left out of the result entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatGainTable {
    pub finished: Option<GainDelta>,
    pub dnf: Option<GainDelta>,
    pub lost: Option<GainDelta>,
    pub returned: Option<GainDelta>,
    pub injured: Option<GainDelta>,
    pub dead: Option<GainDelta>,
}

impl Default for StatGainTable {
    fn default() -> Self {
        StatGainTable {
            finished: Some(GainDelta::new(0.12, 0.12)),
            dnf: Some(GainDelta::new(0.04, 0.04)),
            lost: Some(GainDelta::new(0.04, 0.04)),
            returned: Some(GainDelta::new(0.04, 0.04)),
            injured: None,
            dead: None,
        }
    }
}

impl StatGainTable {
    pub fn gain_for(&self, outcome: Outcome) -> Option<GainDelta> {
        match outcome {
            Outcome::Finished => self.finished,
            Outcome::Dnf => self.dnf,
            Outcome::Lost => self.lost,
            Outcome::Returned => self.returned,
            Outcome::Injured => self.injured,
            Outcome::Dead => self.dead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatGain {
    pub entity_id: String,
    pub experience: f64,
    pub racing: f64,
}

/// compute_stat_gains derives the post-race stat gains of all entities from their outcomes using the
/// default gain table. Entities without gain (dead, injured) are excluded. Input order is kept.
pub fn compute_stat_gains(scripts: &[RaceScript]) -> Vec<StatGain> {
    compute_stat_gains_with(scripts, &StatGainTable::default())
}

pub fn compute_stat_gains_with(scripts: &[RaceScript], table: &StatGainTable) -> Vec<StatGain> {
    scripts
        .iter()
        .filter_map(|script| {
            table.gain_for(script.outcome).map(|gain| StatGain {
                entity_id: script.entity_id.to_owned(),
                experience: gain.experience,
                racing: gain.racing,
            })
        })
        .collect()
}
