use crate::core::geo::{haversine, LatLng};
use crate::post::stat_gains::StatGainTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Clear,
    Rain,
    Wind,
    Storm,
    Fog,
}

/// * `kind` - Type of weather
/// * `severity` - (0..1) Strength of the weather
/// * `polygon` - Area covered by the weather, closed implicitly
///
/// The weather zone is advisory: it is reported to consumers but does not influence the motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherZone {
    pub kind: WeatherKind,
    pub severity: f64,
    pub polygon: Vec<LatLng>,
}

impl WeatherZone {
    /// The method checks whether the given position lies inside the zone polygon (even-odd rule
    /// in degree space).
    pub fn contains(&self, pos: &LatLng) -> bool {
        if !pos.is_valid() || self.polygon.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.polygon.len() - 1;

        for i in 0..self.polygon.len() {
            let (a, b) = (&self.polygon[i], &self.polygon[j]);
            if (a.lat > pos.lat) != (b.lat > pos.lat)
                && pos.lng < (b.lng - a.lng) * (pos.lat - a.lat) / (b.lat - a.lat) + a.lng
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// * `start` - Release point shared by all entities
/// * `home_bases` - Loft positions, selected per entity by `RaceScript::home_base_index`
/// * `total_distance` - (m) Baseline distance every entity has to cover (before overshoots)
/// * `weather_zone` - Advisory weather information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    pub start: LatLng,
    pub home_bases: Vec<LatLng>,
    pub total_distance: f64,
    #[serde(default)]
    pub weather_zone: Option<WeatherZone>,
}

impl RaceConfig {
    /// The method returns the loft for the given index if it exists and is a valid position.
    pub fn home_base(&self, home_base_index: usize) -> Option<&LatLng> {
        self.home_bases
            .get(home_base_index)
            .filter(|home| home.is_valid())
    }

    /// The method returns the great-circle length of the route from the start to the given loft.
    pub fn route_distance(&self, home_base_index: usize) -> Option<f64> {
        if !self.start.is_valid() {
            return None;
        }
        self.home_base(home_base_index)
            .map(|home| haversine(&self.start, home))
    }
}

/// SimConstants bundles the tuning constants of the position synthesizer and the post-race
/// processing. All values have defaults, a JSON file may override any subset.
///
/// * `loiter_duration` - (s) Duration of the orientation phase above the start
/// * `loiter_radius` - (deg) Radius of the orientation circle
/// * `loiter_angular_speed` - (rad/s) Angular speed on the orientation circle
/// * `loiter_wobble` - (-) Relative radius wobble on the orientation circle
/// * `loiter_wobble_freq` - (rad/s) Frequency of the radius wobble
/// * `group_wobble_amp` - (deg) Maximum lateral wobble of a flock
/// * `group_wobble_freq` - (rad/s) Frequency of the flock wobble
/// * `individual_wobble_amp` - (deg) Maximum lateral wobble of a single bird
/// * `individual_wobble_freq` - (rad/s) Frequency of the single bird wobble
/// * `leaders_threshold` - Leadership above which a bird flies with the leaders
/// * `main_threshold` - Leadership above which a bird flies with the main flock
/// * `stat_gains` - Post-race stat gain table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConstants {
    pub loiter_duration: f64,
    pub loiter_radius: f64,
    pub loiter_angular_speed: f64,
    pub loiter_wobble: f64,
    pub loiter_wobble_freq: f64,
    pub group_wobble_amp: f64,
    pub group_wobble_freq: f64,
    pub individual_wobble_amp: f64,
    pub individual_wobble_freq: f64,
    pub leaders_threshold: f64,
    pub main_threshold: f64,
    pub stat_gains: StatGainTable,
}

impl Default for SimConstants {
    fn default() -> Self {
        SimConstants {
            loiter_duration: 30.0,
            loiter_radius: 0.003,
            loiter_angular_speed: 0.35,
            loiter_wobble: 0.25,
            loiter_wobble_freq: 1.7,
            group_wobble_amp: 0.02,
            group_wobble_freq: 0.004,
            individual_wobble_amp: 0.006,
            individual_wobble_freq: 0.021,
            leaders_threshold: 70.0,
            main_threshold: 50.0,
            stat_gains: StatGainTable::default(),
        }
    }
}
