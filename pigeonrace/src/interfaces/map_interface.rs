use crate::core::flight::FlightState;
use crate::core::geo::LatLng;
use crate::core::progress::VisualState;
use crate::core::race::RaceConfig;
use crate::core::standings::StandingRow;
use crate::post::stat_gains::StatGain;
use serde::Serialize;

pub const MAX_UPDATE_FREQUENCY: f64 = 20.0;

/// EntityMapState is everything a map layer needs to draw one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMapState {
    pub entity_id: String,
    pub position: LatLng,
    pub group_id: Option<String>,
    pub visual_state: VisualState,
    pub in_weather_zone: bool,
}

impl EntityMapState {
    pub fn from_flight_state(flight_state: FlightState, race_config: &RaceConfig) -> Self {
        let in_weather_zone = race_config
            .weather_zone
            .as_ref()
            .map_or(false, |zone| zone.contains(&flight_state.position));

        EntityMapState {
            entity_id: flight_state.entity_id,
            position: flight_state.position,
            group_id: flight_state.group_id,
            visual_state: flight_state.visual_state,
            in_weather_zone,
        }
    }
}

/// RaceSnapshot bundles map and standings at one race time, such that both consumers always show
/// the same state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RaceSnapshot {
    pub t: f64,
    pub entity_states: Vec<EntityMapState>,
    pub standings: Vec<StandingRow>,

    // stat gains payload (sent once when the replay finishes)
    pub final_gains: Option<Vec<StatGain>>,
}
