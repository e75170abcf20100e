use crate::core::event::RaceScript;
use crate::core::geo::{haversine, interpolate, LatLng};
use crate::core::progress::{integrate_from, Progress, VisualState};
use crate::core::race::{RaceConfig, SimConstants};
use crate::core::seed::phase;
use crate::core::stats::EntityStats;
use crate::core::timeline::{normalize, TimelineEntry, TimelineEvent};
use crate::interfaces::observer::{DegradedInput, NoopObserver, SimObserver};
use helpers::general::clamp01;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

const GROUP_DOMAIN: &[u8] = b"PIGEONRACE_GROUP_V1";
const ENTITY_DOMAIN: &[u8] = b"PIGEONRACE_ENTITY_V1";
const LOITER_DOMAIN: &[u8] = b"PIGEONRACE_LOITER_V1";

/// FlightState is the renderable state of one entity at a query time.
///
/// * `position` - Map position, `LatLng::INVALID` while the marker must not be rendered
/// * `group_id` - Flock the entity currently flies with, `None` when flying solo
/// * `visual_state` - Rendering category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub entity_id: String,
    pub position: LatLng,
    pub group_id: Option<String>,
    pub visual_state: VisualState,
}

/// Flock band of an entity, decided by its hidden leadership stat alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlockBand {
    Leaders,
    Main,
    Followers,
}

impl FlockBand {
    pub fn for_leadership(leadership: Option<f64>, sim_consts: &SimConstants) -> FlockBand {
        match leadership {
            Some(l) if l > sim_consts.leaders_threshold => FlockBand::Leaders,
            Some(l) if l > sim_consts.main_threshold => FlockBand::Main,
            _ => FlockBand::Followers,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlockBand::Leaders => "leaders",
            FlockBand::Main => "main",
            FlockBand::Followers => "followers",
        }
    }
}

/// band_group_id returns the flock an entity joins by default, e.g. "2-leaders" for a leader
/// heading to home base 2. No other entity is consulted.
pub fn band_group_id(
    home_base_index: usize,
    stats: &EntityStats,
    sim_consts: &SimConstants,
) -> String {
    format!(
        "{}-{}",
        home_base_index,
        FlockBand::for_leadership(stats.leadership, sim_consts).as_str()
    )
}

/// resolve_group_id returns the flock at time t: the banded default, replaced by the latest
/// `JoinedGroup` and cleared by a `LeftGroup`.
fn resolve_group_id(
    timeline: &[TimelineEntry],
    default_group: String,
    t: f64,
) -> Option<String> {
    let mut group_id = Some(default_group);

    for entry in timeline.iter() {
        if entry.t > t {
            break;
        }
        match &entry.event {
            TimelineEvent::JoinedGroup { group_id: joined } => group_id = Some(joined.to_owned()),
            TimelineEvent::LeftGroup => group_id = None,
            _ => {}
        }
    }

    group_id
}

// -------------------------------------------------------------------------------------------------
// MAIN METHODS ------------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

/// compute_flight_state returns position, flock, and visual state of an entity at race time t using
/// the default simulation constants.
pub fn compute_flight_state(
    script: &RaceScript,
    stats: Option<&EntityStats>,
    t: f64,
    race_config: &RaceConfig,
) -> FlightState {
    compute_flight_state_with(
        script,
        stats,
        t,
        race_config,
        &SimConstants::default(),
        &NoopObserver,
    )
}

pub fn compute_flight_state_with(
    script: &RaceScript,
    stats: Option<&EntityStats>,
    t: f64,
    race_config: &RaceConfig,
    sim_consts: &SimConstants,
    observer: &dyn SimObserver,
) -> FlightState {
    let entity_id = script.entity_id.as_str();

    // check inputs -> any invalid input results in a marker resting at the start
    if !race_config.start.is_valid() {
        observer.degraded_input(entity_id, &DegradedInput::InvalidStart);
        return degraded_state(entity_id, race_config);
    }
    if t.is_nan() || t < 0.0 {
        observer.degraded_input(entity_id, &DegradedInput::InvalidTime { t });
        return degraded_state(entity_id, race_config);
    }
    let stats = match stats {
        Some(stats) => stats,
        None => {
            observer.degraded_input(entity_id, &DegradedInput::MissingStats);
            return degraded_state(entity_id, race_config);
        }
    };
    let home = match race_config.home_base(script.home_base_index) {
        Some(home) => *home,
        None => {
            observer.degraded_input(
                entity_id,
                &DegradedInput::InvalidHomeBase {
                    index: script.home_base_index,
                },
            );
            return degraded_state(entity_id, race_config);
        }
    };

    let timeline = normalize(script);
    let group_id = resolve_group_id(
        &timeline,
        band_group_id(script.home_base_index, stats, sim_consts),
        t,
    );

    // loiter phase -> circle above the start regardless of the script
    if t < sim_consts.loiter_duration {
        return FlightState {
            entity_id: entity_id.to_owned(),
            position: loiter_position(&race_config.start, entity_id, t, sim_consts),
            group_id,
            visual_state: VisualState::Normal,
        };
    }

    // transit phase
    let route = haversine(&race_config.start, &home);
    let mut progress = integrate_from(
        &timeline,
        stats.usable_speed(),
        route,
        sim_consts.loiter_duration,
        t,
    );
    if progress.ignored_events > 0 {
        observer.ignored_events(entity_id, progress.ignored_events);
    }
    if let Some(t_fin) = script.authoritative_finish() {
        if t >= t_fin {
            progress.finished = true;
            progress.lost = false;
            progress.strayed = false;
            progress.overshot = false;
        }
    }

    let visual_state = progress.visual_state();
    let position = match visual_state {
        VisualState::Dead | VisualState::Lost => LatLng::INVALID,
        VisualState::Finished => home,
        _ => {
            let on_route = route_position(&race_config.start, &home, route, &progress);
            let lateral = wobble(
                entity_id,
                group_id.as_deref(),
                stats,
                t - sim_consts.loiter_duration,
                &progress,
                sim_consts,
            );
            apply_lateral(&on_route, &race_config.start, &home, lateral)
        }
    };

    FlightState {
        entity_id: entity_id.to_owned(),
        position,
        group_id,
        visual_state,
    }
}

/// compute_map_frame returns the flight states of all entities at race time t in input order. The
/// entities are independent of each other and are evaluated in parallel.
pub fn compute_map_frame(
    scripts: &[RaceScript],
    stats: &HashMap<String, EntityStats>,
    t: f64,
    race_config: &RaceConfig,
    sim_consts: &SimConstants,
    observer: &dyn SimObserver,
) -> Vec<FlightState> {
    scripts
        .par_iter()
        .map(|script| {
            compute_flight_state_with(
                script,
                stats.get(&script.entity_id),
                t,
                race_config,
                sim_consts,
                observer,
            )
        })
        .collect()
}

// -------------------------------------------------------------------------------------------------
// METHODS (HELPERS) -------------------------------------------------------------------------------
// -------------------------------------------------------------------------------------------------

fn degraded_state(entity_id: &str, race_config: &RaceConfig) -> FlightState {
    FlightState {
        entity_id: entity_id.to_owned(),
        position: if race_config.start.is_valid() {
            race_config.start
        } else {
            LatLng::ORIGIN
        },
        group_id: None,
        visual_state: VisualState::Normal,
    }
}

/// loiter_position returns the position on the orientation circle above the start. Every entity
/// circles with its own phase so that the flock does not stack on a single point.
fn loiter_position(start: &LatLng, entity_id: &str, t: f64, sim_consts: &SimConstants) -> LatLng {
    let phase_0 = phase(LOITER_DOMAIN, entity_id);
    let angle = phase_0 + sim_consts.loiter_angular_speed * t;
    let radius = sim_consts.loiter_radius
        * (1.0 + sim_consts.loiter_wobble * (sim_consts.loiter_wobble_freq * t + phase_0).sin());

    // degrees of longitude shrink towards the poles
    let lng_scale = start.lat.to_radians().cos().max(0.1);

    start.offset(radius * angle.sin(), radius * angle.cos() / lng_scale)
}

/// route_position maps the travelled distance onto the straight line from start to home. Distance
/// beyond the route length belongs to an overshoot and is drawn as a leg past the home base and
/// back.
fn route_position(start: &LatLng, home: &LatLng, route: f64, progress: &Progress) -> LatLng {
    if route <= 0.0 {
        return *home;
    }

    let travelled = progress.distance_travelled;
    if travelled <= route {
        return interpolate(start, home, travelled / route);
    }

    let extra = (progress.total_distance - route).max(0.0);
    let excess = travelled - route;
    let leg = if excess <= extra / 2.0 {
        excess
    } else {
        (extra - excess).max(0.0)
    };

    interpolate(start, home, 1.0 + leg / route)
}

/// wobble returns the lateral offset in degrees. It consists of a flock component shared by all
/// members of a group and an individual component, both scaled by the entity's lack of discipline.
/// The offset fades out at both ends of the route so that start and home are hit exactly.
fn wobble(
    entity_id: &str,
    group_id: Option<&str>,
    stats: &EntityStats,
    flight_time: f64,
    progress: &Progress,
    sim_consts: &SimConstants,
) -> f64 {
    let scale = 1.0 - stats.discipline();
    let fade = (PI * clamp01(progress.fraction())).sin();

    let group_part = match group_id {
        Some(group_id) => {
            sim_consts.group_wobble_amp
                * (sim_consts.group_wobble_freq * flight_time + phase(GROUP_DOMAIN, group_id))
                    .sin()
        }
        None => 0.0,
    };
    let individual_part = sim_consts.individual_wobble_amp
        * (sim_consts.individual_wobble_freq * flight_time + phase(ENTITY_DOMAIN, entity_id))
            .sin();

    (group_part + individual_part) * scale * fade
}

/// apply_lateral shifts a position perpendicular to the start-home direction.
fn apply_lateral(pos: &LatLng, start: &LatLng, home: &LatLng, lateral: f64) -> LatLng {
    let d_lat = home.lat - start.lat;
    let d_lng = home.lng - start.lng;
    let norm = (d_lat * d_lat + d_lng * d_lng).sqrt();

    if norm <= 0.0 || lateral == 0.0 {
        return *pos;
    }

    pos.offset(-d_lng / norm * lateral, d_lat / norm * lateral)
}
