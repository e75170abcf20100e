use crate::core::timeline::{TimelineEntry, TimelineEvent};
use serde::{Deserialize, Serialize};

/// VisualState is the discrete state category shared by the map and the standings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    Normal,
    Strayed,
    Overshot,
    Lost,
    Dead,
    Finished,
}

impl VisualState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualState::Normal => "normal",
            VisualState::Strayed => "strayed",
            VisualState::Overshot => "overshot",
            VisualState::Lost => "lost",
            VisualState::Dead => "dead",
            VisualState::Finished => "finished",
        }
    }

    /// True if the entity has no renderable position in this state.
    pub fn hides_marker(&self) -> bool {
        matches!(self, VisualState::Lost | VisualState::Dead)
    }
}

impl std::fmt::Display for VisualState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress is the integrated race state of one entity at a query time.
///
/// * `distance_travelled` - (m) Cumulative forward motion, capped at `total_distance`
/// * `total_distance` - (m) Distance to cover including all overshoot inflation
/// * `distance_left` - (m) Remaining distance, never negative
/// * `velocity` - (m/s) Average velocity since race start
/// * `overshot` - Entity is beyond the baseline distance, flying the extra distance back
/// * `t_finished` - (s) Time at which the entity reached its loft, if it did
/// * `ignored_events` - Number of events up to the query time skipped after death or finish
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub distance_travelled: f64,
    pub total_distance: f64,
    pub distance_left: f64,
    pub velocity: f64,
    pub strayed: bool,
    pub overshot: bool,
    pub lost: bool,
    pub dead: bool,
    pub finished: bool,
    pub t_finished: Option<f64>,
    pub ignored_events: usize,
}

impl Progress {
    /// The method returns the visual state derived from the flags. Precedence is dead, finished,
    /// lost, strayed, overshot, normal.
    pub fn visual_state(&self) -> VisualState {
        if self.dead {
            VisualState::Dead
        } else if self.finished {
            VisualState::Finished
        } else if self.lost {
            VisualState::Lost
        } else if self.strayed {
            VisualState::Strayed
        } else if self.overshot {
            VisualState::Overshot
        } else {
            VisualState::Normal
        }
    }

    /// Fraction of the total distance covered, in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.total_distance > 0.0 {
            (self.distance_travelled / self.total_distance).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// ProgressIntegrator holds the sweep state while walking a timeline from left to right.
#[derive(Debug)]
struct ProgressIntegrator {
    speed: f64,
    departure: f64,
    base_distance: f64,
    total_distance: f64,
    distance_travelled: f64,
    pause_count: u32,
    lost: bool,
    dead: bool,
    t_finished: Option<f64>,
}

impl ProgressIntegrator {
    fn is_over(&self) -> bool {
        self.dead || self.t_finished.is_some()
    }

    fn is_moving(&self) -> bool {
        self.pause_count == 0 && !self.lost && !self.dead && self.t_finished.is_none()
    }

    /// accrue adds the distance flown between t_from and t_to, considering the departure time and
    /// the distance cap.
    fn accrue(&mut self, t_from: f64, t_to: f64) {
        let t_a = t_from.max(self.departure);
        if t_to <= t_a || !self.is_moving() || self.speed <= 0.0 || self.total_distance <= 0.0 {
            return;
        }

        let d_left = self.total_distance - self.distance_travelled;
        let d_step = self.speed * (t_to - t_a);

        if d_step >= d_left {
            self.distance_travelled = self.total_distance;
            self.t_finished = Some(t_a + d_left.max(0.0) / self.speed);
        } else {
            self.distance_travelled += d_step;
        }
    }

    fn apply(&mut self, t: f64, event: &TimelineEvent) {
        match event {
            TimelineEvent::Strayed => self.pause_count += 1,
            TimelineEvent::StrayedEnd => self.pause_count = self.pause_count.saturating_sub(1),
            TimelineEvent::Lost => self.lost = true,
            TimelineEvent::Returned => self.lost = false,
            TimelineEvent::Accident | TimelineEvent::Death => self.dead = true,
            TimelineEvent::Overshot { distance } => self.total_distance += distance,
            TimelineEvent::MiracleFinish => {
                self.distance_travelled = self.total_distance;
                self.t_finished = Some(t);
                self.lost = false;
                self.pause_count = 0;
            }
            TimelineEvent::JoinedGroup { .. } | TimelineEvent::LeftGroup => {}
        }
    }
}

/// integrate computes the progress of an entity at query time t, starting at race time 0.
pub fn integrate(timeline: &[TimelineEntry], speed: f64, total_distance: f64, t: f64) -> Progress {
    integrate_from(timeline, speed, total_distance, 0.0, t)
}

/// integrate_from computes the progress of an entity at query time t. Distance only accrues after
/// the departure time while the entity is neither paused, lost, dead, nor finished. Arrival, a
/// `MiracleFinish`, an `Accident`, and a `Death` end the race: later events are ignored and counted
/// in `ignored_events`.
///
/// The entity is overshot while it has flown past the baseline distance but not yet covered the
/// extra distance of its overshoots.
///
/// Invalid inputs degrade instead of failing: negative or NaN times are treated as 0, a non-positive
/// or NaN speed or distance results in no progress.
pub fn integrate_from(
    timeline: &[TimelineEntry],
    speed: f64,
    total_distance: f64,
    departure: f64,
    t: f64,
) -> Progress {
    let t = sanitize_time(t);
    let base_distance = if total_distance.is_finite() {
        total_distance.max(0.0)
    } else {
        0.0
    };
    let mut integrator = ProgressIntegrator {
        speed: if speed.is_finite() { speed.max(0.0) } else { 0.0 },
        departure: sanitize_time(departure),
        base_distance,
        total_distance: base_distance,
        distance_travelled: 0.0,
        pause_count: 0,
        lost: false,
        dead: false,
        t_finished: None,
    };
    let mut ignored_events = 0;
    let mut t_prev = 0.0_f64;

    for entry in timeline.iter() {
        if entry.t > t {
            break;
        }
        if integrator.is_over() {
            ignored_events += 1;
            continue;
        }

        integrator.accrue(t_prev, entry.t);
        t_prev = t_prev.max(entry.t);

        // arrival during the last interval
        if integrator.is_over() {
            ignored_events += 1;
            continue;
        }
        integrator.apply(entry.t, &entry.event);
    }
    integrator.accrue(t_prev, t);

    let distance_travelled = integrator.distance_travelled.min(integrator.total_distance);

    Progress {
        distance_travelled,
        total_distance: integrator.total_distance,
        distance_left: (integrator.total_distance - distance_travelled).max(0.0),
        velocity: if t > 0.0 { distance_travelled / t } else { 0.0 },
        strayed: integrator.pause_count > 0,
        overshot: integrator.t_finished.is_none()
            && distance_travelled > integrator.base_distance,
        lost: integrator.lost,
        dead: integrator.dead,
        finished: integrator.t_finished.is_some(),
        t_finished: integrator.t_finished,
        ignored_events,
    }
}

/// sanitize_time maps negative and NaN query times to 0.
pub fn sanitize_time(t: f64) -> f64 {
    if t.is_nan() || t < 0.0 {
        0.0
    } else {
        t
    }
}
