use crate::core::event::RaceScript;
use crate::core::progress::{integrate, VisualState};
use crate::core::race::RaceConfig;
use crate::core::stats::EntityStats;
use crate::core::timeline::normalize;
use crate::interfaces::observer::{DegradedInput, NoopObserver, SimObserver};
use helpers::general::{argsort, SortOrder};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// StandingRow is one line of the leaderboard.
///
/// * `velocity` - (m/s) Average velocity since race start
/// * `distance_left` - (m) Remaining distance including overshoot inflation
/// * `speed` - (m/s) Base speed stat of the entity
/// * `state` - Same state category the map shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub entity_id: String,
    pub velocity: f64,
    pub distance_left: f64,
    pub speed: f64,
    pub state: VisualState,
}

/// compute_standings returns the leaderboard at race time t, sorted by velocity in descending order.
/// Entities with equal velocity keep their input order.
pub fn compute_standings(
    scripts: &[RaceScript],
    stats: &HashMap<String, EntityStats>,
    t: f64,
    race_config: &RaceConfig,
) -> Vec<StandingRow> {
    compute_standings_with(scripts, stats, t, race_config, &NoopObserver)
}

pub fn compute_standings_with(
    scripts: &[RaceScript],
    stats: &HashMap<String, EntityStats>,
    t: f64,
    race_config: &RaceConfig,
    observer: &dyn SimObserver,
) -> Vec<StandingRow> {
    let mut rows: Vec<Option<StandingRow>> = scripts
        .par_iter()
        .map(|script| {
            Some(calc_standing_row(
                script,
                stats.get(&script.entity_id),
                t,
                race_config,
                observer,
            ))
        })
        .collect();

    let velocities: Vec<f64> = rows
        .iter()
        .map(|row| row.as_ref().map_or(0.0, |row| row.velocity))
        .collect();

    argsort(&velocities, SortOrder::Descending)
        .into_iter()
        .filter_map(|idx| rows[idx].take())
        .collect()
}

/// calc_standing_row evaluates a single entity. An authoritative finish bypasses the integration
/// completely: the entity is shown as finished with its final average velocity.
fn calc_standing_row(
    script: &RaceScript,
    stats: Option<&EntityStats>,
    t: f64,
    race_config: &RaceConfig,
    observer: &dyn SimObserver,
) -> StandingRow {
    let entity_id = script.entity_id.as_str();

    let speed = match stats {
        Some(stats) => stats.usable_speed(),
        None => {
            observer.degraded_input(entity_id, &DegradedInput::MissingStats);
            0.0
        }
    };

    if let Some(t_fin) = script.authoritative_finish() {
        return StandingRow {
            entity_id: entity_id.to_owned(),
            velocity: finite_or_zero(race_config.total_distance / t_fin),
            distance_left: 0.0,
            speed,
            state: VisualState::Finished,
        };
    }

    if t.is_nan() || t < 0.0 {
        observer.degraded_input(entity_id, &DegradedInput::InvalidTime { t });
    }

    let progress = integrate(&normalize(script), speed, race_config.total_distance, t);
    if progress.ignored_events > 0 {
        observer.ignored_events(entity_id, progress.ignored_events);
    }

    StandingRow {
        entity_id: entity_id.to_owned(),
        velocity: finite_or_zero(progress.velocity),
        distance_left: finite_or_zero(progress.distance_left),
        speed,
        state: progress.visual_state(),
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{Outcome, RaceEvent};
    use crate::core::geo::LatLng;
    use crate::interfaces::observer::testing::RecordingObserver;
    use approx::assert_relative_eq;

    fn config() -> RaceConfig {
        RaceConfig {
            start: LatLng::new(50.0, 4.0),
            home_bases: vec![LatLng::new(51.0, 4.0)],
            total_distance: 1000.0,
            weather_zone: None,
        }
    }

    fn script(entity_id: &str, events: Vec<RaceEvent>) -> RaceScript {
        RaceScript {
            entity_id: entity_id.to_owned(),
            events,
            outcome: Outcome::Dnf,
            finish_time: None,
            home_base_index: 0,
        }
    }

    fn stats_for(entries: &[(&str, f64)]) -> HashMap<String, EntityStats> {
        entries
            .iter()
            .map(|(id, speed)| (id.to_string(), EntityStats::with_speed(*speed)))
            .collect()
    }

    fn row<'a>(rows: &'a [StandingRow], entity_id: &str) -> &'a StandingRow {
        rows.iter().find(|r| r.entity_id == entity_id).unwrap()
    }

    #[test]
    fn pause_overshot_and_lost_windows() {
        let scripts = vec![
            script(
                "stray",
                vec![RaceEvent::Strayed {
                    t: 100.0,
                    duration: 50.0,
                }],
            ),
            script(
                "over",
                vec![RaceEvent::Overshot {
                    t: 100.0,
                    distance: 200.0,
                }],
            ),
            script(
                "lost",
                vec![RaceEvent::Lost { t: 50.0 }, RaceEvent::Returned { t: 100.0 }],
            ),
        ];
        let stats = stats_for(&[("stray", 1.0), ("over", 1.0), ("lost", 1.0)]);
        let rows = compute_standings(&scripts, &stats, 200.0, &config());

        assert_relative_eq!(row(&rows, "stray").distance_left, 850.0);
        assert_relative_eq!(row(&rows, "over").distance_left, 1000.0);
        assert_relative_eq!(row(&rows, "lost").distance_left, 850.0);
        assert_relative_eq!(row(&rows, "over").velocity, 1.0);
        assert_eq!(row(&rows, "over").state, VisualState::Normal);

        // past the baseline, flying the extra distance back
        let rows = compute_standings(&scripts, &stats, 1100.0, &config());
        assert_eq!(row(&rows, "over").state, VisualState::Overshot);
        assert_relative_eq!(row(&rows, "over").distance_left, 100.0);
    }

    #[test]
    fn finish_ends_the_race_in_the_standings() {
        let scripts = vec![
            script(
                "miracle",
                vec![RaceEvent::Lost { t: 50.0 }, RaceEvent::MiracleFinish { t: 100.0 }],
            ),
            script("arrived", vec![RaceEvent::Lost { t: 1500.0 }]),
        ];
        let stats = stats_for(&[("miracle", 1.0), ("arrived", 1.0)]);
        let rows = compute_standings(&scripts, &stats, 2000.0, &config());

        assert_eq!(row(&rows, "miracle").state, VisualState::Finished);
        assert_relative_eq!(row(&rows, "miracle").distance_left, 0.0);
        assert_eq!(row(&rows, "arrived").state, VisualState::Finished);
        assert_relative_eq!(row(&rows, "arrived").distance_left, 0.0);
    }

    #[test]
    fn finish_bypasses_integration() {
        let mut finisher = script("fin", vec![RaceEvent::Lost { t: 10.0 }]);
        finisher.outcome = Outcome::Finished;
        finisher.finish_time = Some(950.0);
        let stats = stats_for(&[("fin", 0.5)]);

        let rows = compute_standings(&[finisher.clone()], &stats, 950.0, &config());
        assert_relative_eq!(rows[0].velocity, 1000.0 / 950.0);
        assert_relative_eq!(rows[0].distance_left, 0.0);
        assert_eq!(rows[0].state, VisualState::Finished);
        assert_relative_eq!(rows[0].speed, 0.5);

        // never caught up by continued simulation
        let rows = compute_standings(&[finisher], &stats, 5000.0, &config());
        assert_relative_eq!(rows[0].velocity, 1000.0 / 950.0);
    }

    #[test]
    fn rows_sorted_by_velocity() {
        let scripts = vec![
            script("slow", vec![]),
            script("fast", vec![]),
            script("mid", vec![]),
        ];
        let stats = stats_for(&[("slow", 1.0), ("fast", 3.0), ("mid", 2.0)]);
        let rows = compute_standings(&scripts, &stats, 100.0, &config());
        let ids: Vec<&str> = rows.iter().map(|r| r.entity_id.as_str()).collect();

        assert_eq!(ids, vec!["fast", "mid", "slow"]);
    }

    #[test]
    fn equal_velocities_keep_input_order() {
        let scripts: Vec<RaceScript> = ["d", "a", "c", "b"]
            .iter()
            .map(|id| script(id, vec![]))
            .collect();
        let stats = stats_for(&[("a", 1.0), ("b", 1.0), ("c", 1.0), ("d", 1.0)]);

        for t in [0.0, 100.0].iter() {
            let rows = compute_standings(&scripts, &stats, *t, &config());
            let ids: Vec<&str> = rows.iter().map(|r| r.entity_id.as_str()).collect();
            assert_eq!(ids, vec!["d", "a", "c", "b"]);
        }
    }

    #[test]
    fn standings_are_deterministic() {
        let scripts = vec![
            script("a", vec![RaceEvent::Death { t: 300.0 }]),
            script(
                "b",
                vec![
                    RaceEvent::Strayed {
                        t: 20.0,
                        duration: 100.0,
                    },
                    RaceEvent::Overshot {
                        t: 50.0,
                        distance: 30.0,
                    },
                ],
            ),
            script("c", vec![RaceEvent::Lost { t: 10.0 }]),
        ];
        let stats = stats_for(&[("a", 1.2), ("b", 1.7), ("c", 0.9)]);

        let first = compute_standings(&scripts, &stats, 421.5, &config());
        let second = compute_standings(&scripts, &stats, 421.5, &config());

        assert_eq!(first, second);
        assert_eq!(row(&first, "a").state, VisualState::Dead);
        assert_eq!(row(&first, "c").state, VisualState::Lost);
    }

    #[test]
    fn missing_stats_degrade_to_zero_velocity() {
        let observer = RecordingObserver::default();
        let rows = compute_standings_with(
            &[script("ghost", vec![])],
            &HashMap::new(),
            100.0,
            &config(),
            &observer,
        );

        assert_relative_eq!(rows[0].velocity, 0.0);
        assert_relative_eq!(rows[0].distance_left, 1000.0);
        assert_relative_eq!(rows[0].speed, 0.0);
        assert_eq!(
            observer.degraded.lock().unwrap()[0],
            ("ghost".to_owned(), DegradedInput::MissingStats)
        );
    }

    #[test]
    fn negative_time_degrades_to_race_start() {
        let stats = stats_for(&[("a", 2.0)]);
        let rows = compute_standings(&[script("a", vec![])], &stats, -10.0, &config());

        assert_relative_eq!(rows[0].velocity, 0.0);
        assert_relative_eq!(rows[0].distance_left, 1000.0);
        assert_eq!(rows[0].state, VisualState::Normal);
    }

    #[test]
    fn distance_left_never_grows_without_overshoot() {
        let scripts = vec![script(
            "a",
            vec![
                RaceEvent::Strayed {
                    t: 100.0,
                    duration: 50.0,
                },
                RaceEvent::Lost { t: 300.0 },
                RaceEvent::Returned { t: 400.0 },
            ],
        )];
        let stats = stats_for(&[("a", 1.0)]);

        let mut prev = f64::INFINITY;
        for i in 0..60 {
            let rows = compute_standings(&scripts, &stats, i as f64 * 25.0, &config());
            assert!(rows[0].distance_left <= prev);
            prev = rows[0].distance_left;
        }
    }
}
