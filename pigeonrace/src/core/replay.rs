use crate::core::flight::compute_map_frame;
use crate::core::race::SimConstants;
use crate::core::standings::compute_standings_with;
use crate::interfaces::map_interface::{EntityMapState, RaceSnapshot, MAX_UPDATE_FREQUENCY};
use crate::interfaces::observer::SimObserver;
use crate::post::stat_gains::compute_stat_gains_with;
use crate::pre::read_sim_pars::RaceScenario;
use anyhow::Context;
use flume::Sender;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// build_snapshot evaluates map and standings of the whole field at race time t.
pub fn build_snapshot(
    scenario: &RaceScenario,
    t: f64,
    sim_consts: &SimConstants,
    observer: &dyn SimObserver,
) -> RaceSnapshot {
    let entity_states = compute_map_frame(
        &scenario.scripts,
        &scenario.stats,
        t,
        &scenario.race_config,
        sim_consts,
        observer,
    )
    .into_iter()
    .map(|flight_state| EntityMapState::from_flight_state(flight_state, &scenario.race_config))
    .collect();

    let standings = compute_standings_with(
        &scenario.scripts,
        &scenario.stats,
        t,
        &scenario.race_config,
        observer,
    );

    RaceSnapshot {
        t,
        entity_states,
        standings,
        final_gains: None,
    }
}

/// handle_replay steps through the race from t_start to t_end and sends snapshots to the consumer
/// in real-time (scaled by the real-time factor). When the end is reached, a final snapshot
/// containing the stat gains is sent once.
pub fn handle_replay(
    scenario: &RaceScenario,
    sim_consts: &SimConstants,
    t_start: f64,
    t_end: f64,
    timestep_size: f64,
    realtime_factor: f64,
    tx: &Sender<RaceSnapshot>,
    observer: &dyn SimObserver,
) -> anyhow::Result<()> {
    if !(timestep_size > 0.0) || !(realtime_factor > 0.0) {
        anyhow::bail!(
            "Replay requires a positive time step size and real-time factor (got {} and {})!",
            timestep_size,
            realtime_factor
        );
    }

    let mut t_race = t_start.max(0.0);
    let mut t_race_update_print = t_race;
    let mut t_race_update_snapshot = f64::NEG_INFINITY;

    while t_race < t_end {
        let t_step_start = Instant::now();

        if t_race > t_race_update_print + 59.9999 {
            log::info!("Replaying... Current race time is {:.3}s", t_race);
            t_race_update_print = t_race;
        }

        if t_race > t_race_update_snapshot + 1.0 / MAX_UPDATE_FREQUENCY - 0.001 {
            tx.send(build_snapshot(scenario, t_race, sim_consts, observer))
                .context("Failed to send race snapshot to the consumer!")?;
            t_race_update_snapshot = t_race;
        }

        // sleep until time step is finished in real-time as well (calculation in ms)
        let t_sleep = (timestep_size * 1000.0 / realtime_factor) as i64
            - t_step_start.elapsed().as_millis() as i64;

        if t_sleep > 0 {
            sleep(Duration::from_millis(t_sleep as u64));
        } else {
            log::warn!("Could not keep up with real-time!")
        }

        t_race += timestep_size;
    }

    // after the real-time loop finishes, send the final state once
    let mut final_snapshot = build_snapshot(scenario, t_end.max(0.0), sim_consts, observer);
    final_snapshot.final_gains = Some(compute_stat_gains_with(
        &scenario.scripts,
        &sim_consts.stat_gains,
    ));
    tx.send(final_snapshot)
        .context("Failed to send final race snapshot to the consumer!")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{Outcome, RaceEvent, RaceScript};
    use crate::core::geo::LatLng;
    use crate::core::progress::VisualState;
    use crate::core::race::{RaceConfig, WeatherKind, WeatherZone};
    use crate::core::stats::EntityStats;
    use crate::interfaces::observer::NoopObserver;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn scenario() -> RaceScenario {
        let mut stats = HashMap::new();
        stats.insert("fin".to_owned(), EntityStats::with_speed(20.0));
        stats.insert("dead".to_owned(), EntityStats::with_speed(15.0));

        RaceScenario {
            race_config: RaceConfig {
                start: LatLng::new(50.0, 4.0),
                home_bases: vec![LatLng::new(50.1, 4.0)],
                total_distance: 11_000.0,
                weather_zone: Some(WeatherZone {
                    kind: WeatherKind::Fog,
                    severity: 0.2,
                    polygon: vec![
                        LatLng::new(49.9, 3.9),
                        LatLng::new(50.01, 3.9),
                        LatLng::new(50.01, 4.1),
                        LatLng::new(49.9, 4.1),
                    ],
                }),
            },
            scripts: vec![
                RaceScript {
                    entity_id: "fin".to_owned(),
                    events: vec![],
                    outcome: Outcome::Finished,
                    finish_time: Some(550.0),
                    home_base_index: 0,
                },
                RaceScript {
                    entity_id: "dead".to_owned(),
                    events: vec![RaceEvent::Death { t: 100.0 }],
                    outcome: Outcome::Dead,
                    finish_time: None,
                    home_base_index: 0,
                },
            ],
            stats,
        }
    }

    #[test]
    fn snapshot_agrees_between_map_and_standings() {
        let scen = scenario();
        let snapshot = build_snapshot(&scen, 200.0, &SimConstants::default(), &NoopObserver);

        assert_relative_eq!(snapshot.t, 200.0);
        assert_eq!(snapshot.entity_states.len(), 2);
        assert_eq!(snapshot.standings.len(), 2);
        assert!(snapshot.final_gains.is_none());

        let dead_map = snapshot
            .entity_states
            .iter()
            .find(|s| s.entity_id == "dead")
            .unwrap();
        let dead_row = snapshot
            .standings
            .iter()
            .find(|r| r.entity_id == "dead")
            .unwrap();
        assert_eq!(dead_map.visual_state, VisualState::Dead);
        assert_eq!(dead_row.state, VisualState::Dead);
        assert!(!dead_map.in_weather_zone);
    }

    #[test]
    fn loitering_entities_are_in_the_weather_zone() {
        let scen = scenario();
        let snapshot = build_snapshot(&scen, 5.0, &SimConstants::default(), &NoopObserver);

        assert!(snapshot.entity_states.iter().all(|s| s.in_weather_zone));
    }

    #[test]
    fn replay_sends_snapshots_and_final_gains() {
        let scen = scenario();
        let (tx, rx) = flume::unbounded();

        handle_replay(
            &scen,
            &SimConstants::default(),
            0.0,
            2.0,
            0.5,
            1000.0,
            &tx,
            &NoopObserver,
        )
        .unwrap();
        drop(tx);

        let snapshots: Vec<RaceSnapshot> = rx.iter().collect();
        assert_eq!(snapshots.len(), 5);
        assert!(snapshots[..4].iter().all(|s| s.final_gains.is_none()));

        let last = snapshots.last().unwrap();
        assert_relative_eq!(last.t, 2.0);
        let gains = last.final_gains.as_ref().unwrap();
        assert_eq!(gains.len(), 1);
        assert_eq!(gains[0].entity_id, "fin");
    }

    #[test]
    fn replay_rejects_invalid_step() {
        let (tx, _rx) = flume::unbounded();
        let res = handle_replay(
            &scenario(),
            &SimConstants::default(),
            0.0,
            10.0,
            0.0,
            1.0,
            &tx,
            &NoopObserver,
        );

        assert!(res.is_err());
    }

    #[test]
    fn replay_fails_without_consumer() {
        let (tx, rx) = flume::unbounded();
        drop(rx);
        let res = handle_replay(
            &scenario(),
            &SimConstants::default(),
            0.0,
            1.0,
            0.5,
            1000.0,
            &tx,
            &NoopObserver,
        );

        assert!(res.is_err());
    }
}
