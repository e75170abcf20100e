use crate::core::event::{Outcome, RaceEvent, RaceScript};
use crate::core::geo::{haversine, LatLng};
use crate::core::progress::integrate;
use crate::core::race::{RaceConfig, WeatherKind, WeatherZone};
use crate::core::stats::EntityStats;
use crate::core::timeline::normalize;
use crate::pre::read_sim_pars::RaceScenario;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

/// * `no_entities` - Number of pigeons in the race
/// * `speed_mean` - (m/s) Mean base speed
/// * `speed_std` - (m/s) Standard deviation of the base speed
/// * `p_stray` - Probability of a stray window per entity
/// * `p_overshoot` - Probability of an overshoot per entity
/// * `p_lost` - Probability of getting lost per entity
/// * `p_return` - Probability that a lost entity returns
/// * `p_accident` - Probability of an accident per entity
/// * `p_death` - Probability that an accident is fatal
#[derive(Debug, Clone)]
pub struct ScriptGenPars {
    pub no_entities: usize,
    pub speed_mean: f64,
    pub speed_std: f64,
    pub p_stray: f64,
    pub p_overshoot: f64,
    pub p_lost: f64,
    pub p_return: f64,
    pub p_accident: f64,
    pub p_death: f64,
}

impl ScriptGenPars {
    /// The method checks the generator parameters, probabilities must lie in [0, 1].
    pub fn check(&self) -> anyhow::Result<()> {
        if self.no_entities == 0 {
            anyhow::bail!("Demo race requires at least one entity!");
        }
        if !self.speed_mean.is_finite() || self.speed_mean <= 0.0 {
            anyhow::bail!("Mean speed must be positive (got {})!", self.speed_mean);
        }
        if !self.speed_std.is_finite() || self.speed_std < 0.0 {
            anyhow::bail!(
                "Speed standard deviation must not be negative (got {})!",
                self.speed_std
            );
        }

        let probabilities = [
            ("p_stray", self.p_stray),
            ("p_overshoot", self.p_overshoot),
            ("p_lost", self.p_lost),
            ("p_return", self.p_return),
            ("p_accident", self.p_accident),
            ("p_death", self.p_death),
        ];
        for (name, p) in probabilities.iter() {
            if !(0.0..=1.0).contains(p) {
                anyhow::bail!("Probability {} must lie in [0, 1] (got {})!", name, p);
            }
        }

        Ok(())
    }
}

impl Default for ScriptGenPars {
    fn default() -> Self {
        ScriptGenPars {
            no_entities: 12,
            speed_mean: 18.0,
            speed_std: 2.0,
            p_stray: 0.4,
            p_overshoot: 0.2,
            p_lost: 0.15,
            p_return: 0.6,
            p_accident: 0.05,
            p_death: 0.5,
        }
    }
}

/// demo_race_config returns a release point in Brussels with three lofts in the east of Belgium.
pub fn demo_race_config() -> RaceConfig {
    let start = LatLng::new(50.85, 4.35);
    let home_bases = vec![
        LatLng::new(51.2, 5.4),
        LatLng::new(50.63, 5.57),
        LatLng::new(50.93, 5.34),
    ];
    let total_distance = haversine(&start, &home_bases[0]).round();

    RaceConfig {
        start,
        home_bases,
        total_distance,
        weather_zone: Some(WeatherZone {
            kind: WeatherKind::Rain,
            severity: 0.4,
            polygon: vec![
                LatLng::new(50.8, 4.8),
                LatLng::new(51.1, 4.8),
                LatLng::new(51.1, 5.1),
                LatLng::new(50.8, 5.1),
            ],
        }),
    }
}

/// generate_scenario creates a reproducible race scenario from a seed. The outcome of every script
/// is consistent with its events, finishers carry the finish time the integrator derives.
pub fn generate_scenario(seed: u64, pars: &ScriptGenPars) -> anyhow::Result<RaceScenario> {
    pars.check()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let speed_distr = Normal::new(pars.speed_mean, pars.speed_std)?;
    let stat_distr = Normal::<f64>::new(60.0, 15.0)?;
    let race_config = demo_race_config();

    let mut scripts = Vec::with_capacity(pars.no_entities);
    let mut stats = HashMap::with_capacity(pars.no_entities);

    for i in 0..pars.no_entities {
        let entity_id = format!("pigeon-{:02}", i + 1);

        let speed = speed_distr.sample(&mut rng).max(5.0);
        let mut sample_stat = || stat_distr.sample(&mut rng).clamp(0.0, 100.0);
        let entity_stats = EntityStats {
            speed,
            focus: sample_stat(),
            navigation: sample_stat(),
            sky_iq: sample_stat(),
            endurance: sample_stat(),
            wind_resistance: sample_stat(),
            experience: 0.0,
            leadership: Some(sample_stat()),
            race_start: None,
        };

        // nominal flight time without any incidents
        let t_nominal = race_config.total_distance / entity_stats.speed;
        let mut events = Vec::new();
        let mut outcome = None;

        if rng.gen_bool(pars.p_stray) {
            events.push(RaceEvent::Strayed {
                t: rng.gen_range(0.1..0.8) * t_nominal,
                duration: rng.gen_range(60.0..600.0),
            });
        }
        if rng.gen_bool(pars.p_overshoot) {
            events.push(RaceEvent::Overshot {
                t: rng.gen_range(0.5..0.95) * t_nominal,
                distance: rng.gen_range(500.0..5000.0),
            });
        }
        if rng.gen_bool(pars.p_lost) {
            let t_lost = rng.gen_range(0.2..0.9) * t_nominal;
            events.push(RaceEvent::Lost { t: t_lost });
            if rng.gen_bool(pars.p_return) {
                events.push(RaceEvent::Returned {
                    t: t_lost + rng.gen_range(300.0..3600.0),
                });
            } else {
                outcome = Some(Outcome::Lost);
            }
        }
        if outcome.is_none() && rng.gen_bool(pars.p_accident) {
            let t_accident = rng.gen_range(0.1..0.9) * t_nominal;
            // drop everything after the accident to keep the script valid
            events.retain(|event| event.t() < t_accident);
            if rng.gen_bool(pars.p_death) {
                events.push(RaceEvent::Death { t: t_accident });
                outcome = Some(Outcome::Dead);
            } else {
                events.push(RaceEvent::Accident { t: t_accident });
                outcome = Some(Outcome::Injured);
            }
        }

        let mut script = RaceScript {
            entity_id: entity_id.to_owned(),
            events,
            outcome: outcome.unwrap_or(Outcome::Finished),
            finish_time: None,
            home_base_index: i % race_config.home_bases.len(),
        };

        if script.outcome == Outcome::Finished {
            let progress = integrate(
                &normalize(&script),
                entity_stats.speed,
                race_config.total_distance,
                f64::MAX,
            );
            match progress.t_finished {
                Some(t_fin) => script.finish_time = Some(t_fin),
                None => script.outcome = Outcome::Dnf,
            }
        }

        scripts.push(script);
        stats.insert(entity_id, entity_stats);
    }

    log::debug!(
        "Generated scenario with {} entities from seed {}",
        pars.no_entities,
        seed
    );

    Ok(RaceScenario {
        race_config,
        scripts,
        stats,
    })
}
