use crate::core::progress::VisualState;
use crate::core::race::SimConstants;
use crate::core::standings::{compute_standings_with, StandingRow};
use crate::interfaces::observer::SimObserver;
use crate::post::stat_gains::{compute_stat_gains_with, StatGain};
use crate::pre::read_sim_pars::RaceScenario;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::Path;

/// RaceResult contains the leaderboards at a set of query times and the post-race stat gains.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceResult {
    pub query_times: Vec<f64>,
    pub standings: Vec<Vec<StandingRow>>,
    pub stat_gains: Vec<StatGain>,
}

/// StandingRecord is a flat standings line as written to the CSV file.
#[derive(Debug, Serialize)]
struct StandingRecord<'a> {
    t: f64,
    rank: usize,
    entity_id: &'a str,
    velocity: f64,
    distance_left: f64,
    speed: f64,
    state: VisualState,
}

impl RaceResult {
    pub fn from_scenario(
        scenario: &RaceScenario,
        query_times: &[f64],
        sim_consts: &SimConstants,
        observer: &dyn SimObserver,
    ) -> RaceResult {
        let standings = query_times
            .iter()
            .map(|&t| {
                compute_standings_with(
                    &scenario.scripts,
                    &scenario.stats,
                    t,
                    &scenario.race_config,
                    observer,
                )
            })
            .collect();

        RaceResult {
            query_times: query_times.to_vec(),
            standings,
            stat_gains: compute_stat_gains_with(&scenario.scripts, &sim_consts.stat_gains),
        }
    }

    /// distance_left_series returns the remaining distance of every entity over the query times,
    /// ordered by entity id.
    pub fn distance_left_series(&self) -> Vec<(String, Vec<(f64, f64)>)> {
        let mut series: Vec<(String, Vec<(f64, f64)>)> = Vec::new();

        for (t, rows) in self.query_times.iter().zip(self.standings.iter()) {
            for row in rows.iter() {
                match series.iter_mut().find(|(id, _)| *id == row.entity_id) {
                    Some((_, points)) => points.push((*t, row.distance_left)),
                    None => series.push((row.entity_id.to_owned(), vec![(*t, row.distance_left)])),
                }
            }
        }

        series.sort_by(|a, b| a.0.cmp(&b.0));
        series
    }

    fn format_standings(&self) -> Result<String, std::fmt::Error> {
        let mut content = String::new();

        for (t, rows) in self.query_times.iter().zip(self.standings.iter()) {
            writeln!(&mut content, "RESULT: Standings at {:.1}s", t)?;
            writeln!(
                &mut content,
                "pos, {:>12}, {:>9}, {:>12}, {:>7}, state",
                "entity", "v (m/s)", "left (m)", "speed"
            )?;
            for (i, row) in rows.iter().enumerate() {
                writeln!(
                    &mut content,
                    "{:3}, {:>12}, {:9.3}, {:12.1}, {:7.2}, {}",
                    i + 1,
                    row.entity_id,
                    row.velocity,
                    row.distance_left,
                    row.speed,
                    row.state
                )?;
            }
            writeln!(&mut content)?;
        }

        writeln!(&mut content, "RESULT: Stat gains")?;
        for gain in self.stat_gains.iter() {
            writeln!(
                &mut content,
                "{:>12}, experience {:+.2}, racing {:+.2}",
                gain.entity_id, gain.experience, gain.racing
            )?;
        }

        Ok(content)
    }

    /// print_standings prints the leaderboards and stat gains to the console output.
    pub fn print_standings(&self) {
        match self.format_standings() {
            Ok(content) => print!("{}", content),
            Err(e) => log::error!("Could not format standings: {}", e),
        }
    }

    /// write_standings_to_file writes the leaderboards and stat gains to a text file in output/.
    /// Returns the path to the written file.
    pub fn write_standings_to_file(&self, path: Option<&Path>) -> anyhow::Result<String> {
        let content = self.format_standings()?;

        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let out_dir = Path::new("output");
                std::fs::create_dir_all(out_dir)?;
                out_dir.join("last_run.txt")
            }
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)
            .context(format!("Failed to open output file {}!", out_path.display()))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(out_path.to_string_lossy().into_owned())
    }

    /// write_standings_csv writes one line per query time and entity to a CSV file.
    pub fn write_standings_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .context(format!("Failed to create CSV file {}!", path.display()))?;

        for (t, rows) in self.query_times.iter().zip(self.standings.iter()) {
            for (i, row) in rows.iter().enumerate() {
                wtr.serialize(StandingRecord {
                    t: *t,
                    rank: i + 1,
                    entity_id: &row.entity_id,
                    velocity: row.velocity,
                    distance_left: row.distance_left,
                    speed: row.speed,
                    state: row.state,
                })?;
            }
        }
        wtr.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{Outcome, RaceEvent, RaceScript};
    use crate::core::geo::LatLng;
    use crate::core::race::RaceConfig;
    use crate::core::stats::EntityStats;
    use crate::interfaces::observer::NoopObserver;
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    fn scenario() -> RaceScenario {
        let mut stats = HashMap::new();
        stats.insert("b".to_owned(), EntityStats::with_speed(2.0));
        stats.insert("a".to_owned(), EntityStats::with_speed(1.0));

        RaceScenario {
            race_config: RaceConfig {
                start: LatLng::new(50.0, 4.0),
                home_bases: vec![LatLng::new(51.0, 4.0)],
                total_distance: 1000.0,
                weather_zone: None,
            },
            scripts: vec![
                RaceScript {
                    entity_id: "b".to_owned(),
                    events: vec![RaceEvent::Accident { t: 100.0 }],
                    outcome: Outcome::Injured,
                    finish_time: None,
                    home_base_index: 0,
                },
                RaceScript {
                    entity_id: "a".to_owned(),
                    events: vec![],
                    outcome: Outcome::Dnf,
                    finish_time: None,
                    home_base_index: 0,
                },
            ],
            stats,
        }
    }

    fn result() -> RaceResult {
        RaceResult::from_scenario(
            &scenario(),
            &[0.0, 100.0, 400.0],
            &SimConstants::default(),
            &NoopObserver,
        )
    }

    #[test]
    fn result_holds_standings_per_query_time() {
        let res = result();

        assert_eq!(res.standings.len(), 3);
        assert_eq!(res.standings[1][0].entity_id, "b");
        assert_eq!(res.standings[2][0].entity_id, "a");
        assert_eq!(res.stat_gains.len(), 1);
        assert_eq!(res.stat_gains[0].entity_id, "a");
    }

    #[test]
    fn series_per_entity() {
        let series = result().distance_left_series();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].0, "a");
        assert_eq!(series[0].1.len(), 3);
        assert_relative_eq!(series[0].1[2].1, 600.0);
        assert_relative_eq!(series[1].1[2].1, 800.0);
    }

    #[test]
    fn standings_text_contains_all_entities() {
        let content = result().format_standings().unwrap();

        assert!(content.contains("RESULT: Standings at 400.0s"));
        assert!(content.contains("dead"));
        assert!(content.contains("experience +0.04"));
    }

    #[test]
    fn standings_csv_has_one_line_per_entity_and_time() {
        let path = std::env::temp_dir().join(format!(
            "pigeonrace_standings_{}.csv",
            std::process::id()
        ));
        result().write_standings_csv(&path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(&headers[2], "entity_id");
        assert_eq!(records.len(), 6);
        assert_eq!(&records[5][2], "b");
        assert_eq!(&records[5][6], "dead");
    }
}
