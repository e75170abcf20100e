use anyhow::Context;
use clap::Parser;
use pigeonrace::core::flight::compute_map_frame;
use pigeonrace::core::race::SimConstants;
use pigeonrace::core::replay::handle_replay;
use pigeonrace::core::standings::compute_standings;
use pigeonrace::interfaces::map_interface::RaceSnapshot;
use pigeonrace::interfaces::observer::LogObserver;
use pigeonrace::post::race_result::RaceResult;
use pigeonrace::pre::read_sim_pars::{read_race_scenario, read_sim_constants, RaceScenario};
use pigeonrace::pre::script_gen::{generate_scenario, ScriptGenPars};
use pigeonrace::pre::sim_opts::SimOpts;
use plotters::prelude::*;
use rayon::prelude::*;
use std::thread;
use std::time::Instant;

const NO_PLOT_POINTS: usize = 200;

fn export_results_plot(result: &RaceResult, total_distance: f64) -> anyhow::Result<String> {
    let out_dir = std::path::Path::new("output");
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let filename = format!("race_plot_{}.png", ts);
    let out_path = out_dir.join(filename);

    let series = result.distance_left_series();
    let t_max = result
        .query_times
        .iter()
        .cloned()
        .fold(1.0_f64, f64::max);
    let mut y_max = total_distance;
    for (_, points) in series.iter() {
        for &(_, d) in points.iter() {
            if d > y_max {
                y_max = d;
            }
        }
    }
    if !y_max.is_finite() || y_max <= 0.0 {
        y_max = 1.0;
    }
    y_max *= 1.05;

    let root = BitMapBackend::new(&out_path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Distance left", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Race time (s)")
        .y_desc("m")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    for (i, (entity_id, points)) in series.iter().enumerate() {
        chart
            .draw_series(LineSeries::new(
                points.iter().copied(),
                Palette99::pick(i).stroke_width(2),
            ))?
            .label(entity_id.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

fn load_scenario(sim_opts: &SimOpts) -> anyhow::Result<RaceScenario> {
    match &sim_opts.scenario_path {
        Some(scenario_path) => {
            log::info!("Reading race scenario from {:?}", scenario_path);
            read_race_scenario(scenario_path)
        }
        None => {
            log::info!(
                "No scenario file provided, generating a demo race with {} entities (seed {})",
                sim_opts.no_entities,
                sim_opts.seed
            );
            let pars = ScriptGenPars {
                no_entities: sim_opts.no_entities,
                ..ScriptGenPars::default()
            };
            generate_scenario(sim_opts.seed, &pars)
        }
    }
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    sim_opts.check().context("Invalid simulation options!")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if sim_opts.debug { "debug" } else { "info" },
    ))
    .init();

    // get race scenario and simulation constants
    let scenario = load_scenario(&sim_opts)?;
    let sim_consts = match &sim_opts.consts_path {
        Some(consts_path) => {
            log::info!("Reading simulation constants from {:?}", consts_path);
            read_sim_constants(consts_path)?
        }
        None => SimConstants::default(),
    };

    for (entity_id, err) in scenario.validate_scripts() {
        log::warn!("Script of {} violates the script contract: {}", entity_id, err);
    }

    let t_end = sim_opts
        .t_end
        .unwrap_or_else(|| scenario.estimated_end(&sim_consts));

    log::info!(
        "Simulating a race with {} entities and {} home bases, estimated end at {:.1}s",
        scenario.scripts.len(),
        scenario.race_config.home_bases.len(),
        t_end
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if !sim_opts.replay {
        let query_times: Vec<f64> = if sim_opts.query_times.is_empty() {
            (1..=10).map(|i| t_end * i as f64 / 10.0).collect()
        } else {
            sim_opts.query_times.to_owned()
        };

        let t_start = Instant::now();
        let race_result =
            RaceResult::from_scenario(&scenario, &query_times, &sim_consts, &LogObserver);
        log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

        if sim_opts.debug {
            for &t in query_times.iter() {
                let map_frame = compute_map_frame(
                    &scenario.scripts,
                    &scenario.stats,
                    t,
                    &scenario.race_config,
                    &sim_consts,
                    &LogObserver,
                );
                for flight_state in map_frame.iter() {
                    log::debug!(
                        "t = {:.1}s: {} at ({:.5}, {:.5}), group {:?}, {}",
                        t,
                        flight_state.entity_id,
                        flight_state.position.lat,
                        flight_state.position.lng,
                        flight_state.group_id,
                        flight_state.visual_state
                    );
                }
            }
        }

        race_result.print_standings();
        let out_path = race_result.write_standings_to_file(None)?;
        log::info!("Standings written to {}", out_path);

        if let Some(csv_path) = &sim_opts.csv_path {
            race_result.write_standings_csv(csv_path)?;
            log::info!("Standings CSV written to {:?}", csv_path);
        }

        if sim_opts.plot {
            // evaluate a dense time grid for the chart, the query times are independent
            let plot_times: Vec<f64> = (0..=NO_PLOT_POINTS)
                .map(|i| t_end * i as f64 / NO_PLOT_POINTS as f64)
                .collect();
            let standings = plot_times
                .par_iter()
                .map(|&t| {
                    compute_standings(&scenario.scripts, &scenario.stats, t, &scenario.race_config)
                })
                .collect();
            let plot_result = RaceResult {
                query_times: plot_times,
                standings,
                stat_gains: Vec::new(),
            };

            match export_results_plot(&plot_result, scenario.race_config.total_distance) {
                Ok(path) => log::info!("Chart written to {}", path),
                Err(e) => log::warn!("Could not write chart: {}", e),
            }
        }
    } else {
        log::info!(
            "Replaying the race in real-time (real-time factor {:.1})...",
            sim_opts.realtime_factor
        );

        // create channel for communication between replay thread and consumer
        let (tx, rx) = flume::unbounded::<RaceSnapshot>();

        // run replay in a separate thread
        let sim_opts_thread = sim_opts.clone();
        let scenario_thread = scenario.clone();
        let sim_consts_thread = sim_consts.clone();

        let replay_thread = thread::spawn(move || {
            handle_replay(
                &scenario_thread,
                &sim_consts_thread,
                0.0,
                t_end,
                sim_opts_thread.timestep_size,
                sim_opts_thread.realtime_factor,
                &tx,
                &LogObserver,
            )
        });

        // consume snapshots until the replay thread drops the sender
        let mut t_last_print = f64::NEG_INFINITY;
        for snapshot in rx.iter() {
            if let Some(final_gains) = &snapshot.final_gains {
                println!("RESULT: Stat gains");
                for gain in final_gains.iter() {
                    println!(
                        "{:>12}, experience {:+.2}, racing {:+.2}",
                        gain.entity_id, gain.experience, gain.racing
                    );
                }
            } else if snapshot.t >= t_last_print + 60.0 {
                let no_in_zone = snapshot
                    .entity_states
                    .iter()
                    .filter(|s| s.in_weather_zone)
                    .count();
                if let Some(leader) = snapshot.standings.first() {
                    println!(
                        "t = {:7.1}s, leader {} ({:.2} m/s, {:.0} m left), {} in weather zone",
                        snapshot.t,
                        leader.entity_id,
                        leader.velocity,
                        leader.distance_left,
                        no_in_zone
                    );
                }
                t_last_print = snapshot.t;
            }
        }

        replay_thread
            .join()
            .map_err(|_| anyhow::anyhow!("Replay thread panicked!"))??;
    }

    Ok(())
}
