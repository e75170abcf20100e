use clap::Parser;
use helpers::general::InputValueError;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "pigeonrace",
    about = "An event-script driven pigeon race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing (validation details, map frames)
    #[clap(short, long)]
    pub debug: bool,

    /// Activate replay - race will be replayed in real-time and streamed as snapshots
    #[clap(long)]
    pub replay: bool,

    /// Export a PNG chart of the distance left over time to output/
    #[clap(long)]
    pub plot: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set path to the race scenario file (OPTIONAL: if not set, a seeded demo race is generated)
    #[clap(short, long)]
    pub scenario_path: Option<PathBuf>,

    /// Set path to a simulation constants file (OPTIONAL: defaults are used otherwise)
    #[clap(short, long)]
    pub consts_path: Option<PathBuf>,

    /// Set race times in seconds at which the standings are evaluated (repeatable, OPTIONAL: if not
    /// set, the race end and nine equidistant times before it are used)
    #[clap(short = 'q', long)]
    pub query_times: Vec<f64>,

    /// Set seed of the demo race generator
    #[clap(long, default_value = "1")]
    pub seed: u64,

    /// Set number of entities of the demo race
    #[clap(short, long, default_value = "12")]
    pub no_entities: usize,

    /// Set real-time factor (only relevant in replay mode)
    #[clap(short, long, default_value = "60.0")]
    pub realtime_factor: f64,

    /// Set replay timestep size in seconds, should be in the range [0.01, 60.0]
    #[clap(short, long, default_value = "1.0")]
    pub timestep_size: f64,

    /// Set race time in seconds at which the replay stops (OPTIONAL: estimated race end otherwise)
    #[clap(long)]
    pub t_end: Option<f64>,

    /// Set path of the CSV file the standings are written to (OPTIONAL)
    #[clap(long)]
    pub csv_path: Option<PathBuf>,
}

impl SimOpts {
    /// The method checks the option values that clap cannot check on its own.
    pub fn check(&self) -> Result<(), InputValueError> {
        if !(0.01..=60.0).contains(&self.timestep_size) {
            return Err(InputValueError);
        }
        if !(self.realtime_factor > 0.0) || !self.realtime_factor.is_finite() {
            return Err(InputValueError);
        }
        if self.no_entities == 0 {
            return Err(InputValueError);
        }
        if self.query_times.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(InputValueError);
        }
        if let Some(t_end) = self.t_end {
            if !t_end.is_finite() || t_end < 0.0 {
                return Err(InputValueError);
            }
        }
        Ok(())
    }
}
