pub mod read_sim_pars;
pub mod script_gen;
pub mod sim_opts;
