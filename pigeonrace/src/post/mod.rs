pub mod race_result;
pub mod stat_gains;
