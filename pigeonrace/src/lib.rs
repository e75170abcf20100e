pub mod core;
pub mod interfaces;
pub mod post;
pub mod pre;

pub use crate::core::flight::{compute_flight_state, compute_map_frame};
pub use crate::core::progress::integrate;
pub use crate::core::standings::compute_standings;
pub use crate::core::timeline::{normalize, validate};
pub use crate::post::stat_gains::compute_stat_gains;
