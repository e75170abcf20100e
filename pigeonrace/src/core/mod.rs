pub mod event;
pub mod flight;
pub mod geo;
pub mod progress;
pub mod race;
pub mod replay;
pub mod seed;
pub mod standings;
pub mod stats;
pub mod timeline;
