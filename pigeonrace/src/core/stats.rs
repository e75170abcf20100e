use helpers::general::{clamp01, mean};
use serde::{Deserialize, Serialize};

/// * `speed` - (m/s) Base ground speed
/// * `focus` - (0..100) Attention, reduces positional wobble
/// * `navigation` - (0..100) Orientation ability, reduces positional wobble
/// * `sky_iq` - (0..100) Air sense, reduces positional wobble
/// * `endurance` - (0..100) Stamina
/// * `wind_resistance` - (0..100) Robustness against wind
/// * `experience` - (0..) Accumulated race experience
/// * `leadership` - (0..100) Hidden stat deciding the flock band, optional
/// * `race_start` - (s) Hidden start delay, reserved and currently without effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStats {
    pub speed: f64,
    #[serde(default = "default_stat")]
    pub focus: f64,
    #[serde(default = "default_stat")]
    pub navigation: f64,
    #[serde(default = "default_stat", alias = "skyIQ")]
    pub sky_iq: f64,
    #[serde(default = "default_stat")]
    pub endurance: f64,
    #[serde(default = "default_stat")]
    pub wind_resistance: f64,
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub leadership: Option<f64>,
    #[serde(default)]
    pub race_start: Option<f64>,
}

fn default_stat() -> f64 {
    50.0
}

impl EntityStats {
    pub fn with_speed(speed: f64) -> EntityStats {
        EntityStats {
            speed,
            focus: default_stat(),
            navigation: default_stat(),
            sky_iq: default_stat(),
            endurance: default_stat(),
            wind_resistance: default_stat(),
            experience: 0.0,
            leadership: None,
            race_start: None,
        }
    }

    /// The method returns the flight discipline in [0, 1] as the mean of focus, navigation and sky
    /// IQ. Disciplined birds fly straighter.
    pub fn discipline(&self) -> f64 {
        let vals: Vec<f64> = [self.focus, self.navigation, self.sky_iq]
            .iter()
            .map(|v| if v.is_finite() { *v } else { 0.0 })
            .collect();
        clamp01(mean(&vals) / 100.0)
    }

    /// Base speed usable by the integrator, 0.0 for invalid values.
    pub fn usable_speed(&self) -> f64 {
        if self.speed.is_finite() && self.speed > 0.0 {
            self.speed
        } else {
            0.0
        }
    }
}
