use helpers::general::lerp;
use serde::{Deserialize, Serialize};

/// (m) Mean earth radius of the spherical earth approximation
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// LatLng is a geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Sentinel position meaning "do not render a marker".
    pub const INVALID: LatLng = LatLng {
        lat: f64::NAN,
        lng: f64::NAN,
    };

    pub const ORIGIN: LatLng = LatLng { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    /// True if both coordinates are finite and within their geographic ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// The method returns the position shifted by the given offsets in degrees.
    pub fn offset(&self, d_lat: f64, d_lng: f64) -> LatLng {
        LatLng {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

/// haversine returns the great-circle distance in meters between two positions. This is the only
/// distance function of the simulator.
pub fn haversine(a: &LatLng, b: &LatLng) -> f64 {
    let phi_a = a.lat.to_radians();
    let phi_b = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}

/// interpolate returns the point at fraction frac on the straight line (in degree space) from a to
/// b. Fractions above 1.0 extrapolate beyond b.
pub fn interpolate(a: &LatLng, b: &LatLng, frac: f64) -> LatLng {
    LatLng {
        lat: lerp(a.lat, b.lat, frac),
        lng: lerp(a.lng, b.lng, frac),
    }
}
