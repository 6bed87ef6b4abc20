use crate::types::GeoFix;

/// Drops fixes whose reported uncertainty radius is missing, non-positive
/// or above the ceiling. Stateless.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccuracyGate {
    max_accuracy_m: f32,
}

impl AccuracyGate {
    pub fn new(max_accuracy_m: f32) -> Self {
        Self { max_accuracy_m }
    }

    pub fn max_accuracy_m(&self) -> f32 {
        self.max_accuracy_m
    }

    /// `true` when `accuracy` is a usable radius at or under the ceiling.
    pub fn accepts(&self, accuracy: Option<f32>) -> bool {
        match accuracy {
            // NaN fails both comparisons and is rejected here
            Some(acc) => acc > 0.0 && acc <= self.max_accuracy_m,
            None => false,
        }
    }

    /// Raw coordinate unchanged, or `None` for an unusable fix.
    pub fn filter(&self, fix: &GeoFix) -> Option<(f64, f64)> {
        self.filter_raw(fix.latitude, fix.longitude, fix.accuracy)
    }

    pub fn filter_raw(&self, lat: f64, lon: f64, accuracy: Option<f32>) -> Option<(f64, f64)> {
        if self.accepts(accuracy) {
            Some((lat, lon))
        } else {
            None
        }
    }
}

impl Default for AccuracyGate {
    fn default() -> Self {
        Self::new(50.0)
    }
}
