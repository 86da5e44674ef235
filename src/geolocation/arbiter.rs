//! Acceptance rules for competing position sources.

use crate::distance::GeoPoint;
use crate::geolocation::{GeolocationResult, GeolocationSource};

/// Decides which resolved positions may replace the current one.
#[derive(Debug, Clone)]
pub struct LocationArbiter {
    current: GeolocationResult,
}

impl LocationArbiter {
    /// Start from the default location.
    pub fn new(default_location: GeoPoint) -> Self {
        LocationArbiter {
            current: GeolocationResult::default_location(default_location),
        }
    }

    pub fn current(&self) -> &GeolocationResult {
        &self.current
    }

    /// Whether a device position has been accepted.
    pub fn is_settled(&self) -> bool {
        self.current.is_authoritative
    }

    /// Offer a candidate; returns it when accepted.
    ///
    /// Once an authoritative result is in place every later candidate is
    /// rejected. Before that, device and IP candidates are both accepted.
    pub fn offer(&mut self, candidate: GeolocationResult) -> Option<GeolocationResult> {
        if self.current.is_authoritative {
            log::debug!(
                "discarding {:?} position {}: {:?} position already accepted",
                candidate.source,
                candidate.point,
                self.current.source
            );
            return None;
        }
        if candidate.source == GeolocationSource::Default {
            return None;
        }

        self.current = candidate;
        Some(candidate)
    }
}
