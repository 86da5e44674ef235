//! Device geolocation primitive.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};

/// A single-shot device position request.
///
/// The resolver bounds the wait with its own timeout; implementations do
/// not need one.
#[async_trait]
pub trait DeviceLocator: Send + Sync + Debug {
    async fn current_position(&self) -> Result<GeoPoint>;
}

/// Reports a known position, e.g. one passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedDeviceLocator {
    point: GeoPoint,
}

impl FixedDeviceLocator {
    pub fn new(point: GeoPoint) -> Self {
        FixedDeviceLocator { point }
    }
}

#[async_trait]
impl DeviceLocator for FixedDeviceLocator {
    async fn current_position(&self) -> Result<GeoPoint> {
        Ok(self.point)
    }
}

/// Host without a device primitive; always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDevice;

#[async_trait]
impl DeviceLocator for UnavailableDevice {
    async fn current_position(&self) -> Result<GeoPoint> {
        Err(GeofacetError::location_unavailable(
            "device geolocation is not supported on this host",
        ))
    }
}
