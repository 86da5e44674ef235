//! User position resolution from two racing sources.
//!
//! The device primitive is precise but slow and may be refused; the IP
//! lookup is coarse but usually quick. Both run concurrently and every
//! outcome goes through a single [`LocationArbiter`], which decides what
//! the coordinator gets to see:
//!
//! - a device position is authoritative and always replaces an IP one;
//! - an IP position is discarded once a device position was accepted;
//! - if both fail, the configured default stays in effect.

pub mod arbiter;
pub mod device;
pub mod ip;
pub mod resolver;

use serde::{Deserialize, Serialize};

use crate::distance::GeoPoint;

pub use self::arbiter::LocationArbiter;
pub use self::device::{DeviceLocator, FixedDeviceLocator, UnavailableDevice};
pub use self::ip::{IpApiLocator, IpLocator, NoIpLookup};
pub use self::resolver::{GeolocationResolver, ResolverHandle};

/// Where a position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeolocationSource {
    Device,
    IpLookup,
    Default,
}

/// A resolved (or default) user position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeolocationResult {
    pub point: GeoPoint,
    pub source: GeolocationSource,
    /// Set for device positions; nothing may replace an authoritative result.
    pub is_authoritative: bool,
}

impl GeolocationResult {
    pub fn device(point: GeoPoint) -> Self {
        GeolocationResult {
            point,
            source: GeolocationSource::Device,
            is_authoritative: true,
        }
    }

    pub fn ip_lookup(point: GeoPoint) -> Self {
        GeolocationResult {
            point,
            source: GeolocationSource::IpLookup,
            is_authoritative: false,
        }
    }

    pub fn default_location(point: GeoPoint) -> Self {
        GeolocationResult {
            point,
            source: GeolocationSource::Default,
            is_authoritative: false,
        }
    }
}
