//! Runs both position sources and forwards accepted results.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::GeofacetConfig;
use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};
use crate::geolocation::arbiter::LocationArbiter;
use crate::geolocation::device::DeviceLocator;
use crate::geolocation::ip::{IpApiLocator, IpLocator, NoIpLookup};
use crate::geolocation::{GeolocationResult, GeolocationSource};

/// Races the device and IP sources through one [`LocationArbiter`].
#[derive(Debug, Clone)]
pub struct GeolocationResolver {
    device: Arc<dyn DeviceLocator>,
    ip: Arc<dyn IpLocator>,
    device_timeout: Duration,
    default_location: GeoPoint,
}

impl GeolocationResolver {
    pub fn new(
        device: Arc<dyn DeviceLocator>,
        ip: Arc<dyn IpLocator>,
        device_timeout: Duration,
        default_location: GeoPoint,
    ) -> Self {
        GeolocationResolver {
            device,
            ip,
            device_timeout,
            default_location,
        }
    }

    /// Build from config; the IP source is the configured lookup URL.
    pub fn from_config(config: &GeofacetConfig, device: Arc<dyn DeviceLocator>) -> Self {
        let ip: Arc<dyn IpLocator> = if config.geolocation.enable_ip_lookup {
            Arc::new(IpApiLocator::new(config.geolocation.ip_lookup_url.clone()))
        } else {
            Arc::new(NoIpLookup)
        };
        Self::new(
            device,
            ip,
            config.geolocation.device_timeout(),
            config.default_location,
        )
    }

    pub fn default_location(&self) -> GeolocationResult {
        GeolocationResult::default_location(self.default_location)
    }

    /// Resolve until both sources are done, a device position is accepted,
    /// or `cancel` fires. Returns the final position.
    pub async fn run(
        self,
        sink: UnboundedSender<GeolocationResult>,
        cancel: CancellationToken,
    ) -> GeolocationResult {
        let mut arbiter = LocationArbiter::new(self.default_location);
        let device = self.device.clone();
        let ip = self.ip.clone();
        let device_timeout = self.device_timeout;

        let device_fut = tokio::time::timeout(device_timeout, async move {
            device.current_position().await
        });
        let ip_fut = async move { ip.lookup().await };
        tokio::pin!(device_fut);
        tokio::pin!(ip_fut);

        let mut device_done = false;
        let mut ip_done = false;

        while !(device_done && ip_done) {
            let candidate = tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("geolocation resolution cancelled");
                    break;
                }
                outcome = &mut device_fut, if !device_done => {
                    device_done = true;
                    match outcome {
                        Ok(Ok(point)) if point.is_valid() => Some(GeolocationResult::device(point)),
                        Ok(Ok(point)) => {
                            log::warn!("Geolocation error: device reported invalid position {point}");
                            None
                        }
                        Ok(Err(e)) => {
                            log::warn!("Geolocation error: {e}");
                            None
                        }
                        Err(_) => {
                            log::warn!("Geolocation error: no device position within {device_timeout:?}");
                            None
                        }
                    }
                }
                outcome = &mut ip_fut, if !ip_done => {
                    ip_done = true;
                    match outcome {
                        Ok(Some(point)) => Some(GeolocationResult::ip_lookup(point)),
                        Ok(None) => {
                            log::debug!("IP lookup returned no position");
                            None
                        }
                        Err(e) => {
                            log::debug!("IP lookup failed: {e}");
                            None
                        }
                    }
                }
            };

            if let Some(accepted) = candidate.and_then(|c| arbiter.offer(c)) {
                log::debug!("accepted {:?} position {}", accepted.source, accepted.point);
                if sink.send(accepted).is_err() {
                    log::debug!("location receiver dropped; stopping resolution");
                    break;
                }
            }
            if arbiter.is_settled() {
                break;
            }
        }

        let current = *arbiter.current();
        if current.source == GeolocationSource::Default && !cancel.is_cancelled() {
            let err = GeofacetError::location_unavailable("device and IP lookup both failed");
            log::info!("{err}; keeping default location {}", current.point);
        }
        current
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self, sink: UnboundedSender<GeolocationResult>) -> ResolverHandle {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(sink, cancel.clone()));
        ResolverHandle { cancel, join }
    }
}

/// Handle to a spawned resolution.
#[derive(Debug)]
pub struct ResolverHandle {
    cancel: CancellationToken,
    join: JoinHandle<GeolocationResult>,
}

impl ResolverHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for resolution to end and return the final position.
    pub async fn finished(self) -> Result<GeolocationResult> {
        self.join
            .await
            .map_err(|e| GeofacetError::cancelled(format!("geolocation task ended abnormally: {e}")))
    }
}
