use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::{
    GnssCapability, GnssError, GnssMetrics, GnssStatusBackend, GnssStatusDelegate,
    SatelliteRecord,
};

/// Latest metrics as answered to a snapshot query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GnssSnapshot {
    /// The platform has no satellite status callbacks.
    Unsupported,
    /// Metrics from the most recent status update, zero before the first one.
    Supported(GnssMetrics),
}

impl GnssSnapshot {
    /// Returns `true` unless the platform is unsupported.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    /// Returns the metrics, if supported.
    #[must_use]
    pub const fn metrics(&self) -> Option<GnssMetrics> {
        match self {
            Self::Unsupported => None,
            Self::Supported(metrics) => Some(*metrics),
        }
    }
}

impl From<GnssSnapshot> for Value {
    fn from(snapshot: GnssSnapshot) -> Self {
        match snapshot {
            GnssSnapshot::Unsupported => json!({ "supported": false }),
            GnssSnapshot::Supported(metrics) => json!({
                "supported": true,
                "satsUsed": metrics.satellites_used,
                "avgCn0": metrics.average_cn0,
            }),
        }
    }
}

/// Outcome of registering for satellite status updates during attach.
///
/// A failed registration is not retried: metrics stay at zero until the
/// aggregator is attached again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Registration was skipped because the platform is unsupported.
    NotAttempted,
    /// The backend accepted the delegate.
    Registered,
    /// The backend refused the delegate.
    Failed(GnssError),
}

/// Shared cell receiving status updates and holding the published metrics.
#[derive(Debug, Default)]
struct MetricsCell {
    latest: Mutex<GnssMetrics>,
    closed: AtomicBool,
}

impl MetricsCell {
    fn load(&self) -> GnssMetrics {
        // The guarded value is `Copy` and replaced whole, so a poisoned lock
        // still holds a consistent pair.
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, metrics: GnssMetrics) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = metrics;
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl GnssStatusDelegate for MetricsCell {
    fn on_satellite_status(&self, satellites: &[SatelliteRecord]) {
        if self.closed.load(Ordering::Acquire) {
            debug!("dropping satellite status received after detach");
            return;
        }

        let metrics = GnssMetrics::from_satellites(satellites);
        self.publish(metrics);
        debug!(
            "published gnss metrics: {} of {} satellites used, avg cn0 {:.2} dB-Hz",
            metrics.satellites_used,
            satellites.len(),
            metrics.average_cn0
        );
    }
}

/// Keeps the latest satellite-fix metrics for one plugin attachment.
///
/// Created by [`attach`](Self::attach), fed by the platform backend, read by
/// [`snapshot`](Self::snapshot), and torn down by [`detach`](Self::detach) or
/// on drop.
pub struct SatelliteMetricsAggregator {
    cell: Option<Arc<MetricsCell>>,
    backend: Arc<dyn GnssStatusBackend>,
    registration: RegistrationStatus,
    detached: bool,
}

impl fmt::Debug for SatelliteMetricsAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatelliteMetricsAggregator")
            .field("supported", &self.cell.is_some())
            .field("registration", &self.registration)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl SatelliteMetricsAggregator {
    /// Attaches to `backend` if `capability` reports satellite status support.
    ///
    /// Never fails. When registration is refused the aggregator stays
    /// supported with zero metrics; see [`registration`](Self::registration).
    pub fn attach<C>(capability: &C, backend: Arc<dyn GnssStatusBackend>) -> Self
    where
        C: GnssCapability + ?Sized,
    {
        if !capability.supports_satellite_status() {
            info!("satellite status callbacks not supported on this platform");
            return Self {
                cell: None,
                backend,
                registration: RegistrationStatus::NotAttempted,
                detached: false,
            };
        }

        let cell = Arc::new(MetricsCell::default());
        let registration = match backend.register(cell.clone()) {
            Ok(()) => {
                info!("registered for satellite status updates");
                RegistrationStatus::Registered
            }
            Err(err) => {
                warn!("satellite status registration failed, metrics stay at zero: {err}");
                RegistrationStatus::Failed(err)
            }
        };

        Self {
            cell: Some(cell),
            backend,
            registration,
            detached: false,
        }
    }

    /// Whether the platform supports satellite status callbacks.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        self.cell.is_some()
    }

    /// Outcome of the registration attempted during attach.
    #[must_use]
    pub const fn registration(&self) -> &RegistrationStatus {
        &self.registration
    }

    /// Returns the latest published metrics.
    #[must_use]
    pub fn snapshot(&self) -> GnssSnapshot {
        self.cell.as_ref().map_or(GnssSnapshot::Unsupported, |cell| {
            GnssSnapshot::Supported(cell.load())
        })
    }

    /// Stops receiving updates and unregisters from the backend.
    pub fn detach(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;

        if let Some(cell) = &self.cell {
            cell.close();
        }

        if self.registration == RegistrationStatus::Registered {
            if let Err(err) = self.backend.unregister() {
                warn!("failed to unregister satellite status callback: {err}");
            }
        }
    }
}

impl Drop for SatelliteMetricsAggregator {
    fn drop(&mut self) {
        self.teardown();
    }
}
