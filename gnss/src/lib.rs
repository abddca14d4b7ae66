//! GNSS satellite-fix metrics.
//!
//! This crate watches the operating system's satellite status feed and keeps
//! two numbers up to date: how many satellites were used in the latest
//! position fix, and their average carrier-to-noise density (CN0, dB-Hz).
//! A host application framework reads them on demand through a
//! [`GnssPlugin`] method call.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use geoguard_gnss::{GnssPlugin, MethodCall, MethodResponse, UnsupportedBackend};
//!
//! let plugin = GnssPlugin::attach(&false, Arc::new(UnsupportedBackend));
//! let response = plugin.handle_method_call(&MethodCall::new("snapshot"));
//! assert_eq!(
//!     response,
//!     MethodResponse::Success(serde_json::json!({ "supported": false }))
//! );
//! plugin.detach();
//! ```
//!
//! Only Android exposes satellite status callbacks. Every other target
//! reports the metrics as unsupported.

#![warn(missing_docs)]

mod aggregator;
mod channel;
mod metrics;

/// Platform-specific implementations.
pub mod sys;

use std::fmt;
use std::sync::Arc;

pub use aggregator::{GnssSnapshot, RegistrationStatus, SatelliteMetricsAggregator};
pub use channel::{CHANNEL_NAME, GnssPlugin, METHOD_SNAPSHOT, MethodCall, MethodResponse};
pub use metrics::{GnssMetrics, SatelliteRecord};

/// Errors reported by GNSS status backends.
///
/// None of these ever reach the host: the aggregator degrades to default
/// metrics instead. They are kept so the registration outcome can be inspected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GnssError {
    /// The app lacks the location permission needed for status callbacks.
    #[error("location permission denied")]
    PermissionDenied,
    /// Satellite status callbacks are not available on this platform.
    #[error("satellite status not available")]
    NotAvailable,
    /// The platform layer failed.
    #[error("platform error: {message}")]
    Platform {
        /// Description reported by the platform.
        message: String,
    },
    /// A payload could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description reported by the serializer.
        message: String,
    },
}

/// Result alias for GNSS backend operations.
pub type GnssResult<T> = Result<T, GnssError>;

/// Tells whether the running platform delivers satellite status callbacks.
///
/// Evaluated exactly once, when a [`SatelliteMetricsAggregator`] is attached.
pub trait GnssCapability {
    /// Returns `true` if satellite status callbacks are available.
    fn supports_satellite_status(&self) -> bool;
}

impl GnssCapability for bool {
    fn supports_satellite_status(&self) -> bool {
        *self
    }
}

/// Receives satellite status updates from a [`GnssStatusBackend`].
pub trait GnssStatusDelegate: Send + Sync {
    /// Called once per status update with every visible satellite.
    ///
    /// Never invoked concurrently with itself.
    fn on_satellite_status(&self, satellites: &[SatelliteRecord]);
}

/// Source of satellite status updates, usually the OS location service.
pub trait GnssStatusBackend: Send + Sync + fmt::Debug {
    /// Starts delivering status updates to `delegate`.
    ///
    /// # Errors
    ///
    /// Returns [`GnssError::PermissionDenied`] when the location permission is
    /// missing, or another [`GnssError`] if the platform refuses the request.
    fn register(&self, delegate: Arc<dyn GnssStatusDelegate>) -> GnssResult<()>;

    /// Stops delivering status updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform fails to remove the callback.
    fn unregister(&self) -> GnssResult<()>;
}

/// Backend for platforms without satellite status callbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackend;

impl GnssStatusBackend for UnsupportedBackend {
    fn register(&self, _delegate: Arc<dyn GnssStatusDelegate>) -> GnssResult<()> {
        Err(GnssError::NotAvailable)
    }

    fn unregister(&self) -> GnssResult<()> {
        Ok(())
    }
}
