//! Method-call boundary between the host framework and the aggregator.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    GnssCapability, GnssError, GnssResult, GnssSnapshot, GnssStatusBackend, RegistrationStatus,
    SatelliteMetricsAggregator,
};

/// Name of the host method channel the plugin answers on.
pub const CHANNEL_NAME: &str = "lapse_geo_guard/gnss";

/// Method returning the latest satellite-fix metrics.
pub const METHOD_SNAPSHOT: &str = "snapshot";

/// A method call received from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    /// Method name.
    pub method: String,
    /// Call arguments. No method of this plugin takes any.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Creates a call without arguments.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }

    /// Decodes a call from its JSON form, `{"method": "...", "arguments": ...}`.
    ///
    /// # Errors
    ///
    /// Returns [`GnssError::Serialization`] if `json` is not a method call.
    pub fn from_json(json: &str) -> GnssResult<Self> {
        serde_json::from_str(json).map_err(|err| GnssError::Serialization {
            message: err.to_string(),
        })
    }
}

/// Answer to a [`MethodCall`].
///
/// `NotImplemented` is distinct from any success payload so that a host can
/// tell "no such method" apart from "the method answered false or zero".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "camelCase")]
pub enum MethodResponse {
    /// The method ran and produced a result.
    Success(Value),
    /// The plugin does not implement the method.
    NotImplemented,
}

impl MethodResponse {
    /// Encodes the response as JSON for hosts reached over a string bridge.
    ///
    /// # Errors
    ///
    /// Returns [`GnssError::Serialization`] if the payload cannot be encoded.
    pub fn to_json(&self) -> GnssResult<String> {
        serde_json::to_string(self).map_err(|err| GnssError::Serialization {
            message: err.to_string(),
        })
    }
}

/// The GNSS plugin as seen by the host framework.
#[derive(Debug)]
pub struct GnssPlugin {
    aggregator: SatelliteMetricsAggregator,
}

impl GnssPlugin {
    /// Attaches the plugin, registering with `backend` when supported.
    pub fn attach<C>(capability: &C, backend: Arc<dyn GnssStatusBackend>) -> Self
    where
        C: GnssCapability + ?Sized,
    {
        Self {
            aggregator: SatelliteMetricsAggregator::attach(capability, backend),
        }
    }

    /// Attaches on a target without satellite status callbacks, such as iOS.
    ///
    /// Android hosts attach through `sys::android` instead.
    #[cfg(not(target_os = "android"))]
    #[must_use]
    pub fn attach_platform() -> Self {
        Self::attach(
            &crate::sys::PlatformCapability,
            Arc::new(crate::UnsupportedBackend),
        )
    }

    /// Latest metrics.
    #[must_use]
    pub fn snapshot(&self) -> GnssSnapshot {
        self.aggregator.snapshot()
    }

    /// Outcome of the status callback registration.
    #[must_use]
    pub const fn registration(&self) -> &RegistrationStatus {
        self.aggregator.registration()
    }

    /// Answers a host method call. Never fails.
    #[must_use]
    pub fn handle_method_call(&self, call: &MethodCall) -> MethodResponse {
        match call.method.as_str() {
            METHOD_SNAPSHOT => MethodResponse::Success(self.snapshot().into()),
            other => {
                debug!("method `{other}` not implemented on {CHANNEL_NAME}");
                MethodResponse::NotImplemented
            }
        }
    }

    /// Detaches the plugin, unregistering the status callback.
    pub fn detach(self) {
        self.aggregator.detach();
    }
}
