use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use geoguard_gnss::{
    GnssError, GnssResult, GnssStatusBackend, GnssStatusDelegate, SatelliteRecord,
};
use log::debug;
use serde::Deserialize;

/// One satellite as written in a recording.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordedSatellite {
    used_in_fix: bool,
    #[serde(default)]
    cn0_db_hz: Option<f64>,
}

impl From<RecordedSatellite> for SatelliteRecord {
    fn from(satellite: RecordedSatellite) -> Self {
        Self::new(satellite.used_in_fix, satellite.cn0_db_hz)
    }
}

/// Parses a recording: a JSON array of status updates, each an array of
/// `{"usedInFix": bool, "cn0DbHz": number | null}` objects.
pub fn parse_recording(json: &str) -> Result<Vec<Vec<SatelliteRecord>>> {
    let updates: Vec<Vec<RecordedSatellite>> =
        serde_json::from_str(json).context("Invalid recording")?;

    Ok(updates
        .into_iter()
        .map(|update| update.into_iter().map(SatelliteRecord::from).collect())
        .collect())
}

/// Backend feeding recorded updates to whoever registered.
pub struct ReplayBackend {
    deny_permission: bool,
    delegate: Mutex<Option<Arc<dyn GnssStatusDelegate>>>,
}

impl fmt::Debug for ReplayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayBackend")
            .field("deny_permission", &self.deny_permission)
            .finish_non_exhaustive()
    }
}

impl ReplayBackend {
    pub const fn new(deny_permission: bool) -> Self {
        Self {
            deny_permission,
            delegate: Mutex::new(None),
        }
    }

    /// Delivers one update. Returns `false` if nobody is registered.
    pub fn emit(&self, satellites: &[SatelliteRecord]) -> bool {
        let delegate = self
            .delegate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        delegate.is_some_and(|delegate| {
            delegate.on_satellite_status(satellites);
            true
        })
    }
}

impl GnssStatusBackend for ReplayBackend {
    fn register(&self, delegate: Arc<dyn GnssStatusDelegate>) -> GnssResult<()> {
        if self.deny_permission {
            return Err(GnssError::PermissionDenied);
        }
        *self.delegate.lock().unwrap_or_else(PoisonError::into_inner) = Some(delegate);
        debug!("replay delegate registered");
        Ok(())
    }

    fn unregister(&self) -> GnssResult<()> {
        self.delegate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("replay delegate unregistered");
        Ok(())
    }
}
