//! Per-satellite records and the metrics derived from them.

use crate::{GnssError, GnssResult};

/// Status of one visible satellite in a single update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteRecord {
    /// Whether this satellite contributed to the current position fix.
    pub used_in_fix: bool,
    /// Carrier-to-noise density in dB-Hz, if the platform reported one.
    pub cn0_db_hz: Option<f64>,
}

impl SatelliteRecord {
    /// Creates a record.
    #[must_use]
    pub const fn new(used_in_fix: bool, cn0_db_hz: Option<f64>) -> Self {
        Self {
            used_in_fix,
            cn0_db_hz,
        }
    }

    /// Builds records from the parallel arrays a platform status feed
    /// delivers, one entry per satellite.
    ///
    /// Non-finite CN0 values mark a satellite without a reading.
    ///
    /// # Errors
    ///
    /// Returns [`GnssError::Platform`] if the arrays differ in length.
    pub fn from_arrays(used_in_fix: &[bool], cn0_db_hz: &[f32]) -> GnssResult<Vec<Self>> {
        if used_in_fix.len() != cn0_db_hz.len() {
            return Err(GnssError::Platform {
                message: format!(
                    "{} used-in-fix flags but {} cn0 values",
                    used_in_fix.len(),
                    cn0_db_hz.len()
                ),
            });
        }

        Ok(used_in_fix
            .iter()
            .zip(cn0_db_hz)
            .map(|(&used, &cn0)| Self::new(used, cn0.is_finite().then_some(f64::from(cn0))))
            .collect())
    }
}

/// Metrics computed from a single satellite status update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GnssMetrics {
    /// Number of satellites used in the position fix.
    pub satellites_used: u32,
    /// Mean CN0 over satellites reporting one, `0.0` if none did.
    pub average_cn0: f64,
}

impl GnssMetrics {
    /// Computes the metrics of one status update.
    ///
    /// CN0 values that are missing or not finite are left out of the average.
    #[must_use]
    pub fn from_satellites(satellites: &[SatelliteRecord]) -> Self {
        let mut used = 0_u32;
        let mut cn0_sum = 0.0;
        let mut cn0_count = 0_u32;

        for satellite in satellites {
            if satellite.used_in_fix {
                used = used.saturating_add(1);
            }
            if let Some(cn0) = satellite.cn0_db_hz.filter(|value| value.is_finite()) {
                cn0_sum += cn0;
                cn0_count += 1;
            }
        }

        let average_cn0 = if cn0_count > 0 {
            cn0_sum / f64::from(cn0_count)
        } else {
            0.0
        };

        Self {
            satellites_used: used,
            average_cn0,
        }
    }
}
