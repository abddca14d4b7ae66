//! Platform-specific satellite status implementations.

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

/// Capability test for targets without satellite status callbacks.
///
/// Apple platforms expose no per-satellite status to apps, and desktop
/// location services do not report satellites either.
#[cfg(not(target_os = "android"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformCapability;

#[cfg(not(target_os = "android"))]
impl crate::GnssCapability for PlatformCapability {
    fn supports_satellite_status(&self) -> bool {
        false
    }
}
