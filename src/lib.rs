//! # GeoGuard
//!
//! Satellite-fix quality metrics for mobile applications.
//!
//! GeoGuard listens to the operating system's GNSS status feed and answers
//! one question on demand: how many satellites back the current position fix,
//! and how strong is their signal? Hosts use it to judge whether a reported
//! location is trustworthy.
//!
//! ## Features
//!
//! - `gnss` (default): satellite status aggregation and the host method-call
//!   boundary.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geoguard = { version = "0.1", features = ["gnss"] }
//! ```
//!
//! ```rust
//! # #[cfg(not(target_os = "android"))]
//! # {
//! use geoguard::gnss::{GnssPlugin, MethodCall};
//!
//! let plugin = GnssPlugin::attach_platform();
//! let response = plugin.handle_method_call(&MethodCall::new("snapshot"));
//! println!("{response:?}");
//! plugin.detach();
//! # }
//! ```

#[cfg(feature = "gnss")]
pub use geoguard_gnss as gnss;
