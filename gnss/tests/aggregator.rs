//! Attach, update, query and detach flows against a scripted backend.

use std::sync::{Arc, Mutex};
use std::thread;

use geoguard_gnss::{
    GnssError, GnssMetrics, GnssPlugin, GnssResult, GnssSnapshot, GnssStatusBackend,
    GnssStatusDelegate, MethodCall, MethodResponse, RegistrationStatus, SatelliteMetricsAggregator,
    SatelliteRecord,
};
use serde_json::json;

#[derive(Default)]
struct ScriptedBackend {
    refuse_with: Option<GnssError>,
    fail_unregister: bool,
    delegate: Mutex<Option<Arc<dyn GnssStatusDelegate>>>,
    register_calls: Mutex<u32>,
    unregister_calls: Mutex<u32>,
}

impl std::fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBackend").finish_non_exhaustive()
    }
}

impl ScriptedBackend {
    fn refusing(err: GnssError) -> Self {
        Self {
            refuse_with: Some(err),
            ..Self::default()
        }
    }

    /// Delivers an update the way the OS would, even after unregistering.
    fn emit(&self, satellites: &[SatelliteRecord]) {
        let delegate = self.delegate.lock().unwrap().clone();
        if let Some(delegate) = delegate {
            delegate.on_satellite_status(satellites);
        }
    }

    fn has_delegate(&self) -> bool {
        self.delegate.lock().unwrap().is_some()
    }

    fn register_calls(&self) -> u32 {
        *self.register_calls.lock().unwrap()
    }

    fn unregister_calls(&self) -> u32 {
        *self.unregister_calls.lock().unwrap()
    }
}

impl GnssStatusBackend for ScriptedBackend {
    fn register(&self, delegate: Arc<dyn GnssStatusDelegate>) -> GnssResult<()> {
        *self.register_calls.lock().unwrap() += 1;
        if let Some(err) = &self.refuse_with {
            return Err(err.clone());
        }
        *self.delegate.lock().unwrap() = Some(delegate);
        Ok(())
    }

    fn unregister(&self) -> GnssResult<()> {
        *self.unregister_calls.lock().unwrap() += 1;
        if self.fail_unregister {
            return Err(GnssError::Platform {
                message: "callback already gone".into(),
            });
        }
        Ok(())
    }
}

fn snapshot_call() -> MethodCall {
    MethodCall::new("snapshot")
}

fn sat(used_in_fix: bool, cn0: Option<f64>) -> SatelliteRecord {
    SatelliteRecord::new(used_in_fix, cn0)
}

#[test]
fn unsupported_platform_reports_only_the_flag() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&false, backend.clone());

    assert_eq!(backend.register_calls(), 0);
    assert_eq!(plugin.registration(), &RegistrationStatus::NotAttempted);
    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": false }))
    );

    plugin.detach();
    assert_eq!(backend.unregister_calls(), 0);
}

#[test]
fn mixed_update_counts_used_and_averages_reported_cn0() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());
    assert_eq!(plugin.registration(), &RegistrationStatus::Registered);

    backend.emit(&[
        sat(true, Some(30.0)),
        sat(false, Some(20.0)),
        sat(true, None),
    ]);

    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": true, "satsUsed": 2, "avgCn0": 25.0 }))
    );
}

#[test]
fn cn0_average_uses_only_reporting_satellites() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());

    backend.emit(&[sat(true, Some(30.0)), sat(true, None), sat(false, None)]);

    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": true, "satsUsed": 2, "avgCn0": 30.0 }))
    );
}

#[test]
fn empty_update_yields_zero_metrics() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());

    backend.emit(&[]);

    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": true, "satsUsed": 0, "avgCn0": 0.0 }))
    );
}

#[test]
fn supported_snapshot_is_zero_before_first_update() {
    let backend = Arc::new(ScriptedBackend::default());
    let aggregator = SatelliteMetricsAggregator::attach(&true, backend);

    assert_eq!(
        aggregator.snapshot(),
        GnssSnapshot::Supported(GnssMetrics::default())
    );
}

#[test]
fn latest_update_replaces_previous_one() {
    let backend = Arc::new(ScriptedBackend::default());
    let aggregator = SatelliteMetricsAggregator::attach(&true, backend.clone());

    backend.emit(&[
        sat(true, Some(40.0)),
        sat(true, Some(42.0)),
        sat(true, Some(44.0)),
    ]);
    backend.emit(&[sat(false, Some(18.0))]);

    assert_eq!(
        aggregator.snapshot(),
        GnssSnapshot::Supported(GnssMetrics {
            satellites_used: 0,
            average_cn0: 18.0,
        })
    );
}

#[test]
fn snapshot_is_idempotent() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());
    backend.emit(&[sat(true, Some(27.5)), sat(false, Some(32.5))]);

    let first = plugin.handle_method_call(&snapshot_call());
    let second = plugin.handle_method_call(&snapshot_call());

    assert_eq!(first, second);
    assert_eq!(plugin.snapshot(), plugin.snapshot());
}

#[test]
fn permission_denied_keeps_supported_with_zero_metrics() {
    let backend = Arc::new(ScriptedBackend::refusing(GnssError::PermissionDenied));
    let plugin = GnssPlugin::attach(&true, backend.clone());

    assert_eq!(backend.register_calls(), 1);
    assert!(!backend.has_delegate());
    assert_eq!(
        plugin.registration(),
        &RegistrationStatus::Failed(GnssError::PermissionDenied)
    );
    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": true, "satsUsed": 0, "avgCn0": 0.0 }))
    );

    plugin.detach();
    assert_eq!(backend.unregister_calls(), 0);
}

#[test]
fn other_registration_failures_are_swallowed_too() {
    let backend = Arc::new(ScriptedBackend::refusing(GnssError::Platform {
        message: "location service unavailable".into(),
    }));
    let aggregator = SatelliteMetricsAggregator::attach(&true, backend);

    assert!(aggregator.is_supported());
    assert!(matches!(
        aggregator.registration(),
        RegistrationStatus::Failed(GnssError::Platform { .. })
    ));
    assert_eq!(
        aggregator.snapshot(),
        GnssSnapshot::Supported(GnssMetrics::default())
    );
}

#[test]
fn unknown_method_is_not_implemented() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend);

    assert_eq!(
        plugin.handle_method_call(&MethodCall::new("bogus")),
        MethodResponse::NotImplemented
    );
}

#[test]
fn unknown_method_is_not_implemented_when_unsupported() {
    let plugin = GnssPlugin::attach(&false, Arc::new(ScriptedBackend::default()));

    let response = plugin.handle_method_call(&MethodCall::new("bogus"));

    assert_eq!(response, MethodResponse::NotImplemented);
    assert_eq!(
        response.to_json().unwrap(),
        r#"{"status":"notImplemented"}"#
    );
}

#[test]
fn detach_unregisters_the_callback() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());
    backend.emit(&[sat(true, Some(33.0))]);

    plugin.detach();

    assert_eq!(backend.register_calls(), 1);
    assert_eq!(backend.unregister_calls(), 1);
}

#[test]
fn unregister_failure_is_swallowed() {
    let backend = Arc::new(ScriptedBackend {
        fail_unregister: true,
        ..ScriptedBackend::default()
    });
    let plugin = GnssPlugin::attach(&true, backend.clone());

    plugin.detach();

    assert_eq!(backend.unregister_calls(), 1);
}

#[test]
fn dropping_the_aggregator_unregisters_once() {
    let backend = Arc::new(ScriptedBackend::default());
    {
        let _aggregator = SatelliteMetricsAggregator::attach(&true, backend.clone());
    }
    assert_eq!(backend.unregister_calls(), 1);
}

#[test]
fn readers_never_observe_a_torn_pair() {
    let backend = Arc::new(ScriptedBackend::default());
    let aggregator = Arc::new(SatelliteMetricsAggregator::attach(&true, backend.clone()));

    // Every update pairs `n` used satellites with an average CN0 of `n`.
    let writer = {
        let backend = backend.clone();
        thread::spawn(move || {
            for round in 0..2_000_u32 {
                let n = round % 16 + 1;
                let cn0 = f64::from(n);
                let satellites: Vec<_> = (0..n).map(|_| sat(true, Some(cn0))).collect();
                backend.emit(&satellites);
            }
        })
    };

    let reader = {
        let aggregator = aggregator.clone();
        thread::spawn(move || {
            for _ in 0..2_000 {
                let metrics = aggregator.snapshot().metrics().unwrap();
                if metrics.satellites_used > 0 {
                    assert!(
                        (f64::from(metrics.satellites_used) - metrics.average_cn0).abs()
                            < f64::EPSILON
                    );
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn non_finite_cn0_keeps_average_a_number() {
    let backend = Arc::new(ScriptedBackend::default());
    let plugin = GnssPlugin::attach(&true, backend.clone());

    backend.emit(&[sat(true, Some(f64::INFINITY)), sat(true, Some(f64::NAN))]);

    assert_eq!(
        plugin.handle_method_call(&snapshot_call()),
        MethodResponse::Success(json!({ "supported": true, "satsUsed": 2, "avgCn0": 0.0 }))
    );
}

#[test]
fn method_call_decodes_from_json() {
    let call = MethodCall::from_json(r#"{"method":"snapshot"}"#).unwrap();
    assert_eq!(call, MethodCall::new("snapshot"));

    assert!(matches!(
        MethodCall::from_json("not json"),
        Err(GnssError::Serialization { .. })
    ));
}

#[test]
fn success_response_encodes_for_string_bridges() {
    let response = MethodResponse::Success(json!({ "supported": false }));
    let encoded: serde_json::Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();

    assert_eq!(
        encoded,
        json!({ "status": "success", "result": { "supported": false } })
    );
}
