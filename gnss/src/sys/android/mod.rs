//! Android satellite status implementation using JNI.
//!
//! The host ships a small Kotlin bridge object, `lapse.geoguard.gnss.GnssBridge`,
//! that owns the `GnssStatus.Callback`. It must provide:
//!
//! - `registerGnssStatusCallback(handle: Long)`: calls
//!   `LocationManager.registerGnssStatusCallback`, letting any
//!   `SecurityException` propagate;
//! - `unregisterGnssStatusCallback()`;
//!
//! and forward every `onSatelliteStatusChanged` to the native
//! `GnssBridge.dispatchSatelliteStatus(handle, usedInFix, cn0DbHz)`, passing
//! `NaN` for satellites without a CN0 value.

mod plugin;

pub use plugin::attach_with_bridge;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use jni::objects::{
    GlobalRef, JBooleanArray, JClass, JFloatArray, JObject, JString, JThrowable, JValue,
};
use jni::sys::{jboolean, jlong};
use jni::{JNIEnv, JavaVM};
use log::{error, warn};

use crate::{
    GnssCapability, GnssError, GnssResult, GnssStatusBackend, GnssStatusDelegate, SatelliteRecord,
};

/// First API level with `GnssStatus.Callback` (Android 7.0).
pub const MIN_SDK_GNSS_STATUS: i32 = 24;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
static DELEGATES: OnceLock<Mutex<HashMap<u64, Arc<dyn GnssStatusDelegate>>>> = OnceLock::new();

fn delegates() -> &'static Mutex<HashMap<u64, Arc<dyn GnssStatusDelegate>>> {
    DELEGATES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Capability test based on `android.os.Build.VERSION.SDK_INT`.
#[derive(Debug, Clone, Copy)]
pub struct SdkVersionCapability {
    sdk_int: i32,
}

impl SdkVersionCapability {
    /// Reads the API level of the running device.
    ///
    /// # Errors
    /// Returns a [`GnssError::Platform`] if the field cannot be read.
    pub fn from_env(env: &mut JNIEnv<'_>) -> GnssResult<Self> {
        let sdk_int = env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
            .and_then(|value| value.i())
            .map_err(map_jni_error)?;

        Ok(Self { sdk_int })
    }

    /// API level of the running device.
    #[must_use]
    pub const fn sdk_int(&self) -> i32 {
        self.sdk_int
    }
}

impl GnssCapability for SdkVersionCapability {
    fn supports_satellite_status(&self) -> bool {
        self.sdk_int >= MIN_SDK_GNSS_STATUS
    }
}

/// Backend driving the host's Kotlin `GnssBridge` through JNI.
pub struct AndroidGnssBackend {
    vm: JavaVM,
    bridge: GlobalRef,
    handle: u64,
}

impl fmt::Debug for AndroidGnssBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidGnssBackend")
            .field("handle", &self.handle)
            .finish()
    }
}

impl AndroidGnssBackend {
    /// Creates a backend around a `GnssBridge` instance.
    ///
    /// # Errors
    /// Returns a [`GnssError::Platform`] if the JNI references cannot be created.
    pub fn new(env: &JNIEnv<'_>, bridge: &JObject<'_>) -> GnssResult<Self> {
        let vm = env.get_java_vm().map_err(map_jni_error)?;
        let bridge = env.new_global_ref(bridge).map_err(map_jni_error)?;
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);

        Ok(Self { vm, bridge, handle })
    }

    /// Native handle the bridge passes back with each status update.
    #[must_use]
    pub const fn handle(&self) -> u64 {
        self.handle
    }

    fn call_bridge(&self, name: &str, sig: &str, args: &[JValue<'_, '_>]) -> GnssResult<()> {
        let mut env = self.vm.attach_current_thread().map_err(map_jni_error)?;
        match env.call_method(self.bridge.as_obj(), name, sig, args) {
            Ok(_) => Ok(()),
            Err(jni::errors::Error::JavaException) => Err(take_exception(&mut env)),
            Err(err) => Err(map_jni_error(err)),
        }
    }
}

impl GnssStatusBackend for AndroidGnssBackend {
    fn register(&self, delegate: Arc<dyn GnssStatusDelegate>) -> GnssResult<()> {
        {
            let mut map = delegates().lock().unwrap_or_else(PoisonError::into_inner);
            map.insert(self.handle, delegate);
        }

        #[allow(clippy::cast_possible_wrap)]
        let args = [JValue::Long(self.handle as jlong)];
        let result = self.call_bridge("registerGnssStatusCallback", "(J)V", &args);

        if result.is_err() {
            let mut map = delegates().lock().unwrap_or_else(PoisonError::into_inner);
            map.remove(&self.handle);
        }
        result
    }

    fn unregister(&self) -> GnssResult<()> {
        {
            let mut map = delegates().lock().unwrap_or_else(PoisonError::into_inner);
            map.remove(&self.handle);
        }

        self.call_bridge("unregisterGnssStatusCallback", "()V", &[])
    }
}

impl Drop for AndroidGnssBackend {
    fn drop(&mut self) {
        if let Some(map) = DELEGATES.get() {
            let mut guard = map.lock().unwrap_or_else(PoisonError::into_inner);
            guard.remove(&self.handle);
        }
    }
}

/// Receives one `GnssStatus` update from the Kotlin bridge.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_lapse_geoguard_gnss_GnssBridge_dispatchSatelliteStatus(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
    used_in_fix: JBooleanArray<'_>,
    cn0_db_hz: JFloatArray<'_>,
) {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    match read_satellites(&mut env, &used_in_fix, &cn0_db_hz) {
        Ok(satellites) => emit_status(handle, &satellites),
        Err(err) => error!("failed to read Android satellite status: {err}"),
    }
}

fn read_satellites(
    env: &mut JNIEnv<'_>,
    used_in_fix: &JBooleanArray<'_>,
    cn0_db_hz: &JFloatArray<'_>,
) -> GnssResult<Vec<SatelliteRecord>> {
    let used_len = env.get_array_length(used_in_fix).map_err(map_jni_error)?;
    let mut used = vec![jboolean::default(); usize::try_from(used_len).unwrap_or_default()];
    env.get_boolean_array_region(used_in_fix, 0, &mut used)
        .map_err(map_jni_error)?;

    let cn0_len = env.get_array_length(cn0_db_hz).map_err(map_jni_error)?;
    let mut cn0 = vec![0.0_f32; usize::try_from(cn0_len).unwrap_or_default()];
    env.get_float_array_region(cn0_db_hz, 0, &mut cn0)
        .map_err(map_jni_error)?;

    let used: Vec<bool> = used.iter().map(|&flag| flag != 0).collect();
    SatelliteRecord::from_arrays(&used, &cn0)
}

fn emit_status(handle: u64, satellites: &[SatelliteRecord]) {
    let delegate = {
        let map = delegates().lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&handle).cloned()
    };

    if let Some(delegate) = delegate {
        delegate.on_satellite_status(satellites);
    } else {
        warn!("received Android satellite status for unknown handle {handle}");
    }
}

fn take_exception(env: &mut JNIEnv<'_>) -> GnssError {
    let throwable = match env.exception_occurred() {
        Ok(throwable) => throwable,
        Err(err) => return map_jni_error(err),
    };
    if let Err(err) = env.exception_clear() {
        return map_jni_error(err);
    }

    match env.is_instance_of(&throwable, "java/lang/SecurityException") {
        Ok(true) => GnssError::PermissionDenied,
        Ok(false) => GnssError::Platform {
            message: describe_throwable(env, &throwable)
                .unwrap_or_else(|err| format!("java exception ({err})")),
        },
        Err(err) => map_jni_error(err),
    }
}

fn describe_throwable(
    env: &mut JNIEnv<'_>,
    throwable: &JThrowable<'_>,
) -> jni::errors::Result<String> {
    let description = env
        .call_method(throwable, "toString", "()Ljava/lang/String;", &[])?
        .l()?;
    let description = JString::from(description);
    let text = env.get_string(&description)?.to_string_lossy().into_owned();
    Ok(text)
}

#[allow(clippy::needless_pass_by_value)]
fn map_jni_error(err: jni::errors::Error) -> GnssError {
    GnssError::Platform {
        message: err.to_string(),
    }
}
