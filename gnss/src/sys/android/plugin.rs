//! Plugin lifecycle entry points for the host's Kotlin plugin class.
//!
//! `GeoGuardPlugin.onAttachedToEngine` calls `nativeAttach` with a fresh
//! `GnssBridge`, method calls on the `lapse_geo_guard/gnss` channel go through
//! `nativeHandleMethodCall`, and `onDetachedFromEngine` calls `nativeDetach`.

use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use jni::JNIEnv;
use jni::objects::{JClass, JObject, JString};
use jni::sys::{jlong, jstring};
use log::{error, warn};

use super::{AndroidGnssBackend, SdkVersionCapability};
use crate::{GnssPlugin, GnssResult, MethodCall, MethodResponse};

static PLUGINS: OnceLock<Mutex<HashMap<u64, GnssPlugin>>> = OnceLock::new();

fn plugins() -> &'static Mutex<HashMap<u64, GnssPlugin>> {
    PLUGINS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Attaches a plugin driven by `bridge`, returning it with its native handle.
///
/// # Errors
/// Returns a [`crate::GnssError::Platform`] if the API level cannot be read or
/// the bridge cannot be referenced. Registration failures are not errors.
pub fn attach_with_bridge(
    env: &mut JNIEnv<'_>,
    bridge: &JObject<'_>,
) -> GnssResult<(u64, GnssPlugin)> {
    let capability = SdkVersionCapability::from_env(env)?;
    let backend = AndroidGnssBackend::new(env, bridge)?;
    let handle = backend.handle();
    Ok((handle, GnssPlugin::attach(&capability, Arc::new(backend))))
}

/// Attaches a plugin. Returns its handle, or `0` if attaching failed.
#[allow(non_snake_case, clippy::cast_possible_wrap)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_lapse_geoguard_gnss_GeoGuardPlugin_nativeAttach(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    bridge: JObject<'_>,
) -> jlong {
    match attach_with_bridge(&mut env, &bridge) {
        Ok((handle, plugin)) => {
            let mut map = plugins().lock().unwrap_or_else(PoisonError::into_inner);
            map.insert(handle, plugin);
            handle as jlong
        }
        Err(err) => {
            error!("failed to attach GNSS plugin: {err}");
            0
        }
    }
}

/// Answers a method call with a JSON-encoded [`MethodResponse`].
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_lapse_geoguard_gnss_GeoGuardPlugin_nativeHandleMethodCall(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
    method: JString<'_>,
) -> jstring {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    let method = match env.get_string(&method) {
        Ok(value) => value.to_string_lossy().into_owned(),
        Err(err) => {
            error!("failed to read method name: {err}");
            return ptr::null_mut();
        }
    };

    let response = {
        let map = plugins().lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&handle).map_or_else(
            || {
                warn!("method call for unknown GNSS plugin handle {handle}");
                MethodResponse::NotImplemented
            },
            |plugin| plugin.handle_method_call(&MethodCall::new(method)),
        )
    };

    let json = match response.to_json() {
        Ok(json) => json,
        Err(err) => {
            error!("failed to encode method response: {err}");
            return ptr::null_mut();
        }
    };

    match env.new_string(json) {
        Ok(value) => value.into_raw(),
        Err(err) => {
            error!("failed to return method response: {err}");
            ptr::null_mut()
        }
    }
}

/// Detaches and forgets a plugin. Unknown handles are ignored.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn Java_lapse_geoguard_gnss_GeoGuardPlugin_nativeDetach(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jlong,
) {
    #[allow(clippy::cast_sign_loss)]
    let handle = handle as u64;
    let plugin = {
        let mut map = plugins().lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(&handle)
    };

    if let Some(plugin) = plugin {
        plugin.detach();
    }
}
