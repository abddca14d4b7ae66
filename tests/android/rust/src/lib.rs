//! Android JNI test harness for the GNSS plugin.
//!
//! This crate is only compiled for Android targets.
//! To build: cargo ndk -t arm64-v8a build -p geoguard-test-android
//!
//! Each function here has a matching native declaration in the test app's
//! `MainActivity.kt`.

#![cfg(target_os = "android")]
#![allow(non_snake_case)]

use std::ptr;

use geoguard_gnss::sys::android::{SdkVersionCapability, attach_with_bridge};
use geoguard_gnss::{GnssCapability, MethodCall, METHOD_SNAPSHOT};
use jni::JNIEnv;
use jni::objects::{JClass, JObject};
use jni::sys::{jint, jstring};
use log::LevelFilter;

/// Routes `log` output to logcat.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_geoguard_test_MainActivity_testInitLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("geoguard"),
    );
}

/// Returns the device API level when satellite status is supported,
/// `0` when it is not, or `-1` on JNI failure.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_geoguard_test_MainActivity_testSatelliteStatusSupport(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    match SdkVersionCapability::from_env(&mut env) {
        Ok(capability) if capability.supports_satellite_status() => capability.sdk_int(),
        Ok(_) => 0,
        Err(err) => {
            log::error!("capability test failed: {err}");
            -1
        }
    }
}

/// Attaches through `bridge`, answers one snapshot call and detaches.
/// Returns the JSON-encoded response, or null on failure.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_geoguard_test_MainActivity_testAttachSnapshot(
    mut env: JNIEnv,
    _class: JClass,
    bridge: JObject,
) -> jstring {
    let (handle, plugin) = match attach_with_bridge(&mut env, &bridge) {
        Ok(attached) => attached,
        Err(err) => {
            log::error!("attach failed: {err}");
            return ptr::null_mut();
        }
    };
    log::info!(
        "plugin {handle} attached, registration: {:?}",
        plugin.registration()
    );

    let response = plugin.handle_method_call(&MethodCall::new(METHOD_SNAPSHOT));
    plugin.detach();

    let json = match response.to_json() {
        Ok(json) => json,
        Err(err) => {
            log::error!("encode failed: {err}");
            return ptr::null_mut();
        }
    };

    env.new_string(json)
        .map_or(ptr::null_mut(), |value| value.into_raw())
}
