//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to a `external fun` declaration
//! in RustBridge.kt. Requests and responses are JSON strings handled by
//! [`crate::bridge`]; failures come back as `{"error": "..."}` rather than
//! Java exceptions.

use std::sync::OnceLock;

use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use log::{info, warn};

use crate::bridge;
use crate::config::EngineConfig;
use crate::error::TrailResult;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::default)
}

fn read_string(env: &mut JNIEnv, input: &JString) -> TrailResult<String> {
    Ok(env.get_string(input)?.into())
}

/// Hand a result back to Java. Returns null only if the JVM cannot
/// allocate the string.
fn respond(env: &mut JNIEnv, call: &str, result: TrailResult<String>) -> jstring {
    let body = result.unwrap_or_else(|e| {
        warn!("{call} failed: {e}");
        bridge::error_json(&e.to_string())
    });
    env.new_string(body)
        .map(|s| s.into_raw())
        .unwrap_or(std::ptr::null_mut())
}

/// Install logging and engine config. Only the first call's config sticks.
/// Maps to: RustBridge.init(configJson: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_init(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jstring {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("trailcore"),
    );

    let result = read_string(&mut env, &config_json).and_then(|json| {
        let parsed = EngineConfig::from_json(&json)?;
        if CONFIG.set(parsed).is_err() {
            info!("engine config already set, keeping first");
        }
        Ok(serde_json::to_string(config())?)
    });
    respond(&mut env, "init", result)
}

/// Returns the trail-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    respond(&mut env, "version", Ok(crate::VERSION.to_string()))
}

/// Maps to: RustBridge.processLocationUpdate(request: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_processLocationUpdate(
    mut env: JNIEnv,
    _class: JClass,
    request: JString,
) -> jstring {
    let result = read_string(&mut env, &request)
        .and_then(|json| bridge::process_location_update_json(&json, config()));
    respond(&mut env, "processLocationUpdate", result)
}

/// Maps to: RustBridge.scan(request: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_scan(
    mut env: JNIEnv,
    _class: JClass,
    request: JString,
) -> jstring {
    let result =
        read_string(&mut env, &request).and_then(|json| bridge::scan_json(&json, config()));
    respond(&mut env, "scan", result)
}

/// Maps to: RustBridge.trailStats(request: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_trailStats(
    mut env: JNIEnv,
    _class: JClass,
    request: JString,
) -> jstring {
    let result = read_string(&mut env, &request).and_then(|json| bridge::trail_stats_json(&json));
    respond(&mut env, "trailStats", result)
}

/// Maps to: RustBridge.project(request: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_trailcore_app_RustBridge_project(
    mut env: JNIEnv,
    _class: JClass,
    request: JString,
) -> jstring {
    let result = read_string(&mut env, &request).and_then(|json| bridge::project_json(&json));
    respond(&mut env, "project", result)
}
