//! Sensor node firmware entry point.
//!
//! Runs on both ESP32 and host platforms:
//! - **Host**: `cargo run --bin node` (provisioning from `~/.multirubro-node/provisioning.json`)
//! - **ESP32**: `cargo espflash flash --bin node --features esp32 --release`
//!   (provisioning from NVS)
//!
//! Startup resolves the stored provisioning into a [`DeviceProfile`] and
//! refuses to start when it is invalid; the violations are logged so the
//! device can be re-provisioned. The sensor loop, transport and power
//! manager receive the profile through an [`ActiveProfile`].

use log::{error, info, warn};
use multirubro_node_esp32::config::DATA_ENDPOINT;
use multirubro_node_esp32::{ActiveProfile, Board, DeviceProfile, RawConfig, FIRMWARE_VERSION};
use std::time::Duration;

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "esp32")]
fn load_raw_config() -> RawConfig {
    use multirubro_node_esp32::persistence;

    match persistence::init_nvs() {
        Ok(nvs) => persistence::load_provisioning(&nvs).unwrap_or_else(|| {
            warn!("No stored provisioning, using factory defaults");
            RawConfig::factory_defaults()
        }),
        Err(e) => {
            error!("Failed to open NVS: {:?}", e);
            warn!("Using factory defaults");
            RawConfig::factory_defaults()
        }
    }
}

#[cfg(not(feature = "esp32"))]
fn load_raw_config() -> RawConfig {
    use multirubro_node_esp32::persistence_host;

    match persistence_host::load_or_create_provisioning() {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to load provisioning: {}", e);
            warn!("Using factory defaults");
            RawConfig::factory_defaults()
        }
    }
}

/// Print error message and halt.
fn halt() -> ! {
    error!("=== Startup aborted: re-provision the device ===");
    // Brief pause to ensure serial output is flushed before process exits
    std::thread::sleep(Duration::from_secs(2));
    std::process::exit(1);
}

fn log_profile(profile: &DeviceProfile) {
    let identity = &profile.identity;
    let features = &profile.features;
    info!(
        "Device {} \"{}\" ({}) - {} @ {}",
        identity.device_id,
        identity.device_name,
        identity.device_type,
        identity.rubro.display_name(),
        identity.location
    );
    info!(
        "WiFi: {} ({})",
        profile.network.wifi.ssid,
        if profile.network.wifi.is_open() {
            "open"
        } else {
            "WPA2"
        }
    );
    match (&profile.network.mqtt, features.use_mqtt()) {
        (Some(mqtt), true) => info!(
            "Transport: MQTT {} (data: {}, status: {})",
            mqtt.address(),
            mqtt.topic_data,
            mqtt.topic_status
        ),
        _ => info!(
            "Transport: HTTP {}",
            profile.network.api_base_url.join(DATA_ENDPOINT)
        ),
    }
    info!(
        "Timing: read {:?}, send {:?} ({} samples), heartbeat {:?}, reconnect {:?}",
        profile.timing.read_interval,
        profile.timing.send_interval,
        profile.timing.samples_per_send(),
        profile.timing.heartbeat_interval,
        profile.timing.reconnect_delay
    );
    for (role, pin) in profile.pins.iter() {
        log::debug!("Pin {} -> GPIO{}", role, pin);
    }
    if features.simulate_sensor {
        warn!("Sensor simulation enabled");
    }
    if let Some(sleep) = features.deep_sleep {
        info!("Deep sleep enabled ({:?})", sleep);
    }
    if features.enable_ota() {
        info!("OTA updates enabled");
    }
}

fn main() {
    platform_init();

    info!("=== Multi-rubro sensor node v{} starting ===", FIRMWARE_VERSION);

    let raw = load_raw_config();
    let active = match ActiveProfile::resolve(&raw, Board::esp32()) {
        Ok(active) => active,
        Err(e) => {
            e.log();
            halt();
        }
    };

    let profile = active.current();
    log_profile(&profile);

    info!("Entering main loop...");
    let mut heartbeat_counter = 0u64;
    loop {
        let profile = active.current();
        std::thread::sleep(profile.timing.heartbeat_interval);
        heartbeat_counter += 1;
        info!(
            "Heartbeat #{} - {}",
            heartbeat_counter, profile.identity.device_id
        );
    }
}
