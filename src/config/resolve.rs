//! Raw configuration → [`DeviceProfile`].
//!
//! Resolution is a pure function: no I/O, no logging, no global state. All
//! checks run on every call and every violation is collected, in a fixed
//! order (presence and types, then ranges and formats, then cross-field
//! rules, then pin collisions), so identical input always produces an
//! identical profile or an identical error.
//!
//! # Example
//!
//! ```
//! use multirubro_node_esp32::config::{resolve_esp32, RawConfig, ViolationKind};
//!
//! let profile = resolve_esp32(&RawConfig::factory_defaults()).unwrap();
//! assert_eq!(profile.identity.device_id, "ESP32-001");
//!
//! let raw = RawConfig::factory_defaults().with("mqttPort", 0i64);
//! let err = resolve_esp32(&raw).unwrap_err();
//! assert!(err.has(ViolationKind::OutOfRange, "mqttPort"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use super::board::Board;
use super::device::{DeviceType, Rubro};
use super::error::{ConfigError, Violation, ViolationKind};
use super::keys;
use super::network::{
    check_host, check_password, check_ssid, check_topic, port_from_i64, ApiUrl, MqttEndpoint,
    NetworkSettings, WifiConfig,
};
use super::profile::{
    AdcConfig, Calibration, DeviceProfile, Features, Identity, OtaSettings, PinMap, PinRole,
    SensorCalibration, Timing, Transport,
};
use super::raw::{RawConfig, RawValue};
use super::secret::Secret;

/// Largest humidity calibration offset, in percentage points.
const MAX_HUM_OFFSET: f64 = 100.0;

/// Resolve against the stock ESP32 board.
pub fn resolve_esp32(raw: &RawConfig) -> Result<DeviceProfile, ConfigError> {
    resolve(raw, &Board::esp32())
}

/// Validate `raw` against `board` and build a profile.
///
/// Returns every violation found; a profile is only returned when there
/// are none.
pub fn resolve(raw: &RawConfig, board: &Board) -> Result<DeviceProfile, ConfigError> {
    use Presence::{Optional, Required};

    let mut c = Checker::new(raw);

    // ---- Presence and types ----

    let device_id = c.string(keys::DEVICE_ID, Required);
    let device_name = c.string(keys::DEVICE_NAME, Required);
    let device_type = c.string(keys::DEVICE_TYPE, Required);
    let rubro = c.string(keys::RUBRO, Required);
    let location = c.string(keys::LOCATION, Required);

    let wifi_ssid = c.string(keys::WIFI_SSID, Required);
    let wifi_password = c.string(keys::WIFI_PASSWORD, Required);
    let api_base_url = c.string(keys::API_BASE_URL, Required);
    let mqtt_broker = c.string(keys::MQTT_BROKER, Optional);
    let mqtt_port = c.integer(keys::MQTT_PORT, Optional);
    let mqtt_topic_data = c.string(keys::MQTT_TOPIC_DATA, Optional);
    let mqtt_topic_status = c.string(keys::MQTT_TOPIC_STATUS, Optional);

    let pins: Vec<(PinRole, Option<i64>)> = PinRole::ALL
        .iter()
        .map(|&role| (role, c.integer(role.key(), Required)))
        .collect();

    let sensor_scale = c.float(keys::SENSOR_SCALE, Required);
    let sensor_offset = c.float(keys::SENSOR_OFFSET, Required);
    let sensor_unit = c.string(keys::SENSOR_UNIT, Required);
    let temp_offset = c.float(keys::TEMP_OFFSET, Required);
    let hum_offset = c.float(keys::HUM_OFFSET, Required);
    let adc_resolution = c.integer(keys::ADC_RESOLUTION, Required);
    let adc_voltage = c.float(keys::ADC_VOLTAGE, Required);

    let read_interval = c.integer(keys::SENSOR_READ_INTERVAL_MS, Required);
    let send_interval = c.integer(keys::DATA_SEND_INTERVAL_MS, Required);
    let heartbeat_interval = c.integer(keys::HEARTBEAT_INTERVAL_MS, Required);
    let reconnect_delay = c.integer(keys::RECONNECT_DELAY_MS, Required);

    let simulate_sensor = c.boolean(keys::SIMULATE_SENSOR, Required);
    let debug_mode = c.boolean(keys::DEBUG_MODE, Required);
    let use_mqtt = c.boolean(keys::USE_MQTT, Required);
    let use_http = c.boolean(keys::USE_HTTP, Optional);
    let enable_deep_sleep = c.boolean(keys::ENABLE_DEEP_SLEEP, Required);
    let sleep_duration = c.integer(keys::SLEEP_DURATION_SEC, Optional);
    let enable_ota = c.boolean(keys::ENABLE_OTA, Required);
    let ota_password = c.string(keys::OTA_PASSWORD, Optional);
    let api_key = c.string(keys::API_KEY, Optional);

    // ---- Ranges and formats ----

    let device_id = c.ensure(keys::DEVICE_ID, device_id, not_blank);
    let device_name = c.ensure(keys::DEVICE_NAME, device_name, not_blank);
    let device_type = c.convert(keys::DEVICE_TYPE, device_type, |tag| {
        not_blank(tag).map(|_| DeviceType::from_tag(tag))
    });
    let rubro = c.convert(keys::RUBRO, rubro, |tag| {
        not_blank(tag).map(|_| Rubro::from_tag(tag))
    });
    let location = c.ensure(keys::LOCATION, location, not_blank);

    let wifi = match (wifi_ssid, wifi_password) {
        (Some(ssid), Some(password)) => match WifiConfig::new(ssid, password) {
            Ok(wifi) => Some(wifi),
            Err(e) => {
                c.extend(e);
                None
            }
        },
        (ssid, password) => {
            c.ensure(keys::WIFI_SSID, ssid, |s| check_ssid(s));
            c.ensure(keys::WIFI_PASSWORD, password, |s| check_password(s));
            None
        }
    };
    let api_base_url = c.convert(keys::API_BASE_URL, api_base_url, |s| s.parse::<ApiUrl>());
    let mqtt_broker = c.ensure(keys::MQTT_BROKER, mqtt_broker, |s| check_host(s));
    let mqtt_port = c.convert(keys::MQTT_PORT, mqtt_port, |&p| port_from_i64(p));
    let mqtt_topic_data = c.ensure(keys::MQTT_TOPIC_DATA, mqtt_topic_data, |s| check_topic(s));
    let mqtt_topic_status =
        c.ensure(keys::MQTT_TOPIC_STATUS, mqtt_topic_status, |s| check_topic(s));

    let mut pin_map = BTreeMap::new();
    for (role, value) in pins {
        if let Some(pin) = c.convert(role.key(), value, |&p| check_pin(board, role, p)) {
            pin_map.insert(role, pin);
        }
    }

    let analog = device_type.as_ref().map(DeviceType::is_analog);
    let sensor_scale = c.ensure(keys::SENSOR_SCALE, sensor_scale, |&scale| {
        if scale == 0.0 && analog == Some(true) {
            Err("scale must be non-zero for an analog sensor".into())
        } else {
            Ok(())
        }
    });
    let sensor_unit = c.ensure(keys::SENSOR_UNIT, sensor_unit, not_blank);
    let temp_span = DeviceType::Temperature
        .limits()
        .map(|l| l.span())
        .unwrap_or(f64::INFINITY);
    let temp_offset = c.ensure(keys::TEMP_OFFSET, temp_offset, |&x| {
        within_magnitude(x, temp_span, "°C")
    });
    let hum_offset = c.ensure(keys::HUM_OFFSET, hum_offset, |&x| {
        within_magnitude(x, MAX_HUM_OFFSET, "%")
    });
    let adc_resolution = c.convert(keys::ADC_RESOLUTION, adc_resolution, |&counts| {
        u32::try_from(counts)
            .ok()
            .filter(|&counts| board.supports_resolution(counts))
            .ok_or_else(|| {
                format!(
                    "unsupported ADC resolution {} for {} (supported: {:?})",
                    counts, board.name, board.adc_resolutions
                )
            })
    });
    let adc_voltage = c.ensure(keys::ADC_VOLTAGE, adc_voltage, |&v| {
        if v > 0.0 && v <= board.max_adc_voltage {
            Ok(())
        } else {
            Err(format!(
                "reference voltage must be in (0, {}] V",
                board.max_adc_voltage
            ))
        }
    });

    let read_interval = c.convert(keys::SENSOR_READ_INTERVAL_MS, read_interval, interval_ms);
    let send_interval = c.convert(keys::DATA_SEND_INTERVAL_MS, send_interval, interval_ms);
    let heartbeat_interval =
        c.convert(keys::HEARTBEAT_INTERVAL_MS, heartbeat_interval, interval_ms);
    let reconnect_delay = c.convert(keys::RECONNECT_DELAY_MS, reconnect_delay, interval_ms);
    let sleep_duration = c.convert(keys::SLEEP_DURATION_SEC, sleep_duration, |&secs| {
        u32::try_from(secs)
            .map(|secs| Duration::from_secs(secs.into()))
            .map_err(|_| format!("duration must be in 0..={} seconds", u32::MAX))
    });

    // ---- Cross-field rules ----

    let transport = match (use_mqtt, use_http) {
        (Some(mqtt), Some(http)) if mqtt == http => {
            c.push(
                keys::USE_MQTT,
                ViolationKind::MutuallyExclusiveFlags,
                format!(
                    "exactly one transport must be selected, got {}={} and {}={}",
                    keys::USE_MQTT,
                    mqtt,
                    keys::USE_HTTP,
                    http
                ),
                None,
            );
            None
        }
        (Some(true), _) => Some(Transport::Mqtt),
        (Some(false), _) => Some(Transport::Http),
        (None, _) => None,
    };

    if let (Some(read), Some(send)) = (read_interval, send_interval) {
        if send < read {
            c.push(
                keys::DATA_SEND_INTERVAL_MS,
                ViolationKind::OutOfRange,
                format!(
                    "send interval must not be shorter than {} ({} ms)",
                    keys::SENSOR_READ_INTERVAL_MS,
                    read.as_millis()
                ),
                Some(send.as_millis().to_string()),
            );
        }
    }

    // MQTT settings are needed when MQTT is the transport, and must be
    // complete whenever a broker is provisioned at all.
    let mqtt_wanted = use_mqtt == Some(true) || c.is_present(keys::MQTT_BROKER);
    if mqtt_wanted {
        for key in [
            keys::MQTT_BROKER,
            keys::MQTT_PORT,
            keys::MQTT_TOPIC_DATA,
            keys::MQTT_TOPIC_STATUS,
        ] {
            c.require_dependent(key, "required when MQTT is configured");
        }
    }

    if enable_ota == Some(true) {
        match &ota_password {
            Some(password) if password.is_empty() => c.push(
                keys::OTA_PASSWORD,
                ViolationKind::DependentFieldMissing,
                format!("must not be empty when {} is set", keys::ENABLE_OTA),
                Some(String::new()),
            ),
            _ => c.require_dependent(keys::OTA_PASSWORD, "required when OTA is enabled"),
        }
    }

    if enable_deep_sleep == Some(true) {
        match sleep_duration {
            Some(d) if d.is_zero() => c.push(
                keys::SLEEP_DURATION_SEC,
                ViolationKind::DependentFieldMissing,
                format!("must be non-zero when {} is set", keys::ENABLE_DEEP_SLEEP),
                Some("0".into()),
            ),
            _ => c.require_dependent(
                keys::SLEEP_DURATION_SEC,
                "required when deep sleep is enabled",
            ),
        }
    }

    // ---- Pin collisions ----

    let pin_map = PinMap::new(pin_map);
    for (pin, roles) in pin_map.by_pin() {
        if roles.len() < 2 || board.all_shared(&roles) {
            continue;
        }
        for (i, role) in roles.iter().enumerate().skip(1) {
            let earlier: Vec<&str> = roles[..i].iter().map(|r| r.key()).collect();
            c.push(
                role.key(),
                ViolationKind::PinCollision,
                format!("GPIO{} already assigned to {}", pin, earlier.join(", ")),
                Some(pin.to_string()),
            );
        }
    }

    // ---- Assembly ----

    let violations = c.finish();
    if let Some(err) = ConfigError::from_violations(violations) {
        return Err(err);
    }

    let assemble = || -> Option<DeviceProfile> {
        let transport = transport?;
        let mqtt = match mqtt_broker {
            Some(host) => Some(MqttEndpoint {
                host,
                port: mqtt_port?,
                topic_data: mqtt_topic_data?,
                topic_status: mqtt_topic_status?,
            }),
            None => None,
        };
        let api_key = match (transport, api_key) {
            (Transport::Http, Some(key)) if !key.is_empty() => Some(Secret::new(key)),
            _ => None,
        };
        let deep_sleep = if enable_deep_sleep? {
            Some(sleep_duration?)
        } else {
            None
        };
        let ota = if enable_ota? {
            Some(OtaSettings {
                password: Secret::new(ota_password?),
            })
        } else {
            None
        };

        Some(DeviceProfile {
            identity: Identity {
                device_id: device_id?,
                device_name: device_name?,
                device_type: device_type?,
                rubro: rubro?,
                location: location?,
            },
            network: NetworkSettings {
                wifi: wifi?,
                api_base_url: api_base_url?,
                mqtt,
            },
            pins: pin_map,
            calibration: Calibration {
                sensor: SensorCalibration {
                    scale: sensor_scale?,
                    offset: sensor_offset?,
                    unit: sensor_unit?,
                },
                temp_offset: temp_offset?,
                hum_offset: hum_offset?,
                adc: AdcConfig {
                    resolution: adc_resolution?,
                    reference_voltage: adc_voltage?,
                },
            },
            timing: Timing {
                read_interval: read_interval?,
                send_interval: send_interval?,
                heartbeat_interval: heartbeat_interval?,
                reconnect_delay: reconnect_delay?,
            },
            features: Features {
                simulate_sensor: simulate_sensor?,
                debug_mode: debug_mode?,
                transport,
                deep_sleep,
                ota,
                api_key,
            },
        })
    };

    // Every value that came back `None` above was recorded as a violation
    // (or is an optional key gated by a flag that was checked).
    assemble().ok_or_else(assembly_failed)
}

/// Error for a value lost between checking and assembly.
fn assembly_failed() -> ConfigError {
    ConfigError::single(Violation::new(
        "profile",
        ViolationKind::OutOfRange,
        "internal error: configuration value dropped without a violation",
        None,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

/// Typed access to a [`RawConfig`] that records every problem it meets.
struct Checker<'a> {
    raw: &'a RawConfig,
    violations: Vec<Violation>,
}

impl<'a> Checker<'a> {
    fn new(raw: &'a RawConfig) -> Self {
        Self {
            raw,
            violations: Vec::new(),
        }
    }

    fn finish(self) -> Vec<Violation> {
        self.violations
    }

    fn push(
        &mut self,
        key: &str,
        kind: ViolationKind,
        reason: impl Into<String>,
        value: Option<String>,
    ) {
        self.violations
            .push(Violation::new(key, kind, reason, value));
    }

    fn extend(&mut self, err: ConfigError) {
        self.violations.extend(err.into_violations());
    }

    fn is_present(&self, key: &str) -> bool {
        self.raw.contains(key)
    }

    fn is_reported(&self, key: &str) -> bool {
        self.violations.iter().any(|v| v.key == key)
    }

    /// Report `key` as a missing dependent field unless it is present or
    /// already has a problem of its own.
    fn require_dependent(&mut self, key: &str, reason: &str) {
        if !self.is_present(key) && !self.is_reported(key) {
            self.push(key, ViolationKind::DependentFieldMissing, reason, None);
        }
    }

    fn lookup(&mut self, key: &str, presence: Presence) -> Option<&'a RawValue> {
        let raw = self.raw;
        let value = raw.get(key);
        if value.is_none() && presence == Presence::Required {
            self.push(key, ViolationKind::MissingRequired, "required key is missing", None);
        }
        value
    }

    fn typed<T>(
        &mut self,
        key: &str,
        presence: Presence,
        expected: &str,
        coerce: impl FnOnce(&RawValue) -> Option<T>,
    ) -> Option<T> {
        let value = self.lookup(key, presence)?;
        let coerced = coerce(value);
        if coerced.is_none() {
            self.push(
                key,
                ViolationKind::TypeMismatch,
                format!("expected {}, got {}", expected, value.type_name()),
                Some(value.to_string()),
            );
        }
        coerced
    }

    fn string(&mut self, key: &str, presence: Presence) -> Option<String> {
        self.typed(key, presence, "string", |v| match v {
            RawValue::Str(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn integer(&mut self, key: &str, presence: Presence) -> Option<i64> {
        self.typed(key, presence, "integer", coerce_int)
    }

    fn boolean(&mut self, key: &str, presence: Presence) -> Option<bool> {
        self.typed(key, presence, "boolean", coerce_bool)
    }

    /// Floats must also be finite.
    fn float(&mut self, key: &str, presence: Presence) -> Option<f64> {
        let value = self.typed(key, presence, "number", coerce_float)?;
        self.ensure(key, Some(value), |x| {
            if x.is_finite() {
                Ok(())
            } else {
                Err("value must be finite".into())
            }
        })
    }

    /// Run a fallible conversion, recording `OutOfRange` on failure.
    fn convert<T: fmt::Display, U>(
        &mut self,
        key: &str,
        value: Option<T>,
        check: impl FnOnce(&T) -> Result<U, String>,
    ) -> Option<U> {
        let value = value?;
        match check(&value) {
            Ok(converted) => Some(converted),
            Err(reason) => {
                self.push(
                    key,
                    ViolationKind::OutOfRange,
                    reason,
                    Some(value.to_string()),
                );
                None
            }
        }
    }

    fn ensure<T: fmt::Display>(
        &mut self,
        key: &str,
        value: Option<T>,
        check: impl FnOnce(&T) -> Result<(), String>,
    ) -> Option<T> {
        let value = value?;
        match check(&value) {
            Ok(()) => Some(value),
            Err(reason) => {
                self.push(
                    key,
                    ViolationKind::OutOfRange,
                    reason,
                    Some(value.to_string()),
                );
                None
            }
        }
    }
}

fn coerce_int(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Int(i) => Some(*i),
        RawValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Float(x) => Some(*x),
        RawValue::Int(i) => Some(*i as f64),
        RawValue::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Int(0) => Some(false),
        RawValue::Int(1) => Some(true),
        RawValue::Str(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn not_blank(s: &String) -> Result<(), String> {
    if s.trim().is_empty() {
        Err("value cannot be empty".into())
    } else {
        Ok(())
    }
}

fn within_magnitude(x: f64, limit: f64, unit: &str) -> Result<(), String> {
    if x.abs() <= limit {
        Ok(())
    } else {
        Err(format!("offset magnitude must not exceed {} {}", limit, unit))
    }
}

fn interval_ms(ms: &i64) -> Result<Duration, String> {
    match u32::try_from(*ms) {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms.into())),
        _ => Err(format!("interval must be in 1..={} ms", u32::MAX)),
    }
}

fn check_pin(board: &Board, role: PinRole, pin: i64) -> Result<u8, String> {
    let pin = u8::try_from(pin)
        .ok()
        .filter(|&p| board.is_gpio(p))
        .ok_or_else(|| format!("GPIO{} is not usable on {}", pin, board.name))?;
    if role.needs_adc() && !board.is_adc(pin) {
        return Err(format!("GPIO{} has no usable ADC channel", pin));
    }
    if role.drives_output() && board.is_input_only(pin) {
        return Err(format!("GPIO{} is input-only", pin));
    }
    Ok(pin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RawConfig {
        RawConfig::factory_defaults()
            .with(keys::WIFI_SSID, "Carniceria-Lopez")
            .with(keys::WIFI_PASSWORD, "s3cret-pass")
    }

    fn violations_of(raw: &RawConfig) -> ConfigError {
        resolve_esp32(raw).expect_err("configuration should be rejected")
    }

    // ==================== Happy Path Tests ====================

    #[test]
    fn test_valid_config_matches_input() {
        let profile = resolve_esp32(&valid()).unwrap();

        assert_eq!(profile.identity.device_id, "ESP32-001");
        assert_eq!(profile.identity.device_name, "ESP32 Sensor Node");
        assert_eq!(profile.identity.device_type, DeviceType::Temperature);
        assert_eq!(profile.identity.rubro, Rubro::Carniceria);
        assert_eq!(profile.identity.location, "Main Room");

        assert_eq!(profile.network.wifi.ssid, "Carniceria-Lopez");
        assert_eq!(profile.network.wifi.password.expose(), "s3cret-pass");
        assert_eq!(profile.network.api_base_url.host(), "192.168.1.100");
        assert_eq!(profile.network.api_base_url.port(), 8000);
        let mqtt = profile.network.mqtt.as_ref().unwrap();
        assert_eq!(mqtt.address(), "192.168.1.100:1883");
        assert_eq!(mqtt.topic_data, "iot/data");
        assert_eq!(mqtt.topic_status, "iot/status");

        assert_eq!(profile.pins.get(PinRole::Sensor), 34);
        assert_eq!(profile.pins.get(PinRole::Relay), 25);
        assert_eq!(profile.pins.get(PinRole::I2cSda), 21);
        assert_eq!(profile.pins.get(PinRole::Battery), 35);

        assert_eq!(profile.calibration.sensor.scale, 1.0);
        assert_eq!(profile.calibration.sensor.unit, "units");
        assert_eq!(profile.calibration.adc.resolution, 4096);
        assert_eq!(profile.calibration.adc.reference_voltage, 3.3);

        assert_eq!(profile.timing.read_interval, Duration::from_millis(1000));
        assert_eq!(profile.timing.send_interval, Duration::from_millis(5000));
        assert_eq!(profile.timing.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(profile.timing.reconnect_delay, Duration::from_secs(5));

        assert!(profile.features.simulate_sensor);
        assert!(profile.features.debug_mode);
        assert_eq!(profile.features.transport, Transport::Http);
        assert!(!profile.features.enable_deep_sleep());
        assert_eq!(
            profile.features.ota.as_ref().unwrap().password.expose(),
            "iot-update"
        );
        assert!(profile.features.api_key.is_none());
    }

    #[test]
    fn test_string_typed_source_coerced() {
        let pairs: Vec<(String, String)> = valid()
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    RawValue::Str(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.to_string(), text)
            })
            .collect();
        let raw = RawConfig::from_pairs(pairs);

        let profile = resolve_esp32(&raw).unwrap();
        assert_eq!(profile.pins.get(PinRole::Sensor), 34);
        assert_eq!(profile.calibration.adc.reference_voltage, 3.3);
        assert!(profile.features.debug_mode);
        assert_eq!(profile, resolve_esp32(&valid()).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let raw = valid();
        assert_eq!(resolve_esp32(&raw).unwrap(), resolve_esp32(&raw).unwrap());

        let bad = valid().with(keys::MQTT_PORT, 0i64).with(keys::LED_PIN, 25i64);
        assert_eq!(violations_of(&bad), violations_of(&bad));
    }

    #[test]
    fn test_round_trip_idempotent() {
        let raw = valid()
            .with(keys::API_KEY, "k-123")
            .with(keys::ENABLE_DEEP_SLEEP, true)
            .with(keys::DEVICE_TYPE, "Door_State")
            .with(keys::RUBRO, "bar");
        let profile = resolve_esp32(&raw).unwrap();
        let again = resolve_esp32(&profile.to_raw()).unwrap();
        assert_eq!(profile, again);
        assert_eq!(again.features.api_key.as_ref().unwrap().expose(), "k-123");
        assert_eq!(again.features.deep_sleep, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_round_trip_through_json() {
        let profile = resolve_esp32(&valid()).unwrap();
        let json = profile.to_raw().to_json_string_pretty();
        let raw = RawConfig::from_json_str(&json).unwrap();
        assert_eq!(resolve_esp32(&raw).unwrap(), profile);
    }

    #[test]
    fn test_printed_profile_redacts_credentials() {
        let raw = valid()
            .with(keys::OTA_PASSWORD, "ota-s3cret")
            .with(keys::API_KEY, "key-s3cret");
        let profile = resolve_esp32(&raw).unwrap();
        assert!(profile.features.api_key.is_some());

        let json = profile.to_json_pretty();
        for secret in ["s3cret-pass", "ota-s3cret", "key-s3cret"] {
            assert!(!json.contains(secret), "{} leaked", secret);
        }
        assert_eq!(json.matches("\"****\"").count(), 3);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["network"]["wifi"]["password"], "****");
        assert_eq!(value["features"]["ota"]["password"], "****");
        assert_eq!(value["features"]["api_key"], "****");
    }

    // ==================== Presence and Type Tests ====================

    #[test]
    fn test_missing_required_key() {
        let mut raw = valid();
        raw.remove(keys::DEVICE_ID);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::MissingRequired, "deviceId"));
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_every_required_key_reported() {
        for key in keys::ALL {
            let mut raw = valid();
            raw.remove(key);
            match resolve_esp32(&raw) {
                Ok(_) => assert!(
                    [
                        keys::USE_HTTP,
                        keys::API_KEY,
                        keys::SLEEP_DURATION_SEC,
                        // Without a broker the remaining MQTT keys are unused
                        keys::MQTT_BROKER,
                    ]
                    .contains(key),
                    "{} should be required",
                    key
                ),
                Err(err) => {
                    let kind = err.violations()[0].kind;
                    assert!(
                        kind == ViolationKind::MissingRequired
                            || kind == ViolationKind::DependentFieldMissing,
                        "{} reported as {}",
                        key,
                        kind
                    );
                    assert_eq!(err.violations()[0].key, *key);
                }
            }
        }
    }

    #[test]
    fn test_empty_config_reports_all_required() {
        let err = violations_of(&RawConfig::new());
        let missing = err
            .violations()
            .iter()
            .filter(|v| v.kind == ViolationKind::MissingRequired)
            .count();
        // All keys except the MQTT group and the optional/dependent ones
        assert_eq!(missing, keys::ALL.len() - 4 - 4);
        assert_eq!(missing, err.len());
    }

    #[test]
    fn test_type_mismatch() {
        let raw = valid()
            .with(keys::SENSOR_PIN, "thirty-four")
            .with(keys::DEBUG_MODE, "maybe")
            .with(keys::DEVICE_NAME, 42i64)
            .with(keys::ADC_RESOLUTION, 4096.5);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::TypeMismatch, "sensorPin"));
        assert!(err.has(ViolationKind::TypeMismatch, "debugMode"));
        assert!(err.has(ViolationKind::TypeMismatch, "deviceName"));
        assert!(err.has(ViolationKind::TypeMismatch, "adcResolution"));
        assert_eq!(err.len(), 4);
    }

    #[test]
    fn test_unsupported_json_value() {
        let raw = valid().with(keys::LOCATION, RawValue::Unsupported("null"));
        let err = violations_of(&raw);
        let v = err.for_key("location").next().unwrap();
        assert_eq!(v.kind, ViolationKind::TypeMismatch);
        assert_eq!(v.reason, "expected string, got null");
    }

    #[test]
    fn test_bool_accepts_c_style_ints() {
        let profile = resolve_esp32(&valid().with(keys::DEBUG_MODE, 0i64)).unwrap();
        assert!(!profile.features.debug_mode);
        let err = violations_of(&valid().with(keys::DEBUG_MODE, 2i64));
        assert!(err.has(ViolationKind::TypeMismatch, "debugMode"));
    }

    #[test]
    fn test_non_finite_float() {
        let err = violations_of(&valid().with(keys::SENSOR_OFFSET, "NaN"));
        assert!(err.has(ViolationKind::OutOfRange, "sensorOffset"));
        let err = violations_of(&valid().with(keys::ADC_VOLTAGE, f64::INFINITY));
        assert!(err.has(ViolationKind::OutOfRange, "adcVoltage"));
    }

    // ==================== Range Tests ====================

    #[test]
    fn test_mqtt_port_boundaries() {
        for port in [0i64, 65536, -1] {
            let err = violations_of(&valid().with(keys::MQTT_PORT, port));
            assert!(err.has(ViolationKind::OutOfRange, "mqttPort"), "port {}", port);
        }
        for port in [1i64, 65535] {
            let profile = resolve_esp32(&valid().with(keys::MQTT_PORT, port)).unwrap();
            assert_eq!(profile.network.mqtt.unwrap().port as i64, port);
        }
    }

    #[test]
    fn test_api_url_format() {
        for url in [
            "192.168.1.100:8000",
            "ftp://host",
            "http://",
            "http://host:99999",
            "http://fe80::1",
            "http://host:8000:9000",
            "http://a:b:80",
        ] {
            let err = violations_of(&valid().with(keys::API_BASE_URL, url));
            assert!(err.has(ViolationKind::OutOfRange, "apiBaseUrl"), "{}", url);
        }
    }

    #[test]
    fn test_wifi_credentials() {
        let raw = valid()
            .with(keys::WIFI_SSID, "")
            .with(keys::WIFI_PASSWORD, "short");
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "wifiSsid"));
        let pw = err.for_key("wifiPassword").next().unwrap();
        assert_eq!(pw.kind, ViolationKind::OutOfRange);
        assert_eq!(pw.value.as_deref(), Some("****"));

        let profile = resolve_esp32(&valid().with(keys::WIFI_PASSWORD, "")).unwrap();
        assert!(profile.network.wifi.is_open());
    }

    #[test]
    fn test_ssid_checked_when_password_has_wrong_type() {
        let raw = valid()
            .with(keys::WIFI_SSID, "a".repeat(33))
            .with(keys::WIFI_PASSWORD, 12345678i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "wifiSsid"));
        assert!(err.has(ViolationKind::TypeMismatch, "wifiPassword"));
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_pin_allow_list() {
        let raw = valid()
            .with(keys::DHT_PIN, 7i64) // flash pin
            .with(keys::PIR_PIN, 300i64)
            .with(keys::SENSOR_PIN, 25i64) // no ADC1 channel
            .with(keys::RELAY_PIN, 36i64); // input-only
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "dhtPin"));
        assert!(err.has(ViolationKind::OutOfRange, "pirPin"));
        assert!(err.has(ViolationKind::OutOfRange, "sensorPin"));
        assert!(err.has(ViolationKind::OutOfRange, "relayPin"));
        assert_eq!(err.len(), 4);
    }

    #[test]
    fn test_pir_may_use_input_only_pin() {
        let profile = resolve_esp32(&valid().with(keys::PIR_PIN, 39i64)).unwrap();
        assert_eq!(profile.pins.get(PinRole::Pir), 39);
    }

    #[test]
    fn test_adc_settings() {
        let raw = valid()
            .with(keys::ADC_RESOLUTION, 4095i64)
            .with(keys::ADC_VOLTAGE, 5.0);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "adcResolution"));
        assert!(err.has(ViolationKind::OutOfRange, "adcVoltage"));

        let profile = resolve_esp32(&valid().with(keys::ADC_RESOLUTION, 1024i64)).unwrap();
        assert_eq!(profile.calibration.adc.resolution, 1024);
    }

    #[test]
    fn test_zero_scale_only_rejected_for_analog_sensors() {
        // Temperature comes from the DHT, scale is unused
        assert!(resolve_esp32(&valid().with(keys::SENSOR_SCALE, 0.0)).is_ok());

        let raw = valid()
            .with(keys::SENSOR_SCALE, 0.0)
            .with(keys::DEVICE_TYPE, "weight");
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "sensorScale"));

        // Digital preset sensors outside the typed set
        for tag in ["door_state", "Rain"] {
            let raw = valid()
                .with(keys::SENSOR_SCALE, 0.0)
                .with(keys::DEVICE_TYPE, tag);
            assert!(resolve_esp32(&raw).is_ok(), "{}", tag);
        }
    }

    #[test]
    fn test_offset_limits() {
        let raw = valid()
            .with(keys::TEMP_OFFSET, -200.0)
            .with(keys::HUM_OFFSET, 150.0);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "tempOffset"));
        assert!(err.has(ViolationKind::OutOfRange, "humOffset"));
        assert!(resolve_esp32(&valid().with(keys::TEMP_OFFSET, -2.5)).is_ok());
    }

    #[test]
    fn test_intervals_strictly_positive() {
        let raw = valid()
            .with(keys::HEARTBEAT_INTERVAL_MS, 0i64)
            .with(keys::RECONNECT_DELAY_MS, -5i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "heartbeatIntervalMs"));
        assert!(err.has(ViolationKind::OutOfRange, "reconnectDelayMs"));
    }

    #[test]
    fn test_blank_identity() {
        let raw = valid().with(keys::DEVICE_ID, "   ").with(keys::RUBRO, "");
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "deviceId"));
        assert!(err.has(ViolationKind::OutOfRange, "rubro"));
    }

    // ==================== Cross-field Tests ====================

    #[test]
    fn test_send_faster_than_read_rejected() {
        let raw = valid()
            .with(keys::SENSOR_READ_INTERVAL_MS, 5000i64)
            .with(keys::DATA_SEND_INTERVAL_MS, 1000i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::OutOfRange, "dataSendIntervalMs"));
        assert_eq!(err.len(), 1);

        let raw = valid()
            .with(keys::SENSOR_READ_INTERVAL_MS, 5000i64)
            .with(keys::DATA_SEND_INTERVAL_MS, 5000i64);
        assert!(resolve_esp32(&raw).is_ok());
    }

    #[test]
    fn test_ota_requires_password_aggregated() {
        let raw = valid()
            .with(keys::USE_MQTT, true)
            .with(keys::ENABLE_OTA, true)
            .with(keys::OTA_PASSWORD, "")
            .with(keys::MQTT_PORT, 0i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::DependentFieldMissing, "otaPassword"));
        assert!(err.has(ViolationKind::OutOfRange, "mqttPort"));
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_ota_password_absent() {
        let mut raw = valid();
        raw.remove(keys::OTA_PASSWORD);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::DependentFieldMissing, "otaPassword"));

        let profile = resolve_esp32(&raw.with(keys::ENABLE_OTA, false)).unwrap();
        assert!(!profile.features.enable_ota());
    }

    #[test]
    fn test_deep_sleep_requires_duration() {
        let raw = valid()
            .with(keys::ENABLE_DEEP_SLEEP, true)
            .with(keys::SLEEP_DURATION_SEC, 0i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::DependentFieldMissing, "sleepDurationSec"));

        let mut raw = valid().with(keys::ENABLE_DEEP_SLEEP, true);
        raw.remove(keys::SLEEP_DURATION_SEC);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::DependentFieldMissing, "sleepDurationSec"));
    }

    #[test]
    fn test_dependent_field_type_error_not_double_reported() {
        let raw = valid()
            .with(keys::ENABLE_DEEP_SLEEP, true)
            .with(keys::SLEEP_DURATION_SEC, "soon");
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::TypeMismatch, "sleepDurationSec"));
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_transport_exclusive() {
        let raw = valid().with(keys::USE_MQTT, true).with(keys::USE_HTTP, true);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::MutuallyExclusiveFlags, "useMqtt"));

        let raw = valid().with(keys::USE_MQTT, false).with(keys::USE_HTTP, false);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::MutuallyExclusiveFlags, "useMqtt"));

        let profile = resolve_esp32(&valid().with(keys::USE_HTTP, true)).unwrap();
        assert_eq!(profile.features.transport, Transport::Http);
    }

    #[test]
    fn test_mqtt_requires_endpoint() {
        let mut raw = valid().with(keys::USE_MQTT, true);
        raw.remove(keys::MQTT_BROKER);
        raw.remove(keys::MQTT_TOPIC_STATUS);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::DependentFieldMissing, "mqttBroker"));
        assert!(err.has(ViolationKind::DependentFieldMissing, "mqttTopicStatus"));
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_http_without_broker() {
        let mut raw = valid();
        for key in [
            keys::MQTT_BROKER,
            keys::MQTT_PORT,
            keys::MQTT_TOPIC_DATA,
            keys::MQTT_TOPIC_STATUS,
        ] {
            raw.remove(key);
        }
        let profile = resolve_esp32(&raw).unwrap();
        assert!(profile.network.mqtt.is_none());
        assert!(!profile.features.use_mqtt());
    }

    #[test]
    fn test_api_key_only_kept_for_http() {
        let raw = valid().with(keys::API_KEY, "k-123");
        let profile = resolve_esp32(&raw).unwrap();
        assert_eq!(profile.features.api_key.unwrap().expose(), "k-123");

        let profile = resolve_esp32(&raw.with(keys::USE_MQTT, true)).unwrap();
        assert!(profile.features.api_key.is_none());
    }

    // ==================== Pin Collision Tests ====================

    #[test]
    fn test_pin_collision() {
        let raw = valid().with(keys::LED_PIN, 25i64);
        let err = violations_of(&raw);
        let v = err.for_key("relayPin").next().unwrap();
        assert_eq!(v.kind, ViolationKind::PinCollision);
        assert_eq!(v.reason, "GPIO25 already assigned to ledPin");
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_three_way_collision_names_every_role() {
        let raw = valid()
            .with(keys::LED_PIN, 4i64)
            .with(keys::RELAY_PIN, 4i64);
        let err = violations_of(&raw);
        assert!(err.has(ViolationKind::PinCollision, "ledPin"));
        assert!(err.has(ViolationKind::PinCollision, "relayPin"));
        let relay = err.for_key("relayPin").next().unwrap();
        assert_eq!(relay.reason, "GPIO4 already assigned to dhtPin, ledPin");
    }

    #[test]
    fn test_shared_bus_exemption() {
        let raw = valid().with(keys::PIR_PIN, 21i64);
        assert!(resolve_esp32(&raw).is_err());

        let board = Board::esp32().with_shared_bus([PinRole::I2cSda, PinRole::Pir]);
        let profile = resolve(&raw, &board).unwrap();
        assert_eq!(profile.pins.get(PinRole::Pir), 21);

        // Declaring only one side does not exempt the pin
        let board = Board::esp32().with_shared_bus([PinRole::I2cSda]);
        assert!(resolve(&raw, &board).is_err());
    }

    // ==================== Aggregation Tests ====================

    #[test]
    fn test_violations_in_phase_order() {
        let mut raw = valid()
            .with(keys::MQTT_PORT, 70000i64)
            .with(keys::SENSOR_READ_INTERVAL_MS, 9000i64)
            .with(keys::LED_PIN, 25i64);
        raw.remove(keys::LOCATION);
        let err = violations_of(&raw);
        let order: Vec<(&str, ViolationKind)> = err
            .violations()
            .iter()
            .map(|v| (v.key.as_str(), v.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                ("location", ViolationKind::MissingRequired),
                ("mqttPort", ViolationKind::OutOfRange),
                ("dataSendIntervalMs", ViolationKind::OutOfRange),
                ("relayPin", ViolationKind::PinCollision),
            ]
        );
    }

    #[test]
    fn test_assembly_failure_is_reported_not_panicked() {
        let err = assembly_failed();
        assert_eq!(err.len(), 1);
        assert!(err.has(ViolationKind::OutOfRange, "profile"));
    }
}
