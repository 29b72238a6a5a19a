//! Resolved device profile.
//!
//! A [`DeviceProfile`] is only ever produced by [`super::resolve`]; every
//! value in it has passed validation. It is never mutated afterwards, so it
//! can be shared freely (`&DeviceProfile` or `Arc<DeviceProfile>`) between
//! the sensor loop, the transport layer and the power manager.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::device::{DeviceType, Rubro};
use super::keys;
use super::network::NetworkSettings;
use super::raw::RawConfig;
use super::secret::Secret;

/// Logical pin assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRole {
    /// Analog input of the primary sensor.
    Sensor,
    /// DHT22 data line.
    Dht,
    /// PIR motion sensor.
    Pir,
    /// Status LED.
    Led,
    /// Relay output.
    Relay,
    I2cSda,
    I2cScl,
    /// Battery voltage divider.
    Battery,
}

impl PinRole {
    pub const ALL: [PinRole; 8] = [
        Self::Sensor,
        Self::Dht,
        Self::Pir,
        Self::Led,
        Self::Relay,
        Self::I2cSda,
        Self::I2cScl,
        Self::Battery,
    ];

    /// Provisioning key for this role.
    pub fn key(self) -> &'static str {
        match self {
            Self::Sensor => keys::SENSOR_PIN,
            Self::Dht => keys::DHT_PIN,
            Self::Pir => keys::PIR_PIN,
            Self::Led => keys::LED_PIN,
            Self::Relay => keys::RELAY_PIN,
            Self::I2cSda => keys::I2C_SDA,
            Self::I2cScl => keys::I2C_SCL,
            Self::Battery => keys::BATTERY_PIN,
        }
    }

    /// Role must be sampled by the ADC.
    pub fn needs_adc(self) -> bool {
        matches!(self, Self::Sensor | Self::Battery)
    }

    /// Role drives the line at some point (output or bidirectional).
    pub fn drives_output(self) -> bool {
        matches!(
            self,
            Self::Dht | Self::Led | Self::Relay | Self::I2cSda | Self::I2cScl
        )
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Logical role → physical GPIO number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinMap(BTreeMap<PinRole, u8>);

impl PinMap {
    pub(crate) fn new(pins: BTreeMap<PinRole, u8>) -> Self {
        Self(pins)
    }

    /// Physical pin for a role. Every role is present in a resolved profile.
    pub fn get(&self, role: PinRole) -> u8 {
        self.0.get(&role).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PinRole, u8)> + '_ {
        self.0.iter().map(|(role, pin)| (*role, *pin))
    }

    /// Roles grouped by physical pin.
    pub fn by_pin(&self) -> BTreeMap<u8, Vec<PinRole>> {
        let mut groups: BTreeMap<u8, Vec<PinRole>> = BTreeMap::new();
        for (role, pin) in self.iter() {
            groups.entry(pin).or_default().push(role);
        }
        groups
    }
}

/// Linear calibration of the primary sensor: `value = raw * scale + offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorCalibration {
    pub scale: f64,
    pub offset: f64,
    pub unit: String,
}

impl SensorCalibration {
    /// Apply the calibration to a raw reading.
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

/// ADC characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdcConfig {
    /// Full-scale count (4096 for 12-bit).
    pub resolution: u32,
    /// Reference voltage in volts.
    pub reference_voltage: f64,
}

impl AdcConfig {
    /// Convert an ADC count to volts.
    pub fn to_volts(&self, counts: u32) -> f64 {
        let full_scale = self.resolution.saturating_sub(1);
        counts.min(full_scale) as f64 / full_scale.max(1) as f64 * self.reference_voltage
    }
}

/// All calibration constants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calibration {
    pub sensor: SensorCalibration,
    /// Added to temperature readings (°C).
    pub temp_offset: f64,
    /// Added to humidity readings (%).
    pub hum_offset: f64,
    pub adc: AdcConfig,
}

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timing {
    #[serde(serialize_with = "millis")]
    pub read_interval: Duration,
    #[serde(serialize_with = "millis")]
    pub send_interval: Duration,
    #[serde(serialize_with = "millis")]
    pub heartbeat_interval: Duration,
    #[serde(serialize_with = "millis")]
    pub reconnect_delay: Duration,
}

impl Timing {
    /// Readings taken per transmission.
    pub fn samples_per_send(&self) -> u128 {
        self.send_interval.as_millis() / self.read_interval.as_millis().max(1)
    }
}

fn millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn opt_secs<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs()),
        None => s.serialize_none(),
    }
}

/// Active data transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    Mqtt,
}

/// OTA update settings, present only when OTA is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtaSettings {
    pub password: Secret,
}

/// Feature toggles with their dependent fields folded in.
///
/// A dependent field only exists when its owning flag is set, so an enabled
/// feature without its settings cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Features {
    pub simulate_sensor: bool,
    pub debug_mode: bool,
    pub transport: Transport,
    /// Deep sleep duration, when deep sleep is enabled.
    #[serde(serialize_with = "opt_secs")]
    pub deep_sleep: Option<Duration>,
    pub ota: Option<OtaSettings>,
    /// Backend API key, only kept for the HTTP transport.
    pub api_key: Option<Secret>,
}

impl Features {
    pub fn use_mqtt(&self) -> bool {
        self.transport == Transport::Mqtt
    }

    pub fn enable_deep_sleep(&self) -> bool {
        self.deep_sleep.is_some()
    }

    pub fn enable_ota(&self) -> bool {
        self.ota.is_some()
    }
}

/// Who this node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub device_id: String,
    pub device_name: String,
    pub device_type: DeviceType,
    pub rubro: Rubro,
    pub location: String,
}

/// Validated, immutable operating parameters of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProfile {
    pub identity: Identity,
    pub network: NetworkSettings,
    pub pins: PinMap,
    pub calibration: Calibration,
    pub timing: Timing,
    pub features: Features,
}

impl DeviceProfile {
    /// Render back to a raw configuration.
    ///
    /// Resolving the result yields a profile equal to `self`. Credentials
    /// are included in plaintext, so treat the result as sensitive.
    pub fn to_raw(&self) -> RawConfig {
        let identity = &self.identity;
        let network = &self.network;
        let cal = &self.calibration;
        let features = &self.features;

        let mut raw = RawConfig::new()
            .with(keys::DEVICE_ID, identity.device_id.as_str())
            .with(keys::DEVICE_NAME, identity.device_name.as_str())
            .with(keys::DEVICE_TYPE, identity.device_type.as_str())
            .with(keys::RUBRO, identity.rubro.as_str())
            .with(keys::LOCATION, identity.location.as_str())
            .with(keys::WIFI_SSID, network.wifi.ssid.as_str())
            .with(keys::WIFI_PASSWORD, network.wifi.password.expose())
            .with(keys::API_BASE_URL, network.api_base_url.as_str())
            .with(keys::SENSOR_SCALE, cal.sensor.scale)
            .with(keys::SENSOR_OFFSET, cal.sensor.offset)
            .with(keys::SENSOR_UNIT, cal.sensor.unit.as_str())
            .with(keys::TEMP_OFFSET, cal.temp_offset)
            .with(keys::HUM_OFFSET, cal.hum_offset)
            .with(keys::ADC_RESOLUTION, cal.adc.resolution as i64)
            .with(keys::ADC_VOLTAGE, cal.adc.reference_voltage)
            .with(
                keys::SENSOR_READ_INTERVAL_MS,
                self.timing.read_interval.as_millis() as i64,
            )
            .with(
                keys::DATA_SEND_INTERVAL_MS,
                self.timing.send_interval.as_millis() as i64,
            )
            .with(
                keys::HEARTBEAT_INTERVAL_MS,
                self.timing.heartbeat_interval.as_millis() as i64,
            )
            .with(
                keys::RECONNECT_DELAY_MS,
                self.timing.reconnect_delay.as_millis() as i64,
            )
            .with(keys::SIMULATE_SENSOR, features.simulate_sensor)
            .with(keys::DEBUG_MODE, features.debug_mode)
            .with(keys::USE_MQTT, features.use_mqtt())
            .with(keys::ENABLE_DEEP_SLEEP, features.enable_deep_sleep())
            .with(keys::ENABLE_OTA, features.enable_ota());

        for (role, pin) in self.pins.iter() {
            raw.set(role.key(), pin as i64);
        }
        if let Some(mqtt) = &network.mqtt {
            raw.set(keys::MQTT_BROKER, mqtt.host.as_str());
            raw.set(keys::MQTT_PORT, mqtt.port as i64);
            raw.set(keys::MQTT_TOPIC_DATA, mqtt.topic_data.as_str());
            raw.set(keys::MQTT_TOPIC_STATUS, mqtt.topic_status.as_str());
        }
        if let Some(sleep) = features.deep_sleep {
            raw.set(keys::SLEEP_DURATION_SEC, sleep.as_secs() as i64);
        }
        if let Some(ota) = &features.ota {
            raw.set(keys::OTA_PASSWORD, ota.password.expose());
        }
        if let Some(api_key) = &features.api_key {
            raw.set(keys::API_KEY, api_key.expose());
        }
        raw
    }

    /// Redacted JSON rendering, safe to log or print.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
