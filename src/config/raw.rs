//! Raw provisioning values.
//!
//! A [`RawConfig`] is a flat key → value set as supplied by a provisioning
//! source. Nothing here validates; see [`super::resolve`].
//!
//! # Example
//!
//! ```
//! use multirubro_node_esp32::config::{RawConfig, RawValue};
//!
//! let raw = RawConfig::from_json_str(r#"{"deviceId": "ESP32-001", "mqttPort": 1883}"#).unwrap();
//! assert_eq!(raw.get("mqttPort"), Some(&RawValue::Int(1883)));
//!
//! let raw = RawConfig::from_pairs([("sensorPin", "34")]);
//! assert_eq!(raw.get("sensorPin"), Some(&RawValue::Str("34".into())));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value};

use super::keys;

/// A single raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A value the source could express but the configuration surface
    /// cannot (JSON null, array, object, or an integer beyond `i64`).
    /// Always rejected as a type mismatch during resolution.
    Unsupported(&'static str),
}

impl RawValue {
    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Unsupported(kind) => kind,
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Str(s.clone()),
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if n.is_u64() {
                    Self::Unsupported("integer beyond i64")
                } else {
                    // Non-integral JSON numbers always have an f64 form
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::Null => Self::Unsupported("null"),
            Value::Array(_) => Self::Unsupported("array"),
            Value::Object(_) => Self::Unsupported("object"),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(b) => Value::Bool(*b),
            Self::Unsupported(_) => Value::Null,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Errors reading a raw provisioning document.
#[derive(Debug)]
pub enum RawConfigError {
    /// The document is not valid JSON.
    Json(serde_json::Error),
    /// The document is valid JSON but not a flat object.
    NotAnObject(&'static str),
}

impl fmt::Display for RawConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid provisioning JSON: {}", e),
            Self::NotAnObject(kind) => {
                write!(f, "provisioning document must be an object, got {}", kind)
            }
        }
    }
}

impl std::error::Error for RawConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::NotAnObject(_) => None,
        }
    }
}

impl From<serde_json::Error> for RawConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Flat set of raw provisioning values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConfig {
    values: BTreeMap<String, RawValue>,
}

impl RawConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<RawValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys that are not part of the configuration surface.
    ///
    /// The resolver ignores these; callers usually log them so typos in
    /// provisioning files are noticed.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| !keys::is_known(k))
            .collect()
    }

    /// Build from string pairs (environment variables, build-time defines).
    ///
    /// Values stay string-typed; the resolver coerces them.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), RawValue::Str(v.into())))
            .collect();
        Self { values }
    }

    /// Parse a flat JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, RawConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(&value)
    }

    /// Convert a flat JSON object.
    pub fn from_json_value(value: &Value) -> Result<Self, RawConfigError> {
        let object = match value {
            Value::Object(map) => map,
            Value::Null => return Err(RawConfigError::NotAnObject("null")),
            Value::Bool(_) => return Err(RawConfigError::NotAnObject("boolean")),
            Value::Number(_) => return Err(RawConfigError::NotAnObject("number")),
            Value::String(_) => return Err(RawConfigError::NotAnObject("string")),
            Value::Array(_) => return Err(RawConfigError::NotAnObject("array")),
        };
        let values = object
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
            .collect();
        Ok(Self { values })
    }

    /// Render as a flat JSON object.
    pub fn to_json_value(&self) -> Value {
        let map: Map<String, Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_string_pretty(&self) -> String {
        // Serializing a `Value` built from a map cannot fail
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_default()
    }

    /// Fill keys missing from `self` with values from `fallback`.
    ///
    /// Keys present in `self` always win, even when their value is invalid.
    pub fn with_fallback(&self, fallback: &RawConfig) -> RawConfig {
        let mut merged = fallback.clone();
        for (k, v) in &self.values {
            merged.values.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Values shipped with the stock node firmware.
    ///
    /// WiFi credentials are placeholders and the API address points at a
    /// LAN backend; a real device must override at least those.
    pub fn factory_defaults() -> Self {
        Self::new()
            .with(keys::DEVICE_ID, "ESP32-001")
            .with(keys::DEVICE_NAME, "ESP32 Sensor Node")
            .with(keys::DEVICE_TYPE, "temperature")
            .with(keys::RUBRO, "carniceria")
            .with(keys::LOCATION, "Main Room")
            .with(keys::WIFI_SSID, "YOUR_WIFI_SSID")
            .with(keys::WIFI_PASSWORD, "YOUR_WIFI_PASSWORD")
            .with(keys::API_BASE_URL, "http://192.168.1.100:8000")
            .with(keys::MQTT_BROKER, "192.168.1.100")
            .with(keys::MQTT_PORT, 1883i64)
            .with(keys::MQTT_TOPIC_DATA, "iot/data")
            .with(keys::MQTT_TOPIC_STATUS, "iot/status")
            .with(keys::SENSOR_PIN, 34i64)
            .with(keys::DHT_PIN, 4i64)
            .with(keys::PIR_PIN, 5i64)
            .with(keys::LED_PIN, 2i64)
            .with(keys::RELAY_PIN, 25i64)
            .with(keys::I2C_SDA, 21i64)
            .with(keys::I2C_SCL, 22i64)
            .with(keys::BATTERY_PIN, 35i64)
            .with(keys::SENSOR_SCALE, 1.0)
            .with(keys::SENSOR_OFFSET, 0.0)
            .with(keys::SENSOR_UNIT, "units")
            .with(keys::TEMP_OFFSET, 0.0)
            .with(keys::HUM_OFFSET, 0.0)
            .with(keys::ADC_RESOLUTION, 4096i64)
            .with(keys::ADC_VOLTAGE, 3.3)
            .with(keys::SENSOR_READ_INTERVAL_MS, 1000i64)
            .with(keys::DATA_SEND_INTERVAL_MS, 5000i64)
            .with(keys::HEARTBEAT_INTERVAL_MS, 30000i64)
            .with(keys::RECONNECT_DELAY_MS, 5000i64)
            .with(keys::SIMULATE_SENSOR, true)
            .with(keys::DEBUG_MODE, true)
            .with(keys::USE_MQTT, false)
            .with(keys::ENABLE_DEEP_SLEEP, false)
            .with(keys::SLEEP_DURATION_SEC, 60i64)
            .with(keys::ENABLE_OTA, true)
            .with(keys::OTA_PASSWORD, "iot-update")
            .with(keys::API_KEY, "")
    }
}
