//! Provisioning key names.
//!
//! These mirror the configuration surface of the node firmware. Every raw
//! provisioning source (JSON document, build-time definitions, NVS blob) uses
//! exactly these names.

// Identity
pub const DEVICE_ID: &str = "deviceId";
pub const DEVICE_NAME: &str = "deviceName";
pub const DEVICE_TYPE: &str = "deviceType";
pub const RUBRO: &str = "rubro";
pub const LOCATION: &str = "location";

// Network
pub const WIFI_SSID: &str = "wifiSsid";
pub const WIFI_PASSWORD: &str = "wifiPassword";
pub const API_BASE_URL: &str = "apiBaseUrl";
pub const MQTT_BROKER: &str = "mqttBroker";
pub const MQTT_PORT: &str = "mqttPort";
pub const MQTT_TOPIC_DATA: &str = "mqttTopicData";
pub const MQTT_TOPIC_STATUS: &str = "mqttTopicStatus";

// Pins
pub const SENSOR_PIN: &str = "sensorPin";
pub const DHT_PIN: &str = "dhtPin";
pub const PIR_PIN: &str = "pirPin";
pub const LED_PIN: &str = "ledPin";
pub const RELAY_PIN: &str = "relayPin";
pub const I2C_SDA: &str = "i2cSda";
pub const I2C_SCL: &str = "i2cScl";
pub const BATTERY_PIN: &str = "batteryPin";

// Calibration
pub const SENSOR_SCALE: &str = "sensorScale";
pub const SENSOR_OFFSET: &str = "sensorOffset";
pub const SENSOR_UNIT: &str = "sensorUnit";
pub const TEMP_OFFSET: &str = "tempOffset";
pub const HUM_OFFSET: &str = "humOffset";
pub const ADC_RESOLUTION: &str = "adcResolution";
pub const ADC_VOLTAGE: &str = "adcVoltage";

// Timing
pub const SENSOR_READ_INTERVAL_MS: &str = "sensorReadIntervalMs";
pub const DATA_SEND_INTERVAL_MS: &str = "dataSendIntervalMs";
pub const HEARTBEAT_INTERVAL_MS: &str = "heartbeatIntervalMs";
pub const RECONNECT_DELAY_MS: &str = "reconnectDelayMs";

// Feature flags and their dependent fields
pub const SIMULATE_SENSOR: &str = "simulateSensor";
pub const DEBUG_MODE: &str = "debugMode";
pub const USE_MQTT: &str = "useMqtt";
pub const USE_HTTP: &str = "useHttp";
pub const ENABLE_DEEP_SLEEP: &str = "enableDeepSleep";
pub const SLEEP_DURATION_SEC: &str = "sleepDurationSec";
pub const ENABLE_OTA: &str = "enableOta";
pub const OTA_PASSWORD: &str = "otaPassword";
pub const API_KEY: &str = "apiKey";

/// Every key the resolver understands.
pub const ALL: &[&str] = &[
    DEVICE_ID,
    DEVICE_NAME,
    DEVICE_TYPE,
    RUBRO,
    LOCATION,
    WIFI_SSID,
    WIFI_PASSWORD,
    API_BASE_URL,
    MQTT_BROKER,
    MQTT_PORT,
    MQTT_TOPIC_DATA,
    MQTT_TOPIC_STATUS,
    SENSOR_PIN,
    DHT_PIN,
    PIR_PIN,
    LED_PIN,
    RELAY_PIN,
    I2C_SDA,
    I2C_SCL,
    BATTERY_PIN,
    SENSOR_SCALE,
    SENSOR_OFFSET,
    SENSOR_UNIT,
    TEMP_OFFSET,
    HUM_OFFSET,
    ADC_RESOLUTION,
    ADC_VOLTAGE,
    SENSOR_READ_INTERVAL_MS,
    DATA_SEND_INTERVAL_MS,
    HEARTBEAT_INTERVAL_MS,
    RECONNECT_DELAY_MS,
    SIMULATE_SENSOR,
    DEBUG_MODE,
    USE_MQTT,
    USE_HTTP,
    ENABLE_DEEP_SLEEP,
    SLEEP_DURATION_SEC,
    ENABLE_OTA,
    OTA_PASSWORD,
    API_KEY,
];

/// Keys whose values are credentials and must never be echoed back.
pub const SECRETS: &[&str] = &[WIFI_PASSWORD, OTA_PASSWORD, API_KEY];

/// Check whether `key` is part of the known configuration surface.
pub fn is_known(key: &str) -> bool {
    ALL.contains(&key)
}

/// Check whether `key` holds a credential.
pub fn is_secret(key: &str) -> bool {
    SECRETS.contains(&key)
}
