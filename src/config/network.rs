//! Network settings: WiFi credentials, backend URL and MQTT endpoint.
//!
//! # Example
//!
//! ```
//! use multirubro_node_esp32::config::{ApiUrl, WifiConfig};
//!
//! let wifi = WifiConfig::new("MyNetwork", "MyPassword").unwrap();
//! assert!(!wifi.is_open());
//!
//! let url: ApiUrl = "http://192.168.1.100:8000".parse().unwrap();
//! assert_eq!(url.port(), 8000);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::{ConfigError, Violation, ViolationKind};
use super::keys;
use super::secret::Secret;

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Minimum password length for WPA2.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Backend endpoint that receives sensor readings over HTTP.
pub const DATA_ENDPOINT: &str = "/api/data";

/// Check an SSID, returning the reason it is invalid.
pub fn check_ssid(ssid: &str) -> Result<(), String> {
    if ssid.is_empty() {
        return Err("SSID cannot be empty".into());
    }
    if ssid.len() > MAX_SSID_LEN {
        return Err(format!(
            "SSID too long: {} bytes (max {})",
            ssid.len(),
            MAX_SSID_LEN
        ));
    }
    Ok(())
}

/// Check a WPA2 password. Empty means an open network and is accepted.
pub fn check_password(password: &str) -> Result<(), String> {
    if !password.is_empty() && password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password too short: {} bytes (min {})",
            password.len(),
            MIN_PASSWORD_LEN
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "password too long: {} bytes (max {})",
            password.len(),
            MAX_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// WiFi credentials for connecting to an access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiConfig {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network password (8-64 bytes for WPA2, empty for open networks).
    pub password: Secret,
}

impl WifiConfig {
    /// Create a validated WiFi configuration.
    ///
    /// Both fields are checked and every problem is reported.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Result<Self, ConfigError> {
        let ssid = ssid.into();
        let password = Secret::new(password);
        let mut violations = Vec::new();
        if let Err(reason) = check_ssid(&ssid) {
            violations.push(Violation::new(
                keys::WIFI_SSID,
                ViolationKind::OutOfRange,
                reason,
                Some(ssid.clone()),
            ));
        }
        if let Err(reason) = check_password(password.expose()) {
            violations.push(Violation::new(
                keys::WIFI_PASSWORD,
                ViolationKind::OutOfRange,
                reason,
                Some(String::new()),
            ));
        }
        match ConfigError::from_violations(violations) {
            Some(err) => Err(err),
            None => Ok(Self { ssid, password }),
        }
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

/// URL scheme accepted for the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Backend API base URL.
///
/// Only the parts a node needs are kept: scheme, host, port and an optional
/// path prefix. The original text is preserved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiUrl {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    path: String,
    #[serde(skip)]
    text: String,
}

impl ApiUrl {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Join an endpoint path onto the base URL.
    pub fn join(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.text.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

impl FromStr for ApiUrl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (scheme, rest) = text
            .split_once("://")
            .ok_or_else(|| "URL has no scheme".to_string())?;
        let scheme = match scheme.to_lowercase().as_str() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(format!("unsupported URL scheme '{}'", other)),
        };

        let (authority, path) = match rest.find(['/', '?', '#']) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if authority.contains('@') {
            return Err("URL must not embed credentials".into());
        }

        // Bracketed IPv6 literals keep their brackets in `host`
        let (host, port_text) = if authority.starts_with('[') {
            let end = authority
                .find(']')
                .ok_or_else(|| "unterminated IPv6 literal".to_string())?;
            let (host, tail) = authority.split_at(end + 1);
            match tail.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if tail.is_empty() => (host, None),
                None => return Err("garbage after IPv6 literal".into()),
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err("URL host contains ':' (IPv6 needs brackets)".into())
                }
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };
        let port = match port_text {
            Some(text) => Some(parse_port(text).map_err(|e| format!("URL {}", e))?),
            None => None,
        };
        if host.is_empty() {
            return Err("URL has no host".into());
        }
        if host.chars().any(char::is_whitespace) {
            return Err("URL host contains whitespace".into());
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path: path.trim_end_matches('/').to_string(),
            text: text.to_string(),
        })
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// MQTT broker endpoint and topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub topic_data: String,
    pub topic_status: String,
}

impl MqttEndpoint {
    /// Get the address string for connection (host:port).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a TCP port, rejecting 0 and values above 65535.
pub fn parse_port(text: &str) -> Result<u16, String> {
    let port: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("port '{}' is not a number", text))?;
    port_from_i64(port)
}

/// Range-check an integer port.
pub fn port_from_i64(port: i64) -> Result<u16, String> {
    if (1..=u16::MAX as i64).contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!("port {} out of range 1..=65535", port))
    }
}

/// Check an MQTT publish topic.
pub fn check_topic(topic: &str) -> Result<(), String> {
    if topic.is_empty() {
        return Err("topic cannot be empty".into());
    }
    if topic.contains(['+', '#']) {
        return Err("publish topic cannot contain wildcards".into());
    }
    if topic.contains('\0') {
        return Err("topic cannot contain NUL".into());
    }
    Ok(())
}

/// Check a broker host name or address.
pub fn check_host(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("host cannot be empty".into());
    }
    if host.chars().any(char::is_whitespace) {
        return Err("host contains whitespace".into());
    }
    Ok(())
}

/// Network section of a resolved profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSettings {
    pub wifi: WifiConfig,
    pub api_base_url: ApiUrl,
    /// Present whenever a broker is provisioned, even if HTTP is the
    /// active transport.
    pub mqtt: Option<MqttEndpoint>,
}
