//! Device categories.
//!
//! Both [`DeviceType`] and [`Rubro`] are open sets: known values get typed
//! variants, anything else is kept verbatim in `Other`.

use std::fmt;

use serde::{Serialize, Serializer};

/// Physical measurement range of a sensor kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorLimits {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl SensorLimits {
    const fn new(min: f64, max: f64, unit: &'static str) -> Self {
        Self { min, max, unit }
    }

    /// Width of the range.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Digital sensor tags from the deployment presets that have no typed variant.
const DIGITAL_TAGS: [&str; 2] = ["door_state", "rain"];

/// What the node primarily measures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Temperature,
    Humidity,
    Motion,
    Pressure,
    Weight,
    Flow,
    Luminosity,
    Distance,
    Noise,
    SoilMoisture,
    Other(String),
}

impl DeviceType {
    /// Parse a tag. Matching is case-insensitive; unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "temperature" => Self::Temperature,
            "humidity" => Self::Humidity,
            "motion" => Self::Motion,
            "pressure" => Self::Pressure,
            "weight" => Self::Weight,
            "flow" => Self::Flow,
            "luminosity" => Self::Luminosity,
            "distance" => Self::Distance,
            "noise" => Self::Noise,
            "soil_moisture" => Self::SoilMoisture,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Motion => "motion",
            Self::Pressure => "pressure",
            Self::Weight => "weight",
            Self::Flow => "flow",
            Self::Luminosity => "luminosity",
            Self::Distance => "distance",
            Self::Noise => "noise",
            Self::SoilMoisture => "soil_moisture",
            Self::Other(tag) => tag,
        }
    }

    /// Physical limits for known sensor kinds.
    pub fn limits(&self) -> Option<SensorLimits> {
        let limits = match self {
            Self::Temperature => SensorLimits::new(-40.0, 125.0, "°C"),
            Self::Humidity => SensorLimits::new(0.0, 100.0, "%"),
            Self::Motion => SensorLimits::new(0.0, 1.0, "bool"),
            Self::Pressure => SensorLimits::new(300.0, 1100.0, "hPa"),
            Self::Weight => SensorLimits::new(0.0, 500.0, "kg"),
            Self::Flow => SensorLimits::new(0.0, 100.0, "L/min"),
            Self::Luminosity => SensorLimits::new(0.0, 100_000.0, "lux"),
            Self::Distance => SensorLimits::new(2.0, 400.0, "cm"),
            Self::Noise => SensorLimits::new(30.0, 130.0, "dB"),
            Self::SoilMoisture => SensorLimits::new(0.0, 100.0, "%"),
            Self::Other(_) => return None,
        };
        Some(limits)
    }

    /// Whether the primary reading comes from the analog sensor pin.
    ///
    /// Temperature and humidity are read from the DHT, motion from the PIR.
    /// Door contacts and rain switches are digital inputs.
    pub fn is_analog(&self) -> bool {
        match self {
            Self::Temperature | Self::Humidity | Self::Motion => false,
            Self::Other(tag) => !DIGITAL_TAGS.iter().any(|d| d.eq_ignore_ascii_case(tag)),
            _ => true,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DeviceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Business category of the deployment site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rubro {
    /// Butcher shop / bakery.
    Carniceria,
    /// Clothing store.
    TiendaRopa,
    /// Medical center.
    CentroMedico,
    /// Bar / nightclub.
    BarBoliche,
    /// Irrigation.
    Riego,
    Other(String),
}

impl Rubro {
    /// Parse a tag. Matching is case-insensitive; unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "carniceria" => Self::Carniceria,
            "tienda_ropa" => Self::TiendaRopa,
            "centro_medico" => Self::CentroMedico,
            "bar_boliche" | "bar" => Self::BarBoliche,
            "riego" => Self::Riego,
            _ => Self::Other(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Carniceria => "carniceria",
            Self::TiendaRopa => "tienda_ropa",
            Self::CentroMedico => "centro_medico",
            Self::BarBoliche => "bar_boliche",
            Self::Riego => "riego",
            Self::Other(tag) => tag,
        }
    }

    /// Display name of the deployment preset.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Carniceria => "Butcher Shop / Bakery",
            Self::TiendaRopa => "Clothing Store",
            Self::CentroMedico => "Medical Center",
            Self::BarBoliche => "Bar / Nightclub",
            Self::Riego => "Irrigation System",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for Rubro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Rubro {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
