//! Board capabilities.
//!
//! Which GPIOs exist, which can read analog values, and which are input-only
//! varies per board. The resolver checks pin assignments against a [`Board`]
//! supplied by the caller instead of hard-coding one chip.

use std::collections::BTreeSet;

use super::profile::PinRole;

/// Maximum reference voltage of the ESP32 ADC (11 dB attenuation).
pub const ESP32_MAX_ADC_VOLTAGE: f64 = 3.9;

/// Pin and ADC capabilities of a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Human-readable board name.
    pub name: &'static str,
    /// GPIOs usable by application code.
    pub gpio: BTreeSet<u8>,
    /// GPIOs that can be sampled by an ADC usable while WiFi is running.
    pub adc: BTreeSet<u8>,
    /// GPIOs that cannot drive an output.
    pub input_only: BTreeSet<u8>,
    /// Supported ADC full-scale counts.
    pub adc_resolutions: BTreeSet<u32>,
    /// Highest ADC reference voltage.
    pub max_adc_voltage: f64,
    /// Roles declared as lines of a shared bus. Roles in this set may share
    /// a physical pin with each other without being reported as colliding.
    pub shared_bus: BTreeSet<PinRole>,
}

impl Board {
    /// Classic ESP32 (ESP32-WROOM-32 / DevKitC).
    ///
    /// GPIO6-11 are wired to the SPI flash and excluded. Only ADC1
    /// (GPIO32-39) is listed as analog since ADC2 is unavailable while
    /// WiFi is active. GPIO34-39 are input-only. No roles are shared-bus
    /// lines; callers opt in with [`Board::with_shared_bus`] (e.g. I2C SDA/SCL).
    pub fn esp32() -> Self {
        let gpio = [0u8, 1, 2, 3, 4, 5]
            .into_iter()
            .chain(12..=19)
            .chain(21..=23)
            .chain(25..=27)
            .chain(32..=39)
            .collect();
        Self {
            name: "esp32",
            gpio,
            adc: (32..=39).collect(),
            input_only: (34..=39).collect(),
            adc_resolutions: [512, 1024, 2048, 4096].into_iter().collect(),
            max_adc_voltage: ESP32_MAX_ADC_VOLTAGE,
            shared_bus: BTreeSet::new(),
        }
    }

    /// Declare roles as shared-bus lines.
    pub fn with_shared_bus(mut self, roles: impl IntoIterator<Item = PinRole>) -> Self {
        self.shared_bus.extend(roles);
        self
    }

    pub fn is_gpio(&self, pin: u8) -> bool {
        self.gpio.contains(&pin)
    }

    pub fn is_adc(&self, pin: u8) -> bool {
        self.adc.contains(&pin)
    }

    pub fn is_input_only(&self, pin: u8) -> bool {
        self.input_only.contains(&pin)
    }

    pub fn supports_resolution(&self, counts: u32) -> bool {
        self.adc_resolutions.contains(&counts)
    }

    /// Check whether every role in `roles` is a declared shared-bus line.
    pub fn all_shared(&self, roles: &[PinRole]) -> bool {
        roles.iter().all(|r| self.shared_bus.contains(r))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::esp32()
    }
}
