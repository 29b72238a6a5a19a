//! Provisioning file persistence for host (development) builds.
//!
//! Stores the node's raw provisioning document as JSON so it persists across
//! runs. Uses `~/.multirubro-node/provisioning.json` by default.
//!
//! # Usage
//!
//! ```ignore
//! use multirubro_node_esp32::persistence_host;
//!
//! let raw = persistence_host::load_or_create_provisioning()?;
//! let profile = multirubro_node_esp32::resolve_esp32(&raw)?;
//! log::info!("Node {} ready", profile.identity.device_id);
//! ```

use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{RawConfig, RawConfigError};

/// Errors loading or saving a provisioning file.
#[derive(Debug)]
pub enum ProvisioningError {
    /// Reading or writing the file failed.
    Io(io::Error),
    /// The file exists but does not hold a provisioning document.
    Parse(RawConfigError),
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "provisioning file I/O error: {}", e),
            Self::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProvisioningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for ProvisioningError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<RawConfigError> for ProvisioningError {
    fn from(e: RawConfigError) -> Self {
        Self::Parse(e)
    }
}

/// Get the default provisioning file path.
///
/// Returns `~/.multirubro-node/provisioning.json`
pub fn default_provisioning_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home)
        .join(".multirubro-node")
        .join("provisioning.json"))
}

/// Load a provisioning document from a specific path.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_provisioning_from(path: &Path) -> Result<Option<RawConfig>, ProvisioningError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No provisioning file found at {:?}", path);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let raw = RawConfig::from_json_str(&text)?;
    let unknown = raw.unknown_keys();
    if !unknown.is_empty() {
        warn!("Ignoring unknown provisioning keys in {:?}: {}", path, unknown.join(", "));
    }
    Ok(Some(raw))
}

/// Load the provisioning document from the default path.
pub fn load_provisioning() -> Result<Option<RawConfig>, ProvisioningError> {
    let path = default_provisioning_path()?;
    load_provisioning_from(&path)
}

/// Save a provisioning document to a specific path.
///
/// The document contains credentials in plaintext.
pub fn save_provisioning_to(raw: &RawConfig, path: &Path) -> Result<(), ProvisioningError> {
    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = raw.to_json_string_pretty();
    fs::write(path, &json)?;

    // Verify write by reading back
    let read_back = fs::read_to_string(path)?;
    if read_back != json {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Provisioning verification failed: wrote {} bytes, read {} bytes",
                json.len(),
                read_back.len()
            ),
        )
        .into());
    }

    info!("Provisioning saved to {:?}", path);
    Ok(())
}

/// Save a provisioning document to the default path.
pub fn save_provisioning(raw: &RawConfig) -> Result<(), ProvisioningError> {
    let path = default_provisioning_path()?;
    save_provisioning_to(raw, &path)
}

/// Load the provisioning document at `path`, or write factory defaults there.
pub fn load_or_create_provisioning_at(path: &Path) -> Result<RawConfig, ProvisioningError> {
    if let Some(raw) = load_provisioning_from(path)? {
        info!("Loaded provisioning from {:?}", path);
        return Ok(raw);
    }

    info!("Writing factory default provisioning");
    let raw = RawConfig::factory_defaults();
    save_provisioning_to(&raw, path)?;
    Ok(raw)
}

/// Load the provisioning document or create one using the default path.
///
/// On first run, writes the factory defaults so an operator has a complete
/// file to edit. On subsequent runs, loads the existing document.
pub fn load_or_create_provisioning() -> Result<RawConfig, ProvisioningError> {
    let path = default_provisioning_path()?;
    load_or_create_provisioning_at(&path)
}
