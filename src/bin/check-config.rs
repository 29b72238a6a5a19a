//! Provisioning file checker.
//!
//! Loads a provisioning document, resolves it against the ESP32 board and
//! either lists every violation or prints the resolved profile (credentials
//! redacted) as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin check-config -- path/to/provisioning.json
//! cargo run --bin check-config -- --with-defaults path/to/partial.json
//! ```
//!
//! Without a path, `~/.multirubro-node/provisioning.json` is used.
//! `--with-defaults` fills keys missing from the file with factory defaults.

#[cfg(not(target_os = "espidf"))]
use log::{error, info, warn};
#[cfg(not(target_os = "espidf"))]
use multirubro_node_esp32::persistence_host::{default_provisioning_path, load_provisioning_from};
#[cfg(not(target_os = "espidf"))]
use multirubro_node_esp32::{resolve_esp32, RawConfig};
#[cfg(not(target_os = "espidf"))]
use std::path::PathBuf;

#[cfg(target_os = "espidf")]
fn main() {
    println!("check-config runs on the host only.");
}

#[cfg(not(target_os = "espidf"))]
fn usage() -> ! {
    eprintln!("Usage: check-config [--with-defaults] [PATH]");
    std::process::exit(2);
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut with_defaults = false;
    let mut path: Option<PathBuf> = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--with-defaults" => with_defaults = true,
            "-h" | "--help" => usage(),
            flag if flag.starts_with('-') => {
                eprintln!("Unknown option: {}", flag);
                usage();
            }
            _ if path.is_some() => usage(),
            _ => path = Some(PathBuf::from(&arg)),
        }
    }

    let path = match path.map(Ok).unwrap_or_else(default_provisioning_path) {
        Ok(path) => path,
        Err(e) => {
            error!("Cannot determine provisioning path: {}", e);
            std::process::exit(1);
        }
    };

    let raw = match load_provisioning_from(&path) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            error!("No provisioning file at {:?}", path);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load {:?}: {}", path, e);
            std::process::exit(1);
        }
    };

    let raw = if with_defaults {
        let defaulted: Vec<&str> = multirubro_node_esp32::config::keys::ALL
            .iter()
            .copied()
            .filter(|k| !raw.contains(k))
            .collect();
        if !defaulted.is_empty() {
            warn!("Using factory defaults for: {}", defaulted.join(", "));
        }
        raw.with_fallback(&RawConfig::factory_defaults())
    } else {
        raw
    };

    match resolve_esp32(&raw) {
        Ok(profile) => {
            info!(
                "Profile OK: {} ({}, {}) at {}",
                profile.identity.device_id,
                profile.identity.device_type,
                profile.identity.rubro.display_name(),
                profile.identity.location
            );
            println!("{}", profile.to_json_pretty());
        }
        Err(e) => {
            e.log();
            std::process::exit(1);
        }
    }
}
