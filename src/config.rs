/*
 * This file is part of Navtemp.
 *
 * Copyright (C) 2025 Navtemp contributors
 *
 * Navtemp is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Navtemp is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Navtemp. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Persisted display settings. Field names on the wire match the host
/// settings subsystem keys, so a settings payload saved by the UI
/// deserializes directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(rename = "displayTempSoC", default = "default_true")]
    pub display_temp_soc: bool,
    #[serde(rename = "displayTempGPIO", default = "default_true")]
    pub display_temp_gpio: bool,
    #[serde(rename = "piSocTypes", default = "default_soc_types")]
    pub pi_soc_types: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_soc_types() -> Vec<String> {
    vec![
        "BCM2708".to_string(),
        "BCM2709".to_string(),
        "BCM2835".to_string(),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            display_temp_soc: true,
            display_temp_gpio: true,
            pi_soc_types: default_soc_types(),
        }
    }
}

pub fn settings_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("navtemp").join("settings.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("navtemp")
            .join("settings.json");
    }
    PathBuf::from("/etc/navtemp/settings.json")
}

/// Load settings, falling back to defaults when the file is missing or
/// unparsable. A broken settings file must not keep the sampler down.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str::<Settings>(&data) {
            Ok(s) if validate_settings(&s).is_ok() => s,
            _ => Settings::default(),
        },
        Err(_) => Settings::default(),
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let json = serde_json::to_string_pretty(settings).unwrap_or_else(|_| "{}".to_string());
    fs::write(path, json)
}

pub fn validate_settings(settings: &Settings) -> Result<(), String> {
    if settings.pi_soc_types.is_empty() {
        return Err("recognized SoC list must not be empty".to_string());
    }
    if settings.pi_soc_types.len() > 64 {
        return Err("too many recognized SoC identifiers (max 64)".to_string());
    }
    for id in &settings.pi_soc_types {
        if id.is_empty() || id.len() > 32 {
            return Err(format!("invalid SoC identifier {:?}", id));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(format!("invalid characters in SoC identifier {:?}", id));
        }
    }
    Ok(())
}
