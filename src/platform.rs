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

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::logger;

pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// What we learned about the host hardware at startup. Computed once by
/// [`detect`] and never revised for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformClassification {
    pub is_embedded_board: bool,
    pub soc_family: Option<String>,
}

impl PlatformClassification {
    pub fn unsupported() -> Self {
        PlatformClassification { is_embedded_board: false, soc_family: None }
    }
}

/// Outcome of the capability check against the configured SoC allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported,
    Unknown,
}

/// Classify the running platform. Non-Linux hosts and Linux hosts without an
/// embedded-board identity come back as unsupported; everything SoC-related
/// is inert from then on.
pub fn detect() -> PlatformClassification {
    #[cfg(not(target_os = "linux"))]
    {
        return PlatformClassification::unsupported();
    }

    #[cfg(target_os = "linux")]
    {
        let family = read_soc_family();
        let classification = PlatformClassification {
            is_embedded_board: family.is_some(),
            soc_family: family,
        };
        logger::log_event(
            "platform_detect",
            json!({
                "is_embedded_board": classification.is_embedded_board,
                "soc_family": classification.soc_family,
            }),
        );
        classification
    }
}

#[cfg(target_os = "linux")]
fn read_soc_family() -> Option<String> {
    // /proc/cpuinfo carries a "Hardware" key on ARM boards (e.g. BCM2835)
    if let Ok(s) = fs::read_to_string("/proc/cpuinfo") {
        if let Some(family) = parse_soc_family(&s) {
            return Some(family);
        }
    }
    // Fallback: device-tree compatible string, "brcm,bcm2835" style
    if let Ok(mut s) = fs::read_to_string("/proc/device-tree/compatible") {
        s.retain(|c| c != '\u{0}');
        if let Some(family) = parse_compatible(&s) {
            return Some(family);
        }
    }
    None
}

/// Extract the SoC family token from /proc/cpuinfo text. Pure so it can be
/// unit-tested against captured cpuinfo dumps.
pub fn parse_soc_family(cpuinfo: &str) -> Option<String> {
    for line in cpuinfo.lines() {
        if let Some((k, v)) = line.split_once(':') {
            if k.trim().eq_ignore_ascii_case("hardware") {
                let val = v.trim();
                if !val.is_empty() {
                    // "Hardware : BCM2835" -> first token is the family
                    return val.split_whitespace().next().map(|t| t.to_string());
                }
            }
        }
    }
    None
}

/// Extract a family token from a device-tree compatible string such as
/// "raspberrypi,4-model-bbrcm,bcm2711" (NUL separators already stripped).
pub fn parse_compatible(compatible: &str) -> Option<String> {
    for part in compatible.split(',') {
        let token = part.trim();
        if token.to_ascii_lowercase().starts_with("bcm") {
            return Some(token.to_ascii_uppercase());
        }
    }
    None
}

/// Membership check of the detected family against the configured allow-list.
/// Re-evaluated on every tick against current settings, never cached, so an
/// allow-list edit takes effect on the next sample without a restart.
pub fn soc_support(classification: &PlatformClassification, recognized: &[String]) -> Support {
    if !classification.is_embedded_board {
        return Support::Unknown;
    }
    match &classification.soc_family {
        Some(family) if recognized.iter().any(|r| r == family) => Support::Supported,
        _ => Support::Unsupported,
    }
}

/// Instantaneous SoC core temperature in Celsius, one decimal. Returns 0.0 on
/// any failure; the UI shows the sentinel as-is. This mirrors the host
/// contract (soctemp is always a number) rather than surfacing an error.
/// Callers pass [`THERMAL_ZONE_PATH`] outside of tests.
pub fn read_soc_temperature_at(path: &Path) -> f64 {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return 0.0,
    };
    match raw.trim().parse::<i64>() {
        // thermal_zone exposes millidegrees C
        Ok(mc) => ((mc as f64) / 100.0).round() / 10.0,
        Err(_) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const PI_CPUINFO: &str = "\
processor\t: 0\n\
model name\t: ARMv6-compatible processor rev 7 (v6l)\n\
BogoMIPS\t: 697.95\n\
Hardware\t: BCM2835\n\
Revision\t: 900093\n\
Serial\t\t: 00000000deadbeef\n";

    const X86_CPUINFO: &str = "\
processor\t: 0\n\
vendor_id\t: GenuineIntel\n\
model name\t: Intel(R) Core(TM) i7-8700K CPU @ 3.70GHz\n";

    #[test]
    fn parse_soc_family_from_pi_cpuinfo() {
        assert_eq!(parse_soc_family(PI_CPUINFO), Some("BCM2835".to_string()));
    }

    #[test]
    fn parse_soc_family_absent_on_x86() {
        assert_eq!(parse_soc_family(X86_CPUINFO), None);
    }

    #[test]
    fn parse_soc_family_ignores_empty_hardware_value() {
        assert_eq!(parse_soc_family("Hardware\t:   \n"), None);
    }

    #[test]
    fn parse_compatible_picks_bcm_token() {
        assert_eq!(
            parse_compatible("raspberrypi,4-model-bbrcm,bcm2711"),
            Some("BCM2711".to_string())
        );
        assert_eq!(parse_compatible("vendor,otherboard"), None);
    }

    #[test]
    fn soc_support_membership() {
        let recognized = vec![
            "BCM2708".to_string(),
            "BCM2709".to_string(),
            "BCM2835".to_string(),
        ];
        let c = PlatformClassification {
            is_embedded_board: true,
            soc_family: Some("BCM2835".to_string()),
        };
        assert_eq!(soc_support(&c, &recognized), Support::Supported);

        let c2 = PlatformClassification {
            is_embedded_board: true,
            soc_family: Some("BCM2712".to_string()),
        };
        assert_eq!(soc_support(&c2, &recognized), Support::Unsupported);

        let c3 = PlatformClassification {
            is_embedded_board: true,
            soc_family: None,
        };
        assert_eq!(soc_support(&c3, &recognized), Support::Unsupported);
    }

    #[test]
    fn soc_support_unknown_off_board() {
        let c = PlatformClassification::unsupported();
        assert_eq!(soc_support(&c, &["BCM2835".to_string()]), Support::Unknown);
    }

    #[test]
    fn soc_support_tracks_allow_list_changes() {
        let c = PlatformClassification {
            is_embedded_board: true,
            soc_family: Some("BCM2712".to_string()),
        };
        let mut recognized = vec!["BCM2835".to_string()];
        assert_eq!(soc_support(&c, &recognized), Support::Unsupported);
        recognized.push("BCM2712".to_string());
        assert_eq!(soc_support(&c, &recognized), Support::Supported);
    }

    #[test]
    fn soc_temperature_rounds_to_one_decimal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "48765").unwrap();
        assert_eq!(read_soc_temperature_at(&path), 48.8);
    }

    #[test]
    fn soc_temperature_sentinel_on_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_soc_temperature_at(&dir.path().join("nope")), 0.0);
    }

    #[test]
    fn soc_temperature_sentinel_on_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, "not-a-number").unwrap();
        assert_eq!(read_soc_temperature_at(&path), 0.0);
    }
}
