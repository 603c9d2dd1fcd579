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
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use crate::logger;
use crate::system;

const W1_DEVICES_DIR: &str = "/sys/bus/w1/devices";

/// DS18B20-family devices register under the one-wire bus with this prefix.
const PROBE_PREFIX: &str = "28";

/// Sentinel surfaced to the UI when the probe cannot be read.
pub const PROBE_ERR: &str = "err";

const READY_RETRIES: u32 = 5;
const READY_RETRY_PAUSE: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("no one-wire probe found")]
    NoProbe,
    #[error("probe not ready after {0} attempts")]
    NotReady(u32),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Read the external one-wire probe. Returns a formatted Celsius string with
/// one decimal, or the literal "err" sentinel the UI displays verbatim.
/// Nothing here propagates to the scheduler.
pub fn read_external_probe() -> String {
    // Safe to repeat; the kernel treats an already-loaded module as a no-op.
    system::load_probe_modules();
    match read_probe_at(Path::new(W1_DEVICES_DIR)) {
        Ok(temp_c) => format!("{:.1}", temp_c),
        Err(e) => {
            logger::log_event("probe_read_failed", json!({ "error": e.to_string() }));
            PROBE_ERR.to_string()
        }
    }
}

/// Typed read path against an arbitrary device directory root.
pub fn read_probe_at(devices_dir: &Path) -> Result<f64, ProbeError> {
    let device_file = find_probe(devices_dir)?.join("w1_slave");
    let lines = read_ready_lines(&device_file)?;
    parse_probe_output(&lines.1)
}

/// Locate the active probe: the first directory entry (sorted, for a stable
/// choice when several probes are attached) starting with the family prefix.
fn find_probe(devices_dir: &Path) -> Result<PathBuf, ProbeError> {
    let mut matches: Vec<PathBuf> = Vec::new();
    let entries = match fs::read_dir(devices_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ProbeError::NoProbe),
        Err(e) => return Err(e.into()),
    };
    for ent in entries.flatten() {
        let name = ent.file_name();
        if name.to_string_lossy().starts_with(PROBE_PREFIX) {
            matches.push(ent.path());
        }
    }
    matches.sort();
    matches.into_iter().next().ok_or(ProbeError::NoProbe)
}

/// Read the two-line w1_slave payload, waiting for the bus to report a valid
/// CRC. The upstream implementation's retry countdown could never fire; this
/// is the intended bounded retry (5 attempts, 100ms apart).
fn read_ready_lines(device_file: &Path) -> Result<(String, String), ProbeError> {
    wait_for_ready(|| read_two_lines(device_file))
}

fn wait_for_ready<F>(mut read: F) -> Result<(String, String), ProbeError>
where
    F: FnMut() -> Result<(String, String), ProbeError>,
{
    let mut attempts = READY_RETRIES;
    loop {
        let lines = read()?;
        if lines.0.trim_end().ends_with("YES") {
            return Ok(lines);
        }
        if attempts == 0 {
            return Err(ProbeError::NotReady(READY_RETRIES));
        }
        attempts -= 1;
        thread::sleep(READY_RETRY_PAUSE);
    }
}

fn read_two_lines(device_file: &Path) -> Result<(String, String), ProbeError> {
    let raw = fs::read_to_string(device_file)?;
    let mut it = raw.lines();
    let first = it
        .next()
        .ok_or_else(|| ProbeError::Parse("empty device file".to_string()))?;
    let second = it
        .next()
        .ok_or_else(|| ProbeError::Parse("missing data line".to_string()))?;
    Ok((first.to_string(), second.to_string()))
}

/// Parse the data line: the digits after "t=" are millidegrees Celsius.
pub fn parse_probe_output(data_line: &str) -> Result<f64, ProbeError> {
    let pos = data_line
        .find("t=")
        .ok_or_else(|| ProbeError::Parse(format!("no t= marker in {:?}", data_line)))?;
    let digits = data_line[pos + 2..].trim();
    let raw: i64 = digits
        .parse()
        .map_err(|_| ProbeError::Parse(format!("bad reading {:?}", digits)))?;
    Ok(((raw as f64) / 100.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const READY_OUTPUT: &str =
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23456\n";
    const NOT_READY_OUTPUT: &str =
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23456\n";

    fn make_probe(dir: &TempDir, name: &str, contents: &str) {
        let probe_dir = dir.path().join(name);
        fs::create_dir_all(&probe_dir).unwrap();
        fs::write(probe_dir.join("w1_slave"), contents).unwrap();
    }

    #[test]
    fn reads_temperature_from_ready_probe() {
        let dir = TempDir::new().unwrap();
        make_probe(&dir, "28-000005e2fdc3", READY_OUTPUT);
        let temp = read_probe_at(dir.path()).unwrap();
        assert_eq!(temp, 23.5);
    }

    #[test]
    fn ignores_non_probe_entries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("w1_bus_master1")).unwrap();
        make_probe(&dir, "28-000005e2fdc3", READY_OUTPUT);
        assert_eq!(read_probe_at(dir.path()).unwrap(), 23.5);
    }

    #[test]
    fn picks_first_probe_when_several_attached() {
        let dir = TempDir::new().unwrap();
        make_probe(
            &dir,
            "28-000005e2fdc3",
            "x : crc=57 YES\nx t=20000\n",
        );
        make_probe(
            &dir,
            "28-0000077a11bb",
            "x : crc=57 YES\nx t=30000\n",
        );
        // Sorted order makes 28-000005e2fdc3 the active probe
        assert_eq!(read_probe_at(dir.path()).unwrap(), 20.0);
    }

    #[test]
    fn no_probe_is_explicit_not_a_panic() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("w1_bus_master1")).unwrap();
        assert!(matches!(read_probe_at(dir.path()), Err(ProbeError::NoProbe)));
    }

    #[test]
    fn missing_devices_dir_is_no_probe() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        assert!(matches!(read_probe_at(&missing), Err(ProbeError::NoProbe)));
    }

    #[test]
    fn persistent_crc_failure_exhausts_retries() {
        let dir = TempDir::new().unwrap();
        make_probe(&dir, "28-000005e2fdc3", NOT_READY_OUTPUT);
        assert!(matches!(
            read_probe_at(dir.path()),
            Err(ProbeError::NotReady(5))
        ));
    }

    #[test]
    fn transient_crc_failure_recovers_within_retry_budget() {
        let mut calls = 0u32;
        let lines = wait_for_ready(|| {
            calls += 1;
            if calls < 3 {
                Ok(("x : crc=57 NO".to_string(), "x t=23456".to_string()))
            } else {
                Ok(("x : crc=57 YES".to_string(), "x t=23456".to_string()))
            }
        })
        .unwrap();
        // Two failed reads, then the CRC settles on the third
        assert_eq!(calls, 3);
        assert_eq!(parse_probe_output(&lines.1).unwrap(), 23.5);
    }

    #[test]
    fn ready_wait_gives_up_after_bounded_attempts() {
        let mut calls = 0u32;
        let result = wait_for_ready(|| {
            calls += 1;
            Ok(("x : crc=57 NO".to_string(), "x t=23456".to_string()))
        });
        assert!(matches!(result, Err(ProbeError::NotReady(5))));
        // Initial read plus five retries
        assert_eq!(calls, 6);
    }

    #[test]
    fn parse_probe_output_rounds_to_one_decimal() {
        assert_eq!(parse_probe_output("aa bb t=23456").unwrap(), 23.5);
        assert_eq!(parse_probe_output("aa bb t=23440").unwrap(), 23.4);
        assert_eq!(parse_probe_output("aa bb t=-1275").unwrap(), -1.3);
    }

    #[test]
    fn parse_probe_output_rejects_missing_marker() {
        assert!(matches!(
            parse_probe_output("no temperature here"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[test]
    fn parse_probe_output_rejects_garbage_digits() {
        assert!(matches!(
            parse_probe_output("aa bb t=abc"),
            Err(ProbeError::Parse(_))
        ));
    }

    #[test]
    fn truncated_device_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        make_probe(&dir, "28-000005e2fdc3", "only one line YES\n");
        assert!(matches!(
            read_probe_at(dir.path()),
            Err(ProbeError::Parse(_))
        ));
    }
}
