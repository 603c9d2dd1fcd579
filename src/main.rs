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

mod app;
mod config;
mod logger;
mod platform;
mod probe;
mod sampler;
mod sink;
mod system;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use app::App;
use sink::StdoutSink;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Optional logging to /var/log/navtemp/events.json
    if args.iter().any(|a| a == "--logging") {
        logger::init_logging();
        logger::log_event("startup_args", serde_json::json!({ "args": args }));
    }

    // modprobe requires root; without it the probe path degrades to "err"
    // when the w1 bus is not already up.
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("navtemp: not running as root; one-wire modules may not autoload");
    }

    let debug_mode = args.iter().any(|a| a == "--debug");
    let settings_path: PathBuf = match args.iter().position(|a| a == "--config") {
        Some(i) => args
            .get(i + 1)
            .map(PathBuf::from)
            .context("--config requires a path argument")?,
        None => config::settings_path(),
    };

    let settings = config::load_settings(&settings_path);
    let classification = platform::detect();

    let mut app = App::new(
        classification,
        settings,
        settings_path.clone(),
        Arc::new(StdoutSink),
        debug_mode,
    );

    // One-shot mode: print a single sample and exit. Handy for wiring checks.
    if args.iter().any(|a| a == "--once") {
        let sample = app.sampler().sample_once();
        println!("{}", sample.to_payload());
        return Ok(());
    }

    app.on_after_startup();

    // The host settings subsystem is expressed as a file watch: a save from
    // the UI rewrites the settings file, which we pick up by mtime and feed
    // through the settings-save hook.
    let mut last_mtime = file_mtime(&settings_path);
    loop {
        thread::sleep(Duration::from_secs(1));
        let mtime = file_mtime(&settings_path);
        if mtime != last_mtime {
            last_mtime = mtime;
            let reloaded = config::load_settings(&settings_path);
            logger::log_event("settings_reload", serde_json::json!({}));
            app.on_settings_save(reloaded);
        }
    }
}

fn file_mtime(path: &std::path::Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
