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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::Settings;
use crate::logger;
use crate::platform::{self, PlatformClassification, Support};
use crate::probe;
use crate::sink::NotificationSink;

/// Interval used when the sampler starts at daemon startup.
pub const STARTUP_INTERVAL: Duration = Duration::from_secs(10);
/// Interval applied when the user enables SoC display via settings-save.
pub const SETTINGS_INTERVAL: Duration = Duration::from_secs(30);
/// Shortened settings-save interval when running with --debug.
pub const DEBUG_INTERVAL: Duration = Duration::from_secs(5);

/// Granularity of the stop-flag check inside the timer thread; bounds
/// cancellation latency without waking up more than needed.
const STOP_POLL_SLICE: Duration = Duration::from_millis(100);

/// One sample per tick. Built fresh, sent, discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSample {
    pub is_supported: bool,
    pub show_soc: bool,
    pub soc_temp_c: Option<f64>,
    pub show_gpio: bool,
    pub gpio_temp: Option<String>,
}

impl TemperatureSample {
    /// Wire form for the UI. Missing readings encode as the number 0, the
    /// shape the navbar client expects; a present GPIO reading stays a
    /// string ("23.5" or "err").
    pub fn to_payload(&self) -> Value {
        json!({
            "isSupported": self.is_supported,
            "showsoc": self.show_soc,
            "soctemp": match self.soc_temp_c {
                Some(c) => json!(c),
                None => json!(0),
            },
            "showgpio": self.show_gpio,
            "gpiotemp": match &self.gpio_temp {
                Some(s) => json!(s),
                None => json!(0),
            },
        })
    }
}

/// The single active recurring timer. Dropping or stopping a handle requests
/// cancellation; a tick already in flight is allowed to finish.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn cancel(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(t) = self.thread.take() {
            // Best-effort: a join failure means the tick thread panicked,
            // which must never take the daemon down with it.
            if t.join().is_err() {
                logger::log_event("timer_cancel_failed", json!({}));
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Periodic sampler: owns the platform classification (immutable after
/// detection), a shared view of the display settings, and the sink that
/// receives each sample.
pub struct Sampler {
    classification: PlatformClassification,
    settings: Arc<Mutex<Settings>>,
    sink: Arc<dyn NotificationSink>,
    debug_mode: bool,
    thermal_zone: PathBuf,
    handle: Option<SchedulerHandle>,
}

impl Sampler {
    pub fn new(
        classification: PlatformClassification,
        settings: Arc<Mutex<Settings>>,
        sink: Arc<dyn NotificationSink>,
        debug_mode: bool,
    ) -> Self {
        Sampler {
            classification,
            settings,
            sink,
            debug_mode,
            thermal_zone: PathBuf::from(platform::THERMAL_ZONE_PATH),
            handle: None,
        }
    }

    /// Point the SoC read at an alternate thermal zone file (fake sysfs
    /// trees in tests, non-default zones on unusual boards).
    pub fn set_thermal_zone(&mut self, path: PathBuf) {
        self.thermal_zone = path;
    }

    pub fn settings_interval(&self) -> Duration {
        if self.debug_mode {
            DEBUG_INTERVAL
        } else {
            SETTINGS_INTERVAL
        }
    }

    pub fn sink(&self) -> Arc<dyn NotificationSink> {
        self.sink.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_cancelled()).unwrap_or(false)
    }

    /// Start the recurring timer: first tick immediately, then every
    /// `interval` until stopped. Any prior timer is cancelled first, so two
    /// consecutive starts leave exactly one live timer.
    pub fn start(&mut self, interval: Duration) {
        self.stop();
        logger::log_event(
            "timer_start",
            json!({ "interval_secs": interval.as_secs() }),
        );

        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();
        let classification = self.classification.clone();
        let settings = self.settings.clone();
        let sink = self.sink.clone();
        let thermal_zone = self.thermal_zone.clone();

        let thread = thread::spawn(move || {
            while !stop_thread.load(Ordering::SeqCst) {
                tick(&classification, &settings, sink.as_ref(), &thermal_zone);
                // Sleep in slices so cancellation is not delayed by up to a
                // full interval.
                let deadline = Instant::now() + interval;
                while Instant::now() < deadline {
                    if stop_thread.load(Ordering::SeqCst) {
                        return;
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    thread::sleep(remaining.min(STOP_POLL_SLICE));
                }
            }
        });

        self.handle = Some(SchedulerHandle {
            stop,
            thread: Some(thread),
        });
    }

    /// Cancel the active timer, if any. Best-effort and never fatal.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            logger::log_event("timer_cancel", json!({}));
            handle.cancel();
        }
    }

    /// Run a single sampling pass outside the timer thread. Used for
    /// one-shot mode and in tests.
    pub fn sample_once(&self) -> TemperatureSample {
        build_sample(&self.classification, &self.settings, &self.thermal_zone)
    }
}

/// One scheduler tick: snapshot settings, read the enabled sensors, push the
/// combined sample. Never panics, never blocks on the sink.
fn tick(
    classification: &PlatformClassification,
    settings: &Arc<Mutex<Settings>>,
    sink: &dyn NotificationSink,
    thermal_zone: &Path,
) {
    let sample = build_sample(classification, settings, thermal_zone);
    logger::log_event(
        "sample",
        json!({
            "soc": sample.soc_temp_c,
            "gpio": sample.gpio_temp,
            "is_supported": sample.is_supported,
        }),
    );
    sink.send(sample.to_payload());
}

fn build_sample(
    classification: &PlatformClassification,
    settings: &Arc<Mutex<Settings>>,
    thermal_zone: &Path,
) -> TemperatureSample {
    let snapshot = match settings.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    // Support is re-checked against the current allow-list on every tick so
    // a settings edit applies to the next sample.
    let supported = classification.is_embedded_board
        && platform::soc_support(classification, &snapshot.pi_soc_types) == Support::Supported;

    // Off-board hosts never touch the thermal zone or the w1 bus.
    let soc_temp_c = if snapshot.display_temp_soc && supported {
        Some(platform::read_soc_temperature_at(thermal_zone))
    } else {
        None
    };
    let gpio_temp = if snapshot.display_temp_gpio && classification.is_embedded_board {
        Some(probe::read_external_probe())
    } else {
        None
    };

    TemperatureSample {
        is_supported: supported,
        show_soc: snapshot.display_temp_soc,
        soc_temp_c,
        show_gpio: snapshot.display_temp_gpio,
        gpio_temp,
    }
}
