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

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::config::{self, Settings};
use crate::logger;
use crate::platform::{self, PlatformClassification, Support};
use crate::sampler::Sampler;
use crate::sink::NotificationSink;

/// Ties the pieces together the way the host plugin lifecycle would:
/// startup classifies the platform and arms the timer, settings-save
/// persists and re-applies the display flags, shutdown cancels the timer.
pub struct App {
    classification: PlatformClassification,
    settings: Arc<Mutex<Settings>>,
    settings_path: PathBuf,
    sampler: Sampler,
}

impl App {
    pub fn new(
        classification: PlatformClassification,
        initial: Settings,
        settings_path: PathBuf,
        sink: Arc<dyn NotificationSink>,
        debug_mode: bool,
    ) -> Self {
        let settings = Arc::new(Mutex::new(initial));
        let sampler = Sampler::new(classification.clone(), settings.clone(), sink, debug_mode);
        App {
            classification,
            settings,
            settings_path,
            sampler,
        }
    }

    pub fn classification(&self) -> &PlatformClassification {
        &self.classification
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut Sampler {
        &mut self.sampler
    }

    fn settings_snapshot(&self) -> Settings {
        match self.settings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Startup hook: arm the 10s timer when any display flag is enabled and
    /// the detected SoC is on the allow-list. Otherwise the sampler stays
    /// inert for the life of the process.
    pub fn on_after_startup(&mut self) {
        let snapshot = self.settings_snapshot();
        let support = platform::soc_support(&self.classification, &snapshot.pi_soc_types);
        logger::log_event(
            "startup",
            json!({
                "support": format!("{:?}", support),
                "display_soc": snapshot.display_temp_soc,
                "display_gpio": snapshot.display_temp_gpio,
            }),
        );
        if support == Support::Supported
            && (snapshot.display_temp_soc || snapshot.display_temp_gpio)
        {
            self.sampler.start(crate::sampler::STARTUP_INTERVAL);
        }
    }

    /// Settings-save hook: persist the new payload, swap it into the shared
    /// view, then apply the SoC toggle policy. Enabling SoC display restarts
    /// the timer at the settings interval; disabling it cancels the timer
    /// and sends one empty payload so the UI clears its display.
    pub fn on_settings_save(&mut self, new_settings: Settings) {
        if let Err(e) = config::validate_settings(&new_settings) {
            logger::log_event("settings_rejected", json!({ "error": e }));
            return;
        }
        if let Err(e) = config::save_settings(&self.settings_path, &new_settings) {
            logger::log_event("settings_persist_failed", json!({ "error": e.to_string() }));
        }
        match self.settings.lock() {
            Ok(mut guard) => *guard = new_settings.clone(),
            Err(poisoned) => *poisoned.into_inner() = new_settings.clone(),
        }

        if new_settings.display_temp_soc {
            let interval = self.sampler.settings_interval();
            self.sampler.start(interval);
        } else {
            self.sampler.stop();
            self.sampler_sink_clear();
        }
    }

    fn sampler_sink_clear(&self) {
        // Empty payload is the "cleared" signal to the navbar client.
        self.sink().send(json!({}));
    }

    fn sink(&self) -> Arc<dyn NotificationSink> {
        self.sampler.sink()
    }

    pub fn shutdown(&mut self) {
        self.sampler.stop();
    }
}
