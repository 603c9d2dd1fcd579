/*
 * Test utilities and shared fixtures for Navtemp
 *
 * Mock sinks, canned platform classifications, and sampler constructors
 * used across the module test suites.
 */

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::Settings;
use crate::platform::PlatformClassification;
use crate::sampler::Sampler;
use crate::sink::NotificationSink;

/// Sink that records every payload it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub sent: Arc<Mutex<Vec<Value>>>,
}

impl NotificationSink for RecordingSink {
    fn send(&self, payload: Value) {
        self.sent.lock().unwrap().push(payload);
    }
}

/// Classification of a supported Raspberry Pi board (family on the default
/// allow-list).
pub fn pi_classification() -> PlatformClassification {
    PlatformClassification {
        is_embedded_board: true,
        soc_family: Some("BCM2835".to_string()),
    }
}

/// Sampler wired to a recording sink, with default settings.
pub fn recording_sampler(classification: PlatformClassification) -> (Sampler, RecordingSink) {
    let sink = RecordingSink::default();
    let sampler = Sampler::new(
        classification,
        Arc::new(Mutex::new(Settings::default())),
        Arc::new(sink.clone()),
        false,
    );
    (sampler, sink)
}
