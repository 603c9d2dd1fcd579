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

use std::io::Write;

use serde_json::Value;

/// Outbound boundary to the subscribed UI client. Delivery is
/// fire-and-forget; the scheduler never blocks on or learns about a failed
/// send.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send + Sync {
    fn send(&self, payload: Value);
}

/// Writes one JSON object per line to stdout, where the host forwards it to
/// the connected UI.
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn send(&self, payload: Value) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{}", payload);
        let _ = lock.flush();
    }
}
