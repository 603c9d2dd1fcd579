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

use std::process::Command;

/// Kernel modules for the one-wire GPIO bus and its thermal slave driver.
/// Loading is idempotent and failures are not surfaced; on a host without
/// the bus the read path reports "no probe" on its own.
pub fn load_probe_modules() {
    for module in ["w1-gpio", "w1-therm"] {
        let _ = Command::new("modprobe").arg("-q").arg(module).output();
    }
}
