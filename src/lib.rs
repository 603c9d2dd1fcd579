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

//! Navtemp - SBC temperature sampler daemon
//!
//! This library provides the core functionality for classifying the host
//! board, reading the SoC thermal zone and an external one-wire probe, and
//! publishing periodic temperature samples to a UI client.

pub mod app;
pub mod config;
pub mod logger;
pub mod platform;
pub mod probe;
pub mod sampler;
pub mod sink;
pub mod system;

#[cfg(test)]
pub mod test_utils;
