// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Sensors and level completion
//!
//! At every sensor check the simulation samples four scalars from the level
//! and appends them to named, append-only time series used for scoring:
//!
//! - `temperature`: mean temperature grid value
//! - `captured`: molecules captured across all portals
//! - `released`: molecules released across all releasers
//! - `energy`: element energy use as a percentage

mod end_condition;

pub use end_condition::{evaluate_end_condition, CaptureCondition, Combinator, ConditionStatus};

use crate::level::Level;
use log::{error, trace};
use std::collections::BTreeMap;

/// Temperatures outside this band indicate a misconfigured field
pub const PLAUSIBLE_TEMPERATURE: (f64, f64) = (-50.0, 50.0);

/// Name of the temperature series
pub const TEMPERATURE_SERIES: &str = "temperature";
/// Name of the captured-count series
pub const CAPTURED_SERIES: &str = "captured";
/// Name of the released-count series
pub const RELEASED_SERIES: &str = "released";
/// Name of the energy-use series
pub const ENERGY_SERIES: &str = "energy";

/// Append-only `(time, value)` samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    samples: Vec<(f64, f64)>,
}

impl TimeSeries {
    /// Append a sample
    pub fn push(&mut self, time: f64, value: f64) {
        self.samples.push((time, value));
    }

    /// All samples in recording order
    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    /// Most recent sample
    pub fn last(&self) -> Option<(f64, f64)> {
        self.samples.last().copied()
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One sensor check's worth of samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Simulation time of the check
    pub time: f64,
    /// Mean temperature grid value
    pub temperature: f64,
    /// Captures across all portals
    pub captured: usize,
    /// Releases across all releasers
    pub released: usize,
    /// Element energy use as a percentage
    pub energy_percent: f64,
}

/// Sample the level's sensor values
pub fn sample_level(level: &Level, time: f64) -> SensorReading {
    let temperature = level.average_temperature();
    let (low, high) = PLAUSIBLE_TEMPERATURE;
    if !(low..=high).contains(&temperature) {
        error!(
            "Average temperature {} is outside the plausible range [{}, {}]",
            temperature, low, high
        );
        debug_assert!(false, "Average temperature outside the plausible range");
    }

    SensorReading {
        time,
        temperature,
        captured: level.total_captured(),
        released: level.total_released(),
        energy_percent: level.energy_use_percent(),
    }
}

/// Named sensor time series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorHistory {
    series: BTreeMap<String, TimeSeries>,
}

impl SensorHistory {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to a named series
    pub fn record(&mut self, name: &str, time: f64, value: f64) {
        self.series.entry(name.to_string()).or_default().push(time, value);
    }

    /// Append every value of a reading
    pub fn record_reading(&mut self, reading: &SensorReading) {
        trace!("Sensor reading {:?}", reading);
        self.record(TEMPERATURE_SERIES, reading.time, reading.temperature);
        self.record(CAPTURED_SERIES, reading.time, reading.captured as f64);
        self.record(RELEASED_SERIES, reading.time, reading.released as f64);
        self.record(ENERGY_SERIES, reading.time, reading.energy_percent);
    }

    /// Look up a series
    pub fn series(&self, name: &str) -> Option<&TimeSeries> {
        self.series.get(name)
    }

    /// Names of the recorded series
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.series.values().all(TimeSeries::is_empty)
    }

    /// Drop every series
    pub fn clear(&mut self) {
        self.series.clear();
    }
}
