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
//! Simulation clock
//!
//! Time only advances while the clock is running. Bookkeeping and sensor
//! checks fire when the time since their last firing exceeds their
//! interval.

/// Monotonic simulation time with two derived cadences
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    time: f64,
    running: bool,
    animation_interval: f64,
    sensor_interval: f64,
    last_animation_time: f64,
    last_sensor_time: f64,
}

impl SimulationClock {
    /// Stopped clock at zero
    ///
    /// # Panics
    ///
    /// Panics if an interval is not positive and finite.
    pub fn new(animation_interval: f64, sensor_interval: f64) -> Self {
        assert!(
            animation_interval > 0.0 && animation_interval.is_finite(),
            "Animation interval must be positive and finite"
        );
        assert!(
            sensor_interval > 0.0 && sensor_interval.is_finite(),
            "Sensor interval must be positive and finite"
        );
        SimulationClock {
            time: 0.0,
            running: false,
            animation_interval,
            sensor_interval,
            last_animation_time: 0.0,
            last_sensor_time: 0.0,
        }
    }

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Whether time is passing
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start or pause the clock
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Advance by `dt` if running
    pub fn advance(&mut self, dt: f64) {
        if self.running {
            self.time += dt;
        }
    }

    /// Check the bookkeeping cadence, rearming it when due
    pub fn animation_due(&mut self) -> bool {
        if self.time - self.last_animation_time > self.animation_interval {
            self.last_animation_time = self.time;
            true
        } else {
            false
        }
    }

    /// Check the sensor cadence, rearming it when due
    pub fn sensor_due(&mut self) -> bool {
        if self.time - self.last_sensor_time > self.sensor_interval {
            self.last_sensor_time = self.time;
            true
        } else {
            false
        }
    }

    /// Zero the time and both cadence timestamps
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.last_animation_time = 0.0;
        self.last_sensor_time = 0.0;
    }

    /// Time of the last bookkeeping pass
    pub fn last_animation_time(&self) -> f64 {
        self.last_animation_time
    }

    /// Time of the last sensor check
    pub fn last_sensor_time(&self) -> f64 {
        self.last_sensor_time
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(0.04, 0.5)
    }
}
