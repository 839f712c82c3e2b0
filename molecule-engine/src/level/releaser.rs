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
//! Releasers

use super::{LevelElement, Releaser};
use crate::model::{Molecule, MoleculeId, MoleculeTemplate, Quat, Vec3};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Spawns a molecule at a fixed place every `interval` seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedReleaser {
    /// Molecule to release
    pub template: MoleculeTemplate,
    /// Spawn position
    pub position: Vec3,
    /// Initial velocity of released molecules
    #[serde(default)]
    pub velocity: Vec3,
    /// Time of the first release
    #[serde(default)]
    pub first_release_time: f64,
    /// Seconds between releases
    pub interval: f64,
    /// Stop after this many releases
    #[serde(default)]
    pub max_releases: Option<usize>,
    /// Energy drawn while releasing
    #[serde(default)]
    pub energy_use: f64,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
    #[serde(skip)]
    released: usize,
}

impl TimedReleaser {
    /// Create a releaser with no release limit
    ///
    /// # Panics
    ///
    /// Panics if `interval` is not positive and finite.
    pub fn new(template: MoleculeTemplate, position: Vec3, interval: f64) -> Self {
        assert!(
            interval > 0.0 && interval.is_finite(),
            "Release interval must be positive and finite"
        );
        TimedReleaser {
            template,
            position,
            velocity: Vec3::zeros(),
            first_release_time: 0.0,
            interval,
            max_releases: None,
            energy_use: 0.0,
            persistent: true,
            released: 0,
        }
    }

    /// Limit the number of releases
    pub fn with_max_releases(mut self, max_releases: usize) -> Self {
        self.max_releases = Some(max_releases);
        self
    }

    /// Set the initial velocity of released molecules
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Delay the first release
    pub fn starting_at(mut self, time: f64) -> Self {
        self.first_release_time = time;
        self
    }

    /// Mark the releaser as removed on level reset
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    fn exhausted(&self) -> bool {
        self.max_releases.is_some_and(|max| self.released >= max)
    }

    /// Time of the next release, if any remain
    pub fn next_release_time(&self) -> Option<f64> {
        if self.exhausted() {
            None
        } else {
            Some(self.first_release_time + self.released as f64 * self.interval)
        }
    }
}

impl LevelElement for TimedReleaser {
    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn reset(&mut self) {
        self.released = 0;
    }

    fn energy_use(&self) -> f64 {
        if self.exhausted() {
            0.0
        } else {
            self.energy_use
        }
    }
}

impl Releaser for TimedReleaser {
    fn should_release(&self, time: f64) -> bool {
        self.next_release_time().is_some_and(|next| time >= next)
    }

    fn release(&mut self, _time: f64, id: MoleculeId) -> Molecule {
        self.released += 1;
        Molecule::from_template(id, &self.template, self.position, Quat::identity())
            .with_velocity(self.velocity)
    }

    fn released_count(&self) -> usize {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn releaser() -> TimedReleaser {
        TimedReleaser::new(MoleculeTemplate::single_atom(1.0, 1.0, 0.2), Vec3::new(0.0, 3.0, 0.0), 0.5)
            .starting_at(1.0)
            .with_max_releases(2)
    }

    #[test]
    fn test_release_schedule() {
        let mut r = releaser();
        assert!(!r.should_release(0.9));
        assert!(r.should_release(1.0));

        let molecule = r.release(1.0, MoleculeId::new(7));
        assert_eq!(molecule.id(), MoleculeId::new(7));
        assert_eq!(*molecule.position(), Vec3::new(0.0, 3.0, 0.0));

        assert!(!r.should_release(1.2));
        assert!(r.should_release(1.5));
        r.release(1.5, MoleculeId::new(8));

        assert_eq!(r.released_count(), 2);
        assert!(!r.should_release(10.0));
        assert_eq!(r.next_release_time(), None);
    }

    #[test]
    fn test_reset_rearms() {
        let mut r = releaser();
        r.release(1.0, MoleculeId::new(0));
        r.reset();
        assert_eq!(r.released_count(), 0);
        assert_eq!(r.next_release_time(), Some(1.0));
    }

    #[test]
    #[should_panic(expected = "Release interval must be positive and finite")]
    fn test_zero_interval_panics() {
        TimedReleaser::new(MoleculeTemplate::single_atom(1.0, 0.0, 0.1), Vec3::zeros(), 0.0);
    }
}
