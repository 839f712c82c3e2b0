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
//! Portals

use super::{LevelElement, Portal};
use crate::model::{MoleculeId, Vec3};
use crate::sensors::{CaptureCondition, ConditionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_true() -> bool {
    true
}

/// Spherical capture region
///
/// A destroying portal removes every molecule whose center of mass enters
/// it. A non-destroying portal counts each molecule once, the first time it
/// is seen inside. It remembers counted molecules until they leave the
/// level, so the set is bounded by the live molecule count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpherePortal {
    /// Center of the region
    pub center: Vec3,
    /// Radius of the region
    pub radius: f64,
    /// Remove molecules on entry
    #[serde(default = "default_true")]
    pub destroys_on_entry: bool,
    /// Leave a decoration where a molecule was destroyed
    #[serde(default)]
    pub spawns_remnant: bool,
    /// Capture target for level completion
    #[serde(default)]
    pub condition: Option<CaptureCondition>,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
    #[serde(skip)]
    captured: usize,
    #[serde(skip)]
    seen: BTreeSet<MoleculeId>,
}

impl SpherePortal {
    /// Destroying portal without a capture condition
    pub fn new(center: Vec3, radius: f64) -> Self {
        SpherePortal {
            center,
            radius,
            destroys_on_entry: true,
            spawns_remnant: false,
            condition: None,
            persistent: true,
            captured: 0,
            seen: BTreeSet::new(),
        }
    }

    /// Attach a capture condition
    pub fn with_condition(mut self, condition: CaptureCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Count molecules without removing them
    pub fn non_destroying(mut self) -> Self {
        self.destroys_on_entry = false;
        self
    }

    /// Leave a decoration behind for each destroyed molecule
    pub fn with_remnants(mut self) -> Self {
        self.spawns_remnant = true;
        self
    }

    /// Mark the portal as removed on level reset
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    /// Molecules remembered as already counted
    pub fn tracked_molecules(&self) -> usize {
        self.seen.len()
    }
}

impl LevelElement for SpherePortal {
    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn reset(&mut self) {
        self.captured = 0;
        self.seen.clear();
    }
}

impl Portal for SpherePortal {
    fn contains(&self, point: &Vec3) -> bool {
        (point - self.center).norm() <= self.radius
    }

    fn handle_molecule_entering(&mut self, id: MoleculeId) -> bool {
        if !self.destroys_on_entry && !self.seen.insert(id) {
            return false;
        }
        self.captured += 1;
        true
    }

    fn destroys_on_entry(&self) -> bool {
        self.destroys_on_entry
    }

    fn molecule_removed(&mut self, id: MoleculeId) {
        self.seen.remove(&id);
    }

    fn spawns_remnant(&self) -> bool {
        self.spawns_remnant
    }

    fn captured_count(&self) -> usize {
        self.captured
    }

    fn condition_status(&self) -> Option<ConditionStatus> {
        self.condition.map(|condition| condition.status(self.captured))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Combinator;

    #[test]
    fn test_contains() {
        let portal = SpherePortal::new(Vec3::new(1.0, 0.0, 0.0), 0.5);
        assert!(portal.contains(&Vec3::new(1.4, 0.0, 0.0)));
        assert!(!portal.contains(&Vec3::new(1.6, 0.0, 0.0)));
    }

    #[test]
    fn test_non_destroying_counts_once() {
        let mut portal = SpherePortal::new(Vec3::zeros(), 1.0).non_destroying();
        assert!(portal.handle_molecule_entering(MoleculeId::new(4)));
        assert!(!portal.handle_molecule_entering(MoleculeId::new(4)));
        assert!(portal.handle_molecule_entering(MoleculeId::new(5)));
        assert_eq!(portal.captured_count(), 2);
    }

    #[test]
    fn test_removed_molecule_is_forgotten() {
        let mut portal = SpherePortal::new(Vec3::zeros(), 1.0).non_destroying();
        portal.handle_molecule_entering(MoleculeId::new(1));
        portal.handle_molecule_entering(MoleculeId::new(2));
        assert_eq!(portal.tracked_molecules(), 2);

        portal.molecule_removed(MoleculeId::new(1));
        assert_eq!(portal.tracked_molecules(), 1);
        assert_eq!(portal.captured_count(), 2);
    }

    #[test]
    fn test_condition_tracks_captures() {
        let mut portal =
            SpherePortal::new(Vec3::zeros(), 1.0).with_condition(CaptureCondition::new(Combinator::Or, 1));
        assert_eq!(portal.condition_status(), Some(ConditionStatus::or(false)));
        portal.handle_molecule_entering(MoleculeId::new(0));
        assert_eq!(portal.condition_status(), Some(ConditionStatus::or(true)));

        portal.reset();
        assert_eq!(portal.captured_count(), 0);
        assert_eq!(portal.condition_status(), Some(ConditionStatus::or(false)));
    }
}
