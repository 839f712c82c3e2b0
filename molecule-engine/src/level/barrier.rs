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
//! Barriers
//!
//! Barriers push atoms back with a penalty spring proportional to how far
//! the atom sphere penetrates the barrier surface. Each atom's push acts at
//! the atom, so an off-center contact also produces a coupled torque.

use super::{Barrier, LevelElement};
use crate::forces::Wrench;
use crate::model::{Molecule, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

fn default_stiffness() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

/// Sinusoidal motion of a barrier along its normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    /// Peak displacement
    pub amplitude: f64,
    /// Cycles per simulated second
    pub frequency: f64,
}

impl Oscillation {
    fn offset_at(&self, time: f64) -> f64 {
        self.amplitude * (TAU * self.frequency * time).sin()
    }
}

/// Half-space barrier: atoms are kept on the side the normal points to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallBarrier {
    /// A point on the wall surface at rest
    pub point: Vec3,
    /// Direction atoms are pushed towards
    pub normal: Vec3,
    /// Spring constant per unit penetration
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Optional motion along the normal
    #[serde(default)]
    pub oscillation: Option<Oscillation>,
    /// Energy drawn while the wall moves
    #[serde(default)]
    pub energy_use: f64,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
    #[serde(skip)]
    offset: f64,
}

impl WallBarrier {
    /// Static wall through `point`
    pub fn new(point: Vec3, normal: Vec3, stiffness: f64) -> Self {
        WallBarrier {
            point,
            normal,
            stiffness,
            oscillation: None,
            energy_use: 0.0,
            persistent: true,
            offset: 0.0,
        }
    }

    /// Make the wall oscillate along its normal
    pub fn with_oscillation(mut self, amplitude: f64, frequency: f64, energy_use: f64) -> Self {
        self.oscillation = Some(Oscillation { amplitude, frequency });
        self.energy_use = energy_use;
        self
    }

    /// Mark the wall as removed on level reset
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    /// Current displacement along the normal
    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn unit_normal(&self) -> Vec3 {
        self.normal.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::zeros)
    }
}

impl LevelElement for WallBarrier {
    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn reset(&mut self) {
        self.offset = 0.0;
    }

    fn animate(&mut self, time: f64) {
        if let Some(oscillation) = self.oscillation {
            self.offset = oscillation.offset_at(time);
        }
    }

    fn energy_use(&self) -> f64 {
        if self.oscillation.is_some() {
            self.energy_use
        } else {
            0.0
        }
    }
}

impl Barrier for WallBarrier {
    fn force_on_molecule(&self, molecule: &Molecule) -> Wrench {
        let normal = self.unit_normal();
        let surface = self.point + normal * self.offset;
        let mut total = Wrench::zero();

        for atom in molecule.atoms() {
            let depth = atom.radius() - (atom.position() - surface).dot(&normal);
            if depth > 0.0 {
                let lever = atom.position() - molecule.position();
                total.add(&Wrench::at_lever(&lever, normal * (self.stiffness * depth)));
            }
        }
        total
    }
}

/// Axis-aligned box that keeps atoms inside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxBarrier {
    /// Lower corner
    pub min: Vec3,
    /// Upper corner
    pub max: Vec3,
    /// Spring constant per unit penetration
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
}

impl BoxBarrier {
    /// Create a containment box
    pub fn new(min: Vec3, max: Vec3, stiffness: f64) -> Self {
        BoxBarrier {
            min,
            max,
            stiffness,
            persistent: true,
        }
    }
}

impl LevelElement for BoxBarrier {
    fn is_persistent(&self) -> bool {
        self.persistent
    }
}

impl Barrier for BoxBarrier {
    fn force_on_molecule(&self, molecule: &Molecule) -> Wrench {
        let mut total = Wrench::zero();

        for atom in molecule.atoms() {
            let position = atom.position();
            let radius = atom.radius();
            let mut push = Vec3::zeros();
            for axis in 0..3 {
                let below = self.min[axis] - (position[axis] - radius);
                let above = (position[axis] + radius) - self.max[axis];
                if below > 0.0 {
                    push[axis] += self.stiffness * below;
                }
                if above > 0.0 {
                    push[axis] -= self.stiffness * above;
                }
            }
            if push != Vec3::zeros() {
                let lever = position - molecule.position();
                total.add(&Wrench::at_lever(&lever, push));
            }
        }
        total
    }
}

/// Barrier kinds a level can hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BarrierElement {
    /// Half-space wall
    Wall(WallBarrier),
    /// Containment box
    Box(BoxBarrier),
}

impl From<WallBarrier> for BarrierElement {
    fn from(wall: WallBarrier) -> Self {
        BarrierElement::Wall(wall)
    }
}

impl From<BoxBarrier> for BarrierElement {
    fn from(container: BoxBarrier) -> Self {
        BarrierElement::Box(container)
    }
}

impl LevelElement for BarrierElement {
    fn is_persistent(&self) -> bool {
        match self {
            BarrierElement::Wall(b) => b.is_persistent(),
            BarrierElement::Box(b) => b.is_persistent(),
        }
    }

    fn reset(&mut self) {
        match self {
            BarrierElement::Wall(b) => b.reset(),
            BarrierElement::Box(b) => b.reset(),
        }
    }

    fn animate(&mut self, time: f64) {
        match self {
            BarrierElement::Wall(b) => b.animate(time),
            BarrierElement::Box(b) => b.animate(time),
        }
    }

    fn energy_use(&self) -> f64 {
        match self {
            BarrierElement::Wall(b) => b.energy_use(),
            BarrierElement::Box(b) => b.energy_use(),
        }
    }
}

impl Barrier for BarrierElement {
    fn force_on_molecule(&self, molecule: &Molecule) -> Wrench {
        match self {
            BarrierElement::Wall(b) => b.force_on_molecule(molecule),
            BarrierElement::Box(b) => b.force_on_molecule(molecule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AtomSpec, MoleculeId, MoleculeTemplate, Quat};
    use approx::assert_relative_eq;

    fn ball_at(position: Vec3, radius: f64) -> Molecule {
        Molecule::from_template(
            MoleculeId::new(0),
            &MoleculeTemplate::single_atom(1.0, 0.0, radius),
            position,
            Quat::identity(),
        )
    }

    #[test]
    fn test_wall_pushes_penetrating_atom() {
        let wall = WallBarrier::new(Vec3::zeros(), Vec3::new(0.0, 2.0, 0.0), 10.0);
        let wrench = wall.force_on_molecule(&ball_at(Vec3::new(0.0, 0.2, 0.0), 0.5));
        assert_relative_eq!(wrench.force, Vec3::new(0.0, 3.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(wrench.torque, Vec3::zeros());

        let clear = wall.force_on_molecule(&ball_at(Vec3::new(0.0, 1.0, 0.0), 0.5));
        assert_eq!(clear, Wrench::zero());
    }

    #[test]
    fn test_wall_contact_off_center_produces_torque() {
        let template = MoleculeTemplate::new(vec![
            AtomSpec::new(Vec3::new(-1.0, 0.0, 0.0), 1.0, 0.0, 0.5),
            AtomSpec::new(Vec3::new(1.0, 2.0, 0.0), 1.0, 0.0, 0.5),
        ]);
        let molecule = Molecule::from_template(MoleculeId::new(0), &template, Vec3::new(0.0, 1.0, 0.0), Quat::identity());
        let wall = WallBarrier::new(Vec3::zeros(), Vec3::y(), 10.0);

        // Only the lower atom at (-1, 0, 0) touches, 0.5 deep
        let wrench = wall.force_on_molecule(&molecule);
        assert_relative_eq!(wrench.force, Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-12);
        // 0.1 * (-1, -1, 0) x (0, 5, 0)
        assert_relative_eq!(wrench.torque, Vec3::new(0.0, 0.0, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_oscillating_wall_moves_and_resets() {
        let mut wall = WallBarrier::new(Vec3::zeros(), Vec3::y(), 1.0).with_oscillation(2.0, 0.25, 5.0);
        wall.animate(1.0);
        assert_relative_eq!(wall.offset(), 2.0, epsilon = 1e-12);
        assert_eq!(wall.energy_use(), 5.0);
        wall.reset();
        assert_eq!(wall.offset(), 0.0);
    }

    #[test]
    fn test_box_contains_atoms() {
        let container = BoxBarrier::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0), 4.0);
        let inside = container.force_on_molecule(&ball_at(Vec3::zeros(), 0.5));
        assert_eq!(inside, Wrench::zero());

        let outside = container.force_on_molecule(&ball_at(Vec3::new(0.75, -0.75, 0.0), 0.5));
        assert_relative_eq!(outside.force, Vec3::new(-1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_barrier_element_serde() {
        let element: BarrierElement = WallBarrier::new(Vec3::zeros(), Vec3::y(), 3.0).into();
        let json = serde_json::to_string(&element).unwrap();
        assert!(json.contains("\"type\":\"wall\""));
        let back: BarrierElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }
}
