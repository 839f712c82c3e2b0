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
//! Forces applied from outside the molecule set

use super::{coupled_torque, Wrench, USER_TORQUE_SCALE};
use crate::model::{Molecule, MoleculeId, Vec3};
use serde::{Deserialize, Serialize};

/// Timed force on one molecule
///
/// Several may target the same molecule; they sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeExternalForce {
    /// Target molecule
    pub molecule_id: MoleculeId,
    /// World-space point of application
    pub origin: Vec3,
    /// Force vector
    pub force: Vec3,
    /// Simulation time the force was created
    pub created_at: f64,
    /// Simulation time after which the force is removed
    pub expires_at: f64,
}

impl MoleculeExternalForce {
    /// Create a timed force lasting `duration` from `created_at`
    pub fn new(molecule_id: MoleculeId, origin: Vec3, force: Vec3, created_at: f64, duration: f64) -> Self {
        MoleculeExternalForce {
            molecule_id,
            origin,
            force,
            created_at,
            expires_at: created_at + duration,
        }
    }

    /// True once `time` is past the expiry time
    pub fn is_expired(&self, time: f64) -> bool {
        time > self.expires_at
    }

    /// Force and coupled torque on `molecule` at `time`, if applicable
    pub fn wrench_on(&self, molecule: &Molecule, time: f64) -> Option<Wrench> {
        if self.molecule_id != molecule.id() || time < self.created_at || self.is_expired(time) {
            return None;
        }
        let lever = self.origin - molecule.position();
        Some(Wrench::at_lever(&lever, self.force))
    }
}

/// The drag the user is currently applying
///
/// There is at most one; a new drag replaces the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserForce {
    /// Dragged molecule
    pub molecule_id: MoleculeId,
    /// World-space grab point
    pub origin: Vec3,
    /// Force vector
    pub force: Vec3,
    /// Simulation time the drag started
    pub start_time: f64,
    /// Simulation time the drag ends
    pub end_time: f64,
    /// Only torque along this axis is applied
    pub plane_normal: Vec3,
}

impl UserForce {
    /// Check whether the drag applies at `time`
    pub fn is_active(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// Scaled drag torque about `center`, projected onto the plane normal
    pub fn constrained_torque(&self, center: &Vec3) -> Vec3 {
        let torque = (self.origin - center).cross(&self.force) * USER_TORQUE_SCALE;
        let axis = self.plane_normal.try_normalize(f64::EPSILON).unwrap_or_else(Vec3::zeros);
        axis * axis.dot(&torque)
    }
}

/// Persistent field such as gravity
///
/// The stored vector is multiplied by the molecule mass and the global mass
/// factor, so it behaves as an acceleration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedForce {
    /// Field name
    pub name: String,
    /// Field vector before mass scaling
    pub force: Vec3,
    /// Point of application; `None` acts at the center of mass
    #[serde(default)]
    pub origin: Option<Vec3>,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
}

fn default_true() -> bool {
    true
}

impl NamedForce {
    /// Persistent field acting at the center of mass
    pub fn uniform(name: impl Into<String>, force: Vec3) -> Self {
        NamedForce {
            name: name.into(),
            force,
            origin: None,
            persistent: true,
        }
    }

    /// Mass-scaled force and coupled torque on `molecule`
    pub fn wrench_on(&self, molecule: &Molecule, mass_factor: f64) -> Wrench {
        let force = self.force * (molecule.mass() * mass_factor);
        let torque = match self.origin {
            Some(origin) => coupled_torque(&(origin - molecule.position()), &force),
            None => Vec3::zeros(),
        };
        Wrench::new(force, torque)
    }
}
