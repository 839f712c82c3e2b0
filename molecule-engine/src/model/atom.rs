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
//! Point-mass atoms
//!
//! Atoms have no identity of their own. They belong to exactly one molecule
//! and only move through the rigid transform of that molecule.

use super::{Mat3, MoleculeId, Vec3};
use serde::{Deserialize, Serialize};

/// Construction parameters for one atom of a molecule template
///
/// `offset` is the atom's position in the template's frame. Molecules
/// re-center offsets on the template's center of mass when instantiated.
///
/// # Examples
///
/// ```
/// use molecule_engine::model::{AtomSpec, Vec3};
///
/// let spec = AtomSpec::new(Vec3::new(0.5, 0.0, 0.0), 1.0, -1.0, 0.3);
/// assert!(spec.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtomSpec {
    /// Position relative to the template origin
    pub offset: Vec3,
    /// Mass of the atom
    pub mass: f64,
    /// Scalar charge
    pub charge: f64,
    /// Radius used by short-range laws and barrier contact
    pub radius: f64,
}

impl AtomSpec {
    /// Create a new atom spec
    ///
    /// # Panics
    ///
    /// Panics if the mass is not positive and finite, or if the radius is
    /// negative or not finite.
    pub fn new(offset: Vec3, mass: f64, charge: f64, radius: f64) -> Self {
        assert!(mass > 0.0 && mass.is_finite(), "Atom mass must be positive and finite");
        assert!(
            radius >= 0.0 && radius.is_finite(),
            "Atom radius must be non-negative and finite"
        );
        AtomSpec {
            offset,
            mass,
            charge,
            radius,
        }
    }

    /// Check that all fields describe a physically usable atom
    pub fn is_valid(&self) -> bool {
        self.offset.iter().all(|c| c.is_finite())
            && self.mass > 0.0
            && self.mass.is_finite()
            && self.charge.is_finite()
            && self.radius >= 0.0
            && self.radius.is_finite()
    }
}

/// An atom owned by a molecule
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    parent_id: MoleculeId,
    local_offset: Vec3,
    position: Vec3,
    mass: f64,
    charge: f64,
    radius: f64,
}

impl Atom {
    pub(crate) fn new(parent_id: MoleculeId, local_offset: Vec3, spec: &AtomSpec) -> Self {
        Atom {
            parent_id,
            local_offset,
            position: local_offset,
            mass: spec.mass,
            charge: spec.charge,
            radius: spec.radius,
        }
    }

    /// Id of the owning molecule
    pub fn parent_id(&self) -> MoleculeId {
        self.parent_id
    }

    /// Offset from the molecule's center of mass in the body frame
    pub fn local_offset(&self) -> &Vec3 {
        &self.local_offset
    }

    /// World position as of the last committed step
    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    /// Mass of the atom
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Scalar charge
    pub fn charge(&self) -> f64 {
        self.charge
    }

    /// Atom radius
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub(crate) fn set_parent(&mut self, parent_id: MoleculeId) {
        self.parent_id = parent_id;
    }

    pub(crate) fn place(&mut self, center: &Vec3, rotation: &Mat3) {
        self.position = center + rotation * self.local_offset;
    }
}
