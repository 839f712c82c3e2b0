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
//! Rigid-body data model
//!
//! Molecules are rigid clusters of point-mass atoms. Each molecule carries
//! the primary rigid-body state (center of mass, orientation quaternion,
//! linear and angular momentum) and caches the secondary quantities
//! (velocity, angular velocity) derived from it. Atom world positions are
//! recomputed from the primary state after every committed step.
//!
//! Vector math is provided by `nalgebra` in double precision.

mod arena;
mod atom;
mod molecule;

pub use arena::MoleculeSet;
pub use atom::{Atom, AtomSpec};
pub use molecule::{
    charge_weighted_centroid, BodyState, Molecule, MoleculeId, MoleculePlacement,
    MoleculeTemplate,
};

/// 3D vector in world or body coordinates
pub type Vec3 = nalgebra::Vector3<f64>;

/// Orientation quaternion (not guaranteed to be unit length)
pub type Quat = nalgebra::Quaternion<f64>;

/// 3x3 matrix used for inertia tensors and rotations
pub type Mat3 = nalgebra::Matrix3<f64>;

/// Check that every component of a vector is finite
pub fn is_finite_vec(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Check that every component of a quaternion is finite
pub fn is_finite_quat(q: &Quat) -> bool {
    q.coords.iter().all(|c| c.is_finite())
}

/// Rescale `v` so that its magnitude does not exceed `max`
///
/// The direction is preserved. Vectors already within the limit are
/// returned unchanged.
pub fn clamp_magnitude(v: Vec3, max: f64) -> Vec3 {
    let magnitude = v.norm();
    if magnitude > max && magnitude > 0.0 {
        v * (max.max(0.0) / magnitude)
    } else {
        v
    }
}
