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
//! Force resolution
//!
//! Inter-atom forces come from pluggable pairwise laws summed by a batch
//! [`ForceKernel`]. The [`ForceAccumulator`] folds the per-atom result into
//! a net force and torque per molecule and adds barrier, field, timed and
//! user forces, the optional clamp and damping.

mod accumulator;
mod external;
mod kernel;
mod laws;

pub use accumulator::{ForceAccumulator, ForceEnvironment};
pub use external::{MoleculeExternalForce, NamedForce, UserForce};
pub use kernel::{CpuForceKernel, ForceKernel};
pub use laws::{
    CoulombLaw, ForceLawKind, ForceLawParameters, ForceLawRegistry, InteractionSite,
    PairwiseForceLaw, VanDerWaalsLaw, MIN_INTERACTION_DISTANCE,
};

use crate::model::{is_finite_vec, Vec3};

/// Translation-to-rotation coupling applied to every lever-arm torque
pub const ROTATION_COUPLING_RATIO: f64 = 0.1;

/// Factor applied to the accumulated force while a user drag is active
pub const USER_FORCE_PRIOR_FORCE_DAMPING: f64 = 0.2;

/// Factor applied to the accumulated torque while a user drag is active
pub const USER_FORCE_PRIOR_TORQUE_DAMPING: f64 = 0.01;

/// Scale of the torque produced by a user drag
pub const USER_TORQUE_SCALE: f64 = 0.01;

/// Force and torque acting on one rigid body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wrench {
    /// Net force
    pub force: Vec3,
    /// Net torque about the center of mass
    pub torque: Vec3,
}

impl Wrench {
    /// Create a wrench
    pub fn new(force: Vec3, torque: Vec3) -> Self {
        Wrench { force, torque }
    }

    /// Wrench with zero force and torque
    pub fn zero() -> Self {
        Self::default()
    }

    /// Force applied at `lever` from the center of mass, with coupled torque
    pub fn at_lever(lever: &Vec3, force: Vec3) -> Self {
        Wrench {
            force,
            torque: coupled_torque(lever, &force),
        }
    }

    /// Add another wrench to this one
    pub fn add(&mut self, other: &Wrench) {
        self.force += other.force;
        self.torque += other.torque;
    }

    /// Check if both components are finite
    pub fn is_valid(&self) -> bool {
        is_finite_vec(&self.force) && is_finite_vec(&self.torque)
    }
}

/// `0.1 * lever × force`
pub fn coupled_torque(lever: &Vec3, force: &Vec3) -> Vec3 {
    lever.cross(force) * ROTATION_COUPLING_RATIO
}
