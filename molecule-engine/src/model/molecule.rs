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
//! Molecules as rigid bodies
//!
//! The primary state of a molecule is its center of mass `x`, orientation
//! quaternion `q`, linear momentum `P` and angular momentum `L`. Velocity and
//! angular velocity are derived from that state through the mass and the
//! world-frame inverse inertia tensor and are never integrated directly.

use super::{is_finite_quat, is_finite_vec, Atom, AtomSpec, Mat3, Quat, Vec3};
use log::{error, warn};
use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique molecule identifier
///
/// Ids are assigned monotonically by [`super::MoleculeSet`] and are never
/// reused within a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoleculeId(u64);

impl MoleculeId {
    /// Create an id from a raw value
    pub fn new(raw: u64) -> Self {
        MoleculeId(raw)
    }

    /// Get the raw value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MoleculeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Molecule({})", self.0)
    }
}

/// Atom layout and composition of a molecule kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeTemplate {
    /// Atoms in submission order
    pub atoms: Vec<AtomSpec>,
}

impl MoleculeTemplate {
    /// Create a template from a list of atoms
    ///
    /// # Panics
    ///
    /// Panics if `atoms` is empty.
    pub fn new(atoms: Vec<AtomSpec>) -> Self {
        assert!(!atoms.is_empty(), "Molecule template needs at least one atom");
        MoleculeTemplate { atoms }
    }

    /// Template consisting of one atom at the origin
    pub fn single_atom(mass: f64, charge: f64, radius: f64) -> Self {
        Self::new(vec![AtomSpec::new(Vec3::zeros(), mass, charge, radius)])
    }

    /// Sum of atom masses
    pub fn total_mass(&self) -> f64 {
        self.atoms.iter().map(|a| a.mass).sum()
    }

    /// Mass-weighted mean of the atom offsets
    pub fn center_of_mass(&self) -> Vec3 {
        let total = self.total_mass();
        if total <= 0.0 {
            return Vec3::zeros();
        }
        self.atoms
            .iter()
            .fold(Vec3::zeros(), |acc, a| acc + a.offset * a.mass)
            / total
    }

    /// Check that the template is non-empty and every atom is valid
    pub fn is_valid(&self) -> bool {
        !self.atoms.is_empty() && self.atoms.iter().all(AtomSpec::is_valid)
    }
}

/// Where and how a molecule enters the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculePlacement {
    /// Composition of the molecule
    pub template: MoleculeTemplate,
    /// Initial center of mass
    pub position: Vec3,
    /// Initial orientation
    #[serde(default = "identity_orientation")]
    pub orientation: Quat,
    /// Initial velocity of the center of mass
    #[serde(default)]
    pub velocity: Vec3,
}

fn identity_orientation() -> Quat {
    Quat::identity()
}

impl MoleculePlacement {
    /// Placement at rest with identity orientation
    pub fn at_rest(template: MoleculeTemplate, position: Vec3) -> Self {
        MoleculePlacement {
            template,
            position,
            orientation: Quat::identity(),
            velocity: Vec3::zeros(),
        }
    }

    /// Build the molecule described by this placement
    pub fn instantiate(&self, id: MoleculeId) -> Molecule {
        Molecule::from_template(id, &self.template, self.position, self.orientation)
            .with_velocity(self.velocity)
    }
}

/// Velocity and angular velocity derived from the primary state
///
/// Computed on demand and discarded after use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Center-of-mass velocity
    pub velocity: Vec3,
    /// Angular velocity in world coordinates
    pub angular_velocity: Vec3,
}

impl BodyState {
    /// Check that both vectors are finite
    pub fn is_valid(&self) -> bool {
        is_finite_vec(&self.velocity) && is_finite_vec(&self.angular_velocity)
    }
}

/// A rigid cluster of atoms
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    id: MoleculeId,
    atoms: Vec<Atom>,
    mass: f64,
    inertia_body: Mat3,
    inverse_inertia_body: Mat3,
    position: Vec3,
    orientation: Quat,
    linear_momentum: Vec3,
    angular_momentum: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
}

impl Molecule {
    /// Instantiate a template with its center of mass at `position`
    ///
    /// Atom offsets are re-centered on the template's center of mass. The
    /// molecule starts at rest.
    pub fn from_template(
        id: MoleculeId,
        template: &MoleculeTemplate,
        position: Vec3,
        orientation: Quat,
    ) -> Self {
        let center = template.center_of_mass();
        let mass = template.total_mass();

        let mut inertia_body = Mat3::zeros();
        let atoms: Vec<Atom> = template
            .atoms
            .iter()
            .map(|spec| {
                let r = spec.offset - center;
                inertia_body += (Mat3::identity() * r.norm_squared() - r * r.transpose()) * spec.mass;
                // Solid sphere term keeps single-atom and collinear molecules invertible
                inertia_body += Mat3::identity() * (0.4 * spec.mass * spec.radius * spec.radius);
                Atom::new(id, r, spec)
            })
            .collect();

        let inverse_inertia_body = inertia_body.try_inverse().unwrap_or_else(|| {
            warn!("Inertia tensor of {} is singular, rotation disabled", id);
            Mat3::zeros()
        });

        let mut molecule = Molecule {
            id,
            atoms,
            mass,
            inertia_body,
            inverse_inertia_body,
            position,
            orientation,
            linear_momentum: Vec3::zeros(),
            angular_momentum: Vec3::zeros(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
        };
        molecule.place_atoms();
        molecule
    }

    /// Set the center-of-mass velocity (updates linear momentum)
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.linear_momentum = velocity * self.mass;
        self.refresh_body_state();
        self
    }

    /// Set the angular velocity (updates angular momentum)
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        let rotation = self.rotation_matrix();
        let inertia_world = rotation * self.inertia_body * rotation.transpose();
        self.angular_momentum = inertia_world * angular_velocity;
        self.refresh_body_state();
        self
    }

    /// Molecule id
    pub fn id(&self) -> MoleculeId {
        self.id
    }

    /// Atoms in submission order
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Total mass
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Body-frame inertia tensor about the center of mass
    pub fn inertia_body(&self) -> &Mat3 {
        &self.inertia_body
    }

    /// Center of mass `x`
    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    /// Orientation `q`
    pub fn orientation(&self) -> &Quat {
        &self.orientation
    }

    /// Linear momentum `P`
    pub fn linear_momentum(&self) -> &Vec3 {
        &self.linear_momentum
    }

    /// Angular momentum `L`
    pub fn angular_momentum(&self) -> &Vec3 {
        &self.angular_momentum
    }

    /// Velocity derived from `P` at the last commit
    pub fn velocity(&self) -> &Vec3 {
        &self.velocity
    }

    /// Angular velocity derived from `L` and `q` at the last commit
    pub fn angular_velocity(&self) -> &Vec3 {
        &self.angular_velocity
    }

    /// Net force of the current step
    pub fn force(&self) -> &Vec3 {
        &self.force
    }

    /// Net torque of the current step
    pub fn torque(&self) -> &Vec3 {
        &self.torque
    }

    /// Rotation matrix of the normalized orientation
    ///
    /// Falls back to identity for a degenerate quaternion.
    pub fn rotation_matrix(&self) -> Mat3 {
        rotation_matrix_of(&self.orientation)
    }

    /// World-frame inverse inertia tensor `R I⁻¹ Rᵀ`
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let rotation = self.rotation_matrix();
        rotation * self.inverse_inertia_body * rotation.transpose()
    }

    /// Derive velocity and angular velocity from the primary state
    pub fn body_state(&self) -> BodyState {
        derive_body_state(
            self.mass,
            &self.inverse_inertia_body,
            &self.rotation_matrix(),
            &self.linear_momentum,
            &self.angular_momentum,
        )
    }

    /// Translational plus rotational kinetic energy
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
            + 0.5 * self.angular_velocity.dot(&self.angular_momentum)
    }

    /// Charge-weighted centroid of the atom world positions
    ///
    /// Returns `None` for a molecule whose atoms carry no charge.
    pub fn charge_center(&self) -> Option<Vec3> {
        charge_weighted_centroid(self.atoms.iter().map(|a| (*a.position(), a.charge())))
    }

    pub(crate) fn set_id(&mut self, id: MoleculeId) {
        self.id = id;
        for atom in &mut self.atoms {
            atom.set_parent(id);
        }
    }

    pub(crate) fn set_wrench(&mut self, force: Vec3, torque: Vec3) {
        self.force = force;
        self.torque = torque;
    }

    /// Advance the primary state with explicitly supplied rates
    ///
    /// `x += v dt`, `q += ½ (ω q) dt`, `P += F dt`, `L += τ dt`, followed by
    /// re-deriving `v`, `ω` and the atom world positions. Nothing is
    /// committed when any resulting value is non-finite; returns whether the
    /// update was committed.
    pub(crate) fn advance_with(
        &mut self,
        velocity: &Vec3,
        angular_velocity: &Vec3,
        force: &Vec3,
        torque: &Vec3,
        dt: f64,
        renormalize: bool,
    ) -> bool {
        let position = self.position + velocity * dt;
        let spin = Quat::from_imag(*angular_velocity) * self.orientation * 0.5;
        let mut orientation = self.orientation + spin * dt;
        if renormalize {
            let norm = orientation.norm();
            if norm > 0.0 {
                orientation = orientation / norm;
            }
        }
        let linear_momentum = self.linear_momentum + force * dt;
        let angular_momentum = self.angular_momentum + torque * dt;

        if !(is_finite_vec(&position)
            && is_finite_quat(&orientation)
            && is_finite_vec(&linear_momentum)
            && is_finite_vec(&angular_momentum))
        {
            warn!("Discarding non-finite rigid-body update for {}", self.id);
            return false;
        }

        let rotation = rotation_matrix_of(&orientation);
        let state = derive_body_state(
            self.mass,
            &self.inverse_inertia_body,
            &rotation,
            &linear_momentum,
            &angular_momentum,
        );
        if !state.is_valid() {
            warn!("Discarding update with non-finite body state for {}", self.id);
            return false;
        }

        self.position = position;
        self.orientation = orientation;
        self.linear_momentum = linear_momentum;
        self.angular_momentum = angular_momentum;
        self.velocity = state.velocity;
        self.angular_velocity = state.angular_velocity;
        for atom in &mut self.atoms {
            atom.place(&self.position, &rotation);
        }
        true
    }

    fn refresh_body_state(&mut self) {
        let state = self.body_state();
        if state.is_valid() {
            self.velocity = state.velocity;
            self.angular_velocity = state.angular_velocity;
        } else {
            error!("Derived body state of {} is not finite", self.id);
        }
    }

    fn place_atoms(&mut self) {
        let rotation = self.rotation_matrix();
        for atom in &mut self.atoms {
            atom.place(&self.position, &rotation);
        }
    }
}

fn rotation_matrix_of(orientation: &Quat) -> Mat3 {
    if !is_finite_quat(orientation) || orientation.norm() < f64::EPSILON {
        return Mat3::identity();
    }
    UnitQuaternion::from_quaternion(*orientation)
        .to_rotation_matrix()
        .into_inner()
}

fn derive_body_state(
    mass: f64,
    inverse_inertia_body: &Mat3,
    rotation: &Mat3,
    linear_momentum: &Vec3,
    angular_momentum: &Vec3,
) -> BodyState {
    let inverse_inertia_world = rotation * inverse_inertia_body * rotation.transpose();
    BodyState {
        velocity: linear_momentum / mass,
        angular_velocity: inverse_inertia_world * angular_momentum,
    }
}

/// Average of positions weighted by the absolute value of their charges
///
/// A zero total weight is a numeric degeneracy: it is logged, asserted in
/// debug builds, and yields `None` otherwise.
pub fn charge_weighted_centroid<I>(samples: I) -> Option<Vec3>
where
    I: IntoIterator<Item = (Vec3, f64)>,
{
    let mut weighted = Vec3::zeros();
    let mut total = 0.0;
    for (position, charge) in samples {
        let weight = charge.abs();
        weighted += position * weight;
        total += weight;
    }

    if total > 0.0 && total.is_finite() {
        Some(weighted / total)
    } else {
        error!("Charge-weighted centroid requested with total absolute charge {}", total);
        debug_assert!(total > 0.0, "Total absolute charge weight must be positive");
        None
    }
}
