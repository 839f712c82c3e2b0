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
//! Numerical integration of rigid-body state
//!
//! Integrators advance the primary state of every molecule (`x`, `q`, `P`,
//! `L`) and re-derive `v` and `ω` from it. Forces are evaluated through the
//! [`ForceAccumulator`] as part of the step.
//!
//! # Integrators
//!
//! - **Direct**: explicit Euler, one force pass per step
//! - **Midpoint**: RK2-style predictor/corrector, two force passes per step
//!
//! # Orientation drift
//!
//! The quaternion update `q += ½ (ω q) dt` is additive and leaves `q`
//! unnormalized. Rotation matrices are built from the normalized quaternion,
//! so drift only affects the magnitude. Normalizing after every step is
//! available through `renormalize_orientation`.

use crate::forces::{ForceAccumulator, ForceEnvironment};
use crate::model::Molecule;
use log::error;

mod euler;
mod midpoint;

pub use euler::DirectIntegrator;
pub use midpoint::MidpointIntegrator;

/// Selectable integration strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// Explicit Euler
    Direct,
    /// Midpoint predictor/corrector
    Midpoint,
}

impl IntegrationMethod {
    /// Map the `use_midpoint` switch to a method
    pub fn from_use_midpoint(use_midpoint: bool) -> Self {
        if use_midpoint {
            IntegrationMethod::Midpoint
        } else {
            IntegrationMethod::Direct
        }
    }

    /// Instantiate an integrator for this method
    pub fn create(self, renormalize_orientation: bool) -> Box<dyn Integrator> {
        match self {
            IntegrationMethod::Direct => Box::new(DirectIntegrator::new(renormalize_orientation)),
            IntegrationMethod::Midpoint => Box::new(MidpointIntegrator::new(renormalize_orientation)),
        }
    }
}

/// Trait for rigid-body integration methods
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Method implemented by this integrator
    fn method(&self) -> IntegrationMethod;

    /// Advance every molecule by `dt` starting at `env.time`
    ///
    /// Forces are evaluated by `forces` as needed. Returns the number of
    /// molecules whose update was committed; a molecule whose update would
    /// become non-finite keeps its previous state.
    fn step(
        &mut self,
        molecules: &mut [Molecule],
        forces: &ForceAccumulator,
        env: &ForceEnvironment<'_>,
        dt: f64,
    ) -> usize;
}

/// Check that a timestep is usable
///
/// Extremely small timesteps lose precision and large ones are unstable.
pub fn validate_timestep(dt: f64) -> Result<(), String> {
    if dt <= 0.0 || !dt.is_finite() {
        return Err(format!("Invalid timestep: {}. Must be positive and finite.", dt));
    }
    if dt < 1e-9 {
        return Err(format!(
            "Timestep {} is extremely small and may cause precision loss with f64.",
            dt
        ));
    }
    if dt > 1.0 {
        return Err(format!("Timestep {} is large and may cause instability.", dt));
    }
    Ok(())
}

/// Explicit Euler step using the molecule's own rates and wrench
///
/// Returns whether the update was committed.
pub fn advance(molecule: &mut Molecule, dt: f64, renormalize_orientation: bool) -> bool {
    let velocity = *molecule.velocity();
    let angular_velocity = *molecule.angular_velocity();
    let force = *molecule.force();
    let torque = *molecule.torque();
    molecule.advance_with(&velocity, &angular_velocity, &force, &torque, dt, renormalize_orientation)
}

/// Corrector half of the midpoint method
///
/// Advances each molecule over the full `dt` using the velocity, angular
/// velocity, force and torque of its counterpart in `half_step`, which must
/// hold the same molecules in the same order. On a mismatch nothing is
/// advanced. Returns the number of committed updates.
pub fn advance_midpoint(
    molecules: &mut [Molecule],
    half_step: &[Molecule],
    dt: f64,
    renormalize_orientation: bool,
) -> usize {
    if molecules.len() != half_step.len() {
        error!(
            "Midpoint scratch holds {} molecules but {} are live",
            half_step.len(),
            molecules.len()
        );
        debug_assert!(false, "Midpoint scratch must match the live molecule list");
        return 0;
    }

    let mut committed = 0;
    for (molecule, half) in molecules.iter_mut().zip(half_step) {
        if molecule.id() != half.id() {
            error!("Midpoint scratch holds {} where {} was expected", half.id(), molecule.id());
            debug_assert!(false, "Midpoint scratch order must match the live molecule list");
            continue;
        }

        molecule.set_wrench(*half.force(), *half.torque());
        if molecule.advance_with(
            half.velocity(),
            half.angular_velocity(),
            half.force(),
            half.torque(),
            dt,
            renormalize_orientation,
        ) {
            committed += 1;
        }
    }
    committed
}

/// Total kinetic energy of a set of molecules
pub fn total_kinetic_energy<'a, I>(molecules: I) -> f64
where
    I: IntoIterator<Item = &'a Molecule>,
{
    molecules.into_iter().map(Molecule::kinetic_energy).sum()
}
