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
//! Midpoint (RK2) integrator
//!
//! # Algorithm
//!
//! ```text
//! forces at t on the live molecules
//! scratch = copy of the live molecules
//! scratch advanced by dt/2 (explicit Euler)
//! forces at t + dt/2 on scratch
//! live advanced by dt using v, ω, F, τ of scratch
//! ```
//!
//! Second-order accurate at the cost of a second force pass. The scratch
//! copy must stay in one-to-one correspondence with the live list for the
//! duration of the step.

use super::{advance, advance_midpoint, IntegrationMethod, Integrator};
use crate::forces::{ForceAccumulator, ForceEnvironment};
use crate::model::Molecule;

/// Midpoint predictor/corrector integrator
#[derive(Debug, Clone, Default)]
pub struct MidpointIntegrator {
    renormalize_orientation: bool,
    scratch: Vec<Molecule>,
}

impl MidpointIntegrator {
    /// Create a midpoint integrator
    pub fn new(renormalize_orientation: bool) -> Self {
        MidpointIntegrator {
            renormalize_orientation,
            scratch: Vec::new(),
        }
    }
}

impl Integrator for MidpointIntegrator {
    fn name(&self) -> &str {
        "midpoint"
    }

    fn method(&self) -> IntegrationMethod {
        IntegrationMethod::Midpoint
    }

    fn step(
        &mut self,
        molecules: &mut [Molecule],
        forces: &ForceAccumulator,
        env: &ForceEnvironment<'_>,
        dt: f64,
    ) -> usize {
        let half_dt = 0.5 * dt;

        forces.accumulate(molecules, env);

        self.scratch.clear();
        self.scratch.extend_from_slice(molecules);
        for molecule in &mut self.scratch {
            advance(molecule, half_dt, self.renormalize_orientation);
        }

        forces.accumulate(&mut self.scratch, &env.at_time(env.time + half_dt));

        advance_midpoint(molecules, &self.scratch, dt, self.renormalize_orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsSettings;
    use crate::forces::NamedForce;
    use crate::model::{MoleculeId, MoleculeTemplate, Quat, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_midpoint_uses_half_step_velocity() {
        let accumulator = ForceAccumulator::new(&PhysicsSettings::default());
        let mut molecules = vec![Molecule::from_template(
            MoleculeId::new(0),
            &MoleculeTemplate::single_atom(2.0, 0.0, 0.1),
            Vec3::zeros(),
            Quat::identity(),
        )
        .with_velocity(Vec3::new(1.0, 0.0, 0.0))];
        let fields = vec![NamedForce::uniform("push", Vec3::new(3.0, 0.0, 0.0))];
        let env = ForceEnvironment {
            named_forces: &fields,
            ..ForceEnvironment::empty()
        };

        let dt = 0.2;
        let mut integrator = MidpointIntegrator::new(false);
        assert_eq!(integrator.step(&mut molecules, &accumulator, &env, dt), 1);

        // Field acts as acceleration 3, so the half-step velocity is 1 + 3 * dt / 2
        let half_velocity = 1.0 + 3.0 * dt / 2.0;
        assert_relative_eq!(molecules[0].position().x, half_velocity * dt, epsilon = 1e-12);
        assert_relative_eq!(molecules[0].velocity().x, 1.0 + 3.0 * dt, epsilon = 1e-12);
    }
}
