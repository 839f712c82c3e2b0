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
//! Explicit Euler integrator
//!
//! ```text
//! x += v dt
//! q += ½ (ω q) dt
//! P += F dt
//! L += τ dt
//! ```
//!
//! followed by re-deriving `v = P / m` and `ω = R I⁻¹ Rᵀ L`. First-order
//! accurate, one force evaluation per step.

use super::{advance, IntegrationMethod, Integrator};
use crate::forces::{ForceAccumulator, ForceEnvironment};
use crate::model::Molecule;

/// Explicit Euler integrator
#[derive(Debug, Clone, Default)]
pub struct DirectIntegrator {
    renormalize_orientation: bool,
}

impl DirectIntegrator {
    /// Create a direct integrator
    pub fn new(renormalize_orientation: bool) -> Self {
        DirectIntegrator {
            renormalize_orientation,
        }
    }
}

impl Integrator for DirectIntegrator {
    fn name(&self) -> &str {
        "direct"
    }

    fn method(&self) -> IntegrationMethod {
        IntegrationMethod::Direct
    }

    fn step(
        &mut self,
        molecules: &mut [Molecule],
        forces: &ForceAccumulator,
        env: &ForceEnvironment<'_>,
        dt: f64,
    ) -> usize {
        forces.accumulate(molecules, env);
        let mut committed = 0;
        for molecule in molecules.iter_mut() {
            if advance(molecule, dt, self.renormalize_orientation) {
                committed += 1;
            }
        }
        committed
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
    fn test_direct_step_under_constant_field() {
        let accumulator = ForceAccumulator::new(&PhysicsSettings::default());
        let mut molecules = vec![Molecule::from_template(
            MoleculeId::new(0),
            &MoleculeTemplate::single_atom(1.0, 0.0, 0.1),
            Vec3::zeros(),
            Quat::identity(),
        )];
        let fields = vec![NamedForce::uniform("gravity", Vec3::new(0.0, -10.0, 0.0))];
        let env = ForceEnvironment {
            named_forces: &fields,
            ..ForceEnvironment::empty()
        };

        let mut integrator = DirectIntegrator::new(false);
        assert_eq!(integrator.step(&mut molecules, &accumulator, &env, 0.1), 1);
        // Position uses the velocity from before the step
        assert_relative_eq!(*molecules[0].position(), Vec3::zeros());
        assert_relative_eq!(*molecules[0].velocity(), Vec3::new(0.0, -1.0, 0.0));

        integrator.step(&mut molecules, &accumulator, &env, 0.1);
        assert_relative_eq!(*molecules[0].position(), Vec3::new(0.0, -0.1, 0.0));
    }
}
