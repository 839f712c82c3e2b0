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
//! Per-step net force and torque
//!
//! For each molecule, in order:
//!
//! 1. Sum the kernel's per-atom forces; torque is `0.1 * (atom - x) × f`.
//! 2. Add every barrier's contribution.
//! 3. Add persistent named fields scaled by `mass * mass_factor`.
//! 4. Add timed external forces targeting the molecule.
//! 5. If the user drag targets the molecule and is active, scale what has
//!    accumulated so far (force ×0.2, torque ×0.01) and add the drag.
//! 6. Clamp force to `max_force` and torque to `0.1 * max_force` when
//!    constraining is enabled.
//! 7. Subtract `translation_damping * v` and `rotation_damping * ω`.

use super::{
    coupled_torque, CpuForceKernel, ForceKernel, ForceLawRegistry, InteractionSite,
    MoleculeExternalForce, NamedForce, UserForce, Wrench, ROTATION_COUPLING_RATIO,
    USER_FORCE_PRIOR_FORCE_DAMPING, USER_FORCE_PRIOR_TORQUE_DAMPING,
};
use crate::config::PhysicsSettings;
use crate::level::{Barrier, BarrierElement, DynBarrier};
use crate::model::{clamp_magnitude, is_finite_vec, Molecule, Vec3};
use crate::pool::{PoolConfig, VecGuard, VecPool};
use log::{error, warn};

/// Everything outside the molecule set that contributes to a step
#[derive(Debug, Clone, Copy)]
pub struct ForceEnvironment<'a> {
    /// Simulation time the forces are evaluated at
    pub time: f64,
    /// Active barriers
    pub barriers: &'a [BarrierElement],
    /// User-defined barriers, applied after the built-in ones
    pub custom_barriers: &'a [DynBarrier],
    /// Persistent fields
    pub named_forces: &'a [NamedForce],
    /// Timed per-molecule forces
    pub timed_forces: &'a [MoleculeExternalForce],
    /// The current drag, if any
    pub user_force: Option<&'a UserForce>,
    /// Linear damping coefficient
    pub translation_damping: f64,
    /// Angular damping coefficient
    pub rotation_damping: f64,
}

impl<'a> ForceEnvironment<'a> {
    /// Environment with no external contributions and no damping
    pub fn empty() -> Self {
        ForceEnvironment {
            time: 0.0,
            barriers: &[],
            custom_barriers: &[],
            named_forces: &[],
            timed_forces: &[],
            user_force: None,
            translation_damping: 0.0,
            rotation_damping: 0.0,
        }
    }

    /// Same environment at a different time
    pub fn at_time(&self, time: f64) -> Self {
        ForceEnvironment { time, ..*self }
    }
}

/// Combines every force source into a net wrench per molecule
pub struct ForceAccumulator {
    kernel: Box<dyn ForceKernel>,
    laws: ForceLawRegistry,
    mass_factor: f64,
    do_constrain_forces: bool,
    max_force: f64,
    warn_on_invalid: bool,
    site_pool: VecPool<InteractionSite>,
    force_pool: VecPool<Vec3>,
}

impl ForceAccumulator {
    /// Create an accumulator evaluating pairs on the CPU kernel
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self::with_kernel(settings, Box::new(CpuForceKernel::new()))
    }

    /// Create an accumulator with a custom force kernel
    pub fn with_kernel(settings: &PhysicsSettings, kernel: Box<dyn ForceKernel>) -> Self {
        ForceAccumulator {
            kernel,
            laws: ForceLawRegistry::from_kinds(&settings.force_laws, settings.law_parameters()),
            mass_factor: settings.mass_factor,
            do_constrain_forces: settings.do_constrain_forces,
            max_force: settings.max_force,
            warn_on_invalid: true,
            site_pool: VecPool::with_config(PoolConfig::new(256, 2)),
            force_pool: VecPool::with_config(PoolConfig::new(256, 2)),
        }
    }

    /// Refresh cached coefficients after a configuration change
    ///
    /// Custom laws registered through [`ForceAccumulator::laws_mut`] stay
    /// enabled.
    pub fn apply_settings(&mut self, settings: &PhysicsSettings) {
        self.laws.configure(&settings.force_laws, settings.law_parameters());
        self.mass_factor = settings.mass_factor;
        self.do_constrain_forces = settings.do_constrain_forces;
        self.max_force = settings.max_force;
    }

    /// Set whether numeric faults are logged
    pub fn set_warn_on_invalid(&mut self, warn: bool) {
        self.warn_on_invalid = warn;
        self.laws.set_warn_on_invalid(warn);
    }

    /// Enabled pairwise laws
    pub fn laws(&self) -> &ForceLawRegistry {
        &self.laws
    }

    /// Mutable access to the law registry, e.g. to add a custom law
    pub fn laws_mut(&mut self) -> &mut ForceLawRegistry {
        &mut self.laws
    }

    /// Name of the force kernel in use
    pub fn kernel_name(&self) -> &str {
        self.kernel.name()
    }

    /// Per-atom pairwise forces for all molecules, in atom submission order
    pub fn compute_step_forces(&self, molecules: &[Molecule]) -> Vec<Vec3> {
        self.evaluate_atoms(molecules).to_vec()
    }

    fn evaluate_atoms(&self, molecules: &[Molecule]) -> VecGuard<Vec3> {
        let atom_count: usize = molecules.iter().map(|m| m.atoms().len()).sum();

        let mut sites = self.site_pool.acquire(atom_count);
        sites.extend(molecules.iter().flat_map(|m| {
            m.atoms().iter().map(|atom| InteractionSite {
                position: *atom.position(),
                charge: atom.charge(),
                radius: atom.radius(),
                parent_id: atom.parent_id(),
            })
        }));

        let mut forces = self.force_pool.acquire_filled(atom_count, Vec3::zeros());
        self.kernel.evaluate(&sites, &self.laws, &mut forces);

        for (index, force) in forces.iter_mut().enumerate() {
            if !is_finite_vec(force) {
                if self.warn_on_invalid {
                    warn!("Kernel '{}' returned a non-finite force for atom {}", self.kernel.name(), index);
                }
                *force = Vec3::zeros();
            }
        }
        forces
    }

    /// Compute and store the net force and torque on every molecule
    pub fn accumulate(&self, molecules: &mut [Molecule], env: &ForceEnvironment<'_>) {
        let atom_forces = self.evaluate_atoms(molecules);

        let mut cursor = 0;
        for molecule in molecules.iter_mut() {
            let atom_count = molecule.atoms().len();
            let Some(forces) = atom_forces.get(cursor..cursor + atom_count) else {
                error!(
                    "Force buffer holds {} entries but {} needs atoms {}..{}",
                    atom_forces.len(),
                    molecule.id(),
                    cursor,
                    cursor + atom_count
                );
                debug_assert!(false, "Force buffer does not cover every atom");
                molecule.set_wrench(Vec3::zeros(), Vec3::zeros());
                continue;
            };
            cursor += atom_count;

            let wrench = self.molecule_wrench(molecule, forces, env);
            molecule.set_wrench(wrench.force, wrench.torque);
        }
    }

    fn molecule_wrench(&self, molecule: &Molecule, atom_forces: &[Vec3], env: &ForceEnvironment<'_>) -> Wrench {
        let center = *molecule.position();
        let mut total = Wrench::zero();

        for (atom, force) in molecule.atoms().iter().zip(atom_forces) {
            total.force += force;
            total.torque += coupled_torque(&(atom.position() - center), force);
        }

        let barriers = env
            .barriers
            .iter()
            .map(|b| b as &dyn Barrier)
            .chain(env.custom_barriers.iter().map(|b| b.as_ref() as &dyn Barrier));
        for barrier in barriers {
            let contribution = barrier.force_on_molecule(molecule);
            if contribution.is_valid() {
                total.add(&contribution);
            } else if self.warn_on_invalid {
                warn!("Barrier produced a non-finite force on {}", molecule.id());
            }
        }

        for field in env.named_forces {
            total.add(&field.wrench_on(molecule, self.mass_factor));
        }

        for timed in env.timed_forces {
            if let Some(contribution) = timed.wrench_on(molecule, env.time) {
                total.add(&contribution);
            }
        }

        if let Some(user) = env.user_force {
            if user.molecule_id == molecule.id() && user.is_active(env.time) {
                total.force = total.force * USER_FORCE_PRIOR_FORCE_DAMPING + user.force;
                total.torque =
                    total.torque * USER_FORCE_PRIOR_TORQUE_DAMPING + user.constrained_torque(&center);
            }
        }

        if self.do_constrain_forces {
            total.force = clamp_magnitude(total.force, self.max_force);
            total.torque = clamp_magnitude(total.torque, self.max_force * ROTATION_COUPLING_RATIO);
        }

        total.force -= molecule.velocity() * env.translation_damping;
        total.torque -= molecule.angular_velocity() * env.rotation_damping;

        if !total.is_valid() {
            if self.warn_on_invalid {
                warn!("Net force on {} is not finite, using zero", molecule.id());
            }
            return Wrench::zero();
        }
        total
    }
}

impl std::fmt::Debug for ForceAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceAccumulator")
            .field("kernel", &self.kernel.name())
            .field("laws", &self.laws.law_names())
            .field("mass_factor", &self.mass_factor)
            .field("do_constrain_forces", &self.do_constrain_forces)
            .field("max_force", &self.max_force)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{ForceLawKind, ForceLawParameters, PairwiseForceLaw};
    use crate::model::{AtomSpec, MoleculeId, MoleculeTemplate, Quat};
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn settings_without_laws() -> PhysicsSettings {
        PhysicsSettings {
            force_laws: BTreeSet::new(),
            ..PhysicsSettings::default()
        }
    }

    fn ball(id: u64, x: f64, charge: f64) -> Molecule {
        Molecule::from_template(
            MoleculeId::new(id),
            &MoleculeTemplate::single_atom(1.0, charge, 0.1),
            Vec3::new(x, 0.0, 0.0),
            Quat::identity(),
        )
    }

    #[test]
    fn test_step_forces_follow_submission_order() {
        let settings = PhysicsSettings {
            force_laws: [ForceLawKind::Coulomb].into_iter().collect(),
            ..PhysicsSettings::default()
        };
        let accumulator = ForceAccumulator::new(&settings);
        let molecules = vec![ball(0, 0.0, 1.0), ball(1, 2.0, 1.0)];

        let forces = accumulator.compute_step_forces(&molecules);
        assert_eq!(forces.len(), 2);
        assert_relative_eq!(forces[0], Vec3::new(-0.25, 0.0, 0.0));
        assert_relative_eq!(forces[1], Vec3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_named_field_and_damping() {
        let accumulator = ForceAccumulator::new(&settings_without_laws());
        let mut molecules = vec![ball(0, 0.0, 0.0).with_velocity(Vec3::new(2.0, 0.0, 0.0))];
        let fields = vec![NamedForce::uniform("gravity", Vec3::new(0.0, -3.0, 0.0))];
        let env = ForceEnvironment {
            named_forces: &fields,
            translation_damping: 0.5,
            ..ForceEnvironment::empty()
        };

        accumulator.accumulate(&mut molecules, &env);
        assert_relative_eq!(*molecules[0].force(), Vec3::new(-1.0, -3.0, 0.0));
    }

    #[test]
    fn test_damping_applies_after_clamp() {
        let settings = PhysicsSettings {
            max_force: 1.0,
            do_constrain_forces: true,
            ..settings_without_laws()
        };
        let accumulator = ForceAccumulator::new(&settings);
        let mut molecules = vec![ball(0, 0.0, 0.0).with_velocity(Vec3::new(0.0, 4.0, 0.0))];
        let fields = vec![NamedForce::uniform("push", Vec3::new(100.0, 0.0, 0.0))];
        let env = ForceEnvironment {
            named_forces: &fields,
            translation_damping: 1.0,
            ..ForceEnvironment::empty()
        };

        accumulator.accumulate(&mut molecules, &env);
        assert_relative_eq!(*molecules[0].force(), Vec3::new(1.0, -4.0, 0.0));
    }

    #[test]
    fn test_user_force_only_targets_its_molecule() {
        let accumulator = ForceAccumulator::new(&settings_without_laws());
        let mut molecules = vec![
            Molecule::from_template(
                MoleculeId::new(0),
                &MoleculeTemplate::new(vec![AtomSpec::new(Vec3::zeros(), 1.0, 0.0, 0.1)]),
                Vec3::zeros(),
                Quat::identity(),
            ),
            ball(1, 5.0, 0.0),
        ];
        let user = UserForce {
            molecule_id: MoleculeId::new(1),
            origin: Vec3::new(5.0, 0.0, 0.0),
            force: Vec3::new(0.0, 2.0, 0.0),
            start_time: 0.0,
            end_time: 1.0,
            plane_normal: Vec3::z(),
        };
        let env = ForceEnvironment {
            user_force: Some(&user),
            ..ForceEnvironment::empty()
        };

        accumulator.accumulate(&mut molecules, &env);
        assert_relative_eq!(*molecules[0].force(), Vec3::zeros());
        assert_relative_eq!(*molecules[1].force(), Vec3::new(0.0, 2.0, 0.0));

        // Inactive once the drag has ended
        accumulator.accumulate(&mut molecules, &env.at_time(2.0));
        assert_relative_eq!(*molecules[1].force(), Vec3::zeros());
    }

    #[derive(Debug)]
    struct ConstantPush;

    impl PairwiseForceLaw for ConstantPush {
        fn name(&self) -> &str {
            "constant"
        }

        fn force_between(&self, _: &InteractionSite, _: &InteractionSite, _: &ForceLawParameters) -> Vec3 {
            Vec3::new(1.0, 0.0, 0.0)
        }
    }

    #[test]
    fn test_custom_law_survives_settings_change() {
        let mut accumulator = ForceAccumulator::new(&settings_without_laws());
        accumulator.laws_mut().register_law(Box::new(ConstantPush));

        let settings = PhysicsSettings {
            max_force: 500.0,
            ..settings_without_laws()
        };
        accumulator.apply_settings(&settings);
        assert_eq!(accumulator.laws().law_names(), vec!["constant"]);

        let mut molecules = vec![ball(0, 0.0, 0.0), ball(1, 2.0, 0.0)];
        accumulator.accumulate(&mut molecules, &ForceEnvironment::empty());
        assert_relative_eq!(*molecules[0].force(), Vec3::new(1.0, 0.0, 0.0));
    }
}
