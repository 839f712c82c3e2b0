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
//! Pairwise force law tests
//!
//! Distance cutoffs, same-molecule exclusion and kernel consistency.

use approx::assert_relative_eq;
use molecule_engine::forces::{
    CpuForceKernel, ForceAccumulator, ForceKernel, ForceLawKind, ForceLawParameters, ForceLawRegistry,
    InteractionSite, PairwiseForceLaw, MIN_INTERACTION_DISTANCE,
};
use molecule_engine::model::{AtomSpec, Molecule, MoleculeId, MoleculeTemplate, Quat, Vec3};
use molecule_engine::PhysicsSettings;
use std::collections::BTreeSet;

fn coulomb_only() -> ForceLawRegistry {
    let kinds: BTreeSet<_> = [ForceLawKind::Coulomb].into_iter().collect();
    ForceLawRegistry::from_kinds(&kinds, ForceLawParameters::default())
}

fn site(position: Vec3, charge: f64, parent: u64) -> InteractionSite {
    InteractionSite {
        position,
        charge,
        radius: 0.1,
        parent_id: MoleculeId::new(parent),
    }
}

#[test]
fn test_opposite_charges_attract() {
    let laws = coulomb_only();
    let a = site(Vec3::new(-1.0, 0.0, 0.0), 1.0, 0);
    let b = site(Vec3::new(1.0, 0.0, 0.0), -1.0, 1);

    let on_a = laws.pair_force(&a, &b);
    let on_b = laws.pair_force(&b, &a);

    assert_relative_eq!(on_a, Vec3::new(0.25, 0.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(on_a, -on_b, epsilon = 1e-12);
}

#[test]
fn test_pairs_beyond_max_distance_do_not_interact() {
    let laws = coulomb_only();
    let a = site(Vec3::zeros(), 1.0, 0);
    let b = site(Vec3::new(10.5, 0.0, 0.0), 1.0, 1);
    assert_eq!(laws.pair_force(&a, &b), Vec3::zeros());

    let c = site(Vec3::new(9.5, 0.0, 0.0), 1.0, 1);
    assert!(laws.pair_force(&a, &c).norm() > 0.0);
}

#[test]
fn test_coincident_atoms_do_not_interact() {
    let laws = coulomb_only();
    let a = site(Vec3::zeros(), 1.0, 0);
    let b = site(Vec3::new(MIN_INTERACTION_DISTANCE * 0.5, 0.0, 0.0), 1.0, 1);
    assert_eq!(laws.pair_force(&a, &b), Vec3::zeros());
}

#[test]
fn test_atoms_of_the_same_molecule_do_not_interact() {
    let laws = coulomb_only();
    let a = site(Vec3::zeros(), 1.0, 3);
    let b = site(Vec3::new(1.0, 0.0, 0.0), -1.0, 3);
    assert_eq!(laws.pair_force(&a, &b), Vec3::zeros());
}

#[test]
fn test_van_der_waals_repels_inside_sigma() {
    let kinds: BTreeSet<_> = [ForceLawKind::VanDerWaals].into_iter().collect();
    let laws = ForceLawRegistry::from_kinds(&kinds, ForceLawParameters::default());
    // sigma = 0.2 for two radius 0.1 atoms
    let a = site(Vec3::zeros(), 0.0, 0);
    let near = site(Vec3::new(0.15, 0.0, 0.0), 0.0, 1);
    let far = site(Vec3::new(0.4, 0.0, 0.0), 0.0, 1);

    assert!(laws.pair_force(&a, &near).x < 0.0);
    assert!(laws.pair_force(&a, &far).x > 0.0);
}

#[derive(Debug)]
struct ConstantPull;

impl PairwiseForceLaw for ConstantPull {
    fn name(&self) -> &str {
        "constant_pull"
    }

    fn force_between(&self, target: &InteractionSite, source: &InteractionSite, _params: &ForceLawParameters) -> Vec3 {
        (source.position - target.position).normalize()
    }
}

#[test]
fn test_custom_law_adds_to_built_in_laws() {
    let mut laws = coulomb_only();
    laws.register_law(Box::new(ConstantPull));
    assert_eq!(laws.law_names(), vec!["coulomb", "constant_pull"]);

    let a = site(Vec3::zeros(), 0.0, 0);
    let b = site(Vec3::new(2.0, 0.0, 0.0), 0.0, 1);
    assert_relative_eq!(laws.pair_force(&a, &b), Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_kernel_result_does_not_depend_on_chunking() {
    let laws = coulomb_only();
    let sites: Vec<_> = (0..37)
        .map(|i| {
            let t = i as f64;
            site(
                Vec3::new(t.sin() * 3.0, t.cos() * 3.0, t * 0.05),
                if i % 2 == 0 { 1.0 } else { -1.0 },
                i as u64,
            )
        })
        .collect();

    let mut reference = vec![Vec3::zeros(); sites.len()];
    CpuForceKernel::new().with_chunk_size(1).evaluate(&sites, &laws, &mut reference);

    for chunk_size in [0, 4, 64] {
        let mut forces = vec![Vec3::zeros(); sites.len()];
        CpuForceKernel::new()
            .with_chunk_size(chunk_size)
            .evaluate(&sites, &laws, &mut forces);
        assert_eq!(forces, reference);
    }
}

#[test]
fn test_step_forces_follow_atom_order() {
    let settings = PhysicsSettings {
        force_laws: [ForceLawKind::Coulomb].into_iter().collect(),
        ..PhysicsSettings::default()
    };
    let accumulator = ForceAccumulator::new(&settings);
    let dimer = MoleculeTemplate::new(vec![
        AtomSpec::new(Vec3::new(-0.5, 0.0, 0.0), 1.0, 1.0, 0.1),
        AtomSpec::new(Vec3::new(0.5, 0.0, 0.0), 1.0, 1.0, 0.1),
    ]);
    let molecules = vec![
        Molecule::from_template(MoleculeId::new(0), &dimer, Vec3::zeros(), Quat::identity()),
        Molecule::from_template(
            MoleculeId::new(1),
            &MoleculeTemplate::single_atom(1.0, -1.0, 0.1),
            Vec3::new(0.0, 2.0, 0.0),
            Quat::identity(),
        ),
    ];

    let forces = accumulator.compute_step_forces(&molecules);

    assert_eq!(forces.len(), 3);
    // The dimer atoms are mirror images across the y axis
    assert_relative_eq!(forces[0].x, -forces[1].x, epsilon = 1e-12);
    assert_relative_eq!(forces[0].y, forces[1].y, epsilon = 1e-12);
    assert_relative_eq!(forces[2], -(forces[0] + forces[1]), epsilon = 1e-12);
}
