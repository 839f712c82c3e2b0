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
//! Two oppositely charged ions released from rest
//!
//! Compares the direct and midpoint integrators on the same pair and shows
//! the van der Waals core stopping the collapse.

use molecule_engine::config::USE_MIDPOINT;
use molecule_engine::level::{FieldConfig, Level};
use molecule_engine::model::{MoleculePlacement, MoleculeTemplate, Vec3};
use molecule_engine::{ParameterValue, Simulation};

fn pair_level() -> Level {
    let field = FieldConfig {
        translation_damping: 0.0,
        rotation_damping: 0.0,
        ..FieldConfig::default()
    };
    let mut level = Level::new(field);
    level.add_initial_molecule(MoleculePlacement::at_rest(
        MoleculeTemplate::single_atom(1.0, 1.0, 0.25),
        Vec3::new(-1.5, 0.0, 0.0),
    ));
    level.add_initial_molecule(MoleculePlacement::at_rest(
        MoleculeTemplate::single_atom(1.0, -1.0, 0.25),
        Vec3::new(1.5, 0.0, 0.0),
    ));
    level
}

fn main() {
    env_logger::init();

    println!("Molecule Engine - Charged Pair");
    println!("==============================\n");

    for use_midpoint in [false, true] {
        let mut sim = Simulation::new(pair_level());
        if let Err(err) = sim.set_parameter(USE_MIDPOINT, ParameterValue::Flag(use_midpoint)) {
            eprintln!("Could not select integrator: {}", err);
            return;
        }
        sim.start_level();

        println!("{} integrator", sim.integrator_name());
        println!("{:>6}  {:>10}  {:>12}", "t", "gap", "kinetic");
        for frame in 0..=100 {
            if frame % 10 == 0 {
                let molecules = sim.level().molecules().as_slice();
                let gap = (molecules[1].position() - molecules[0].position()).norm();
                println!("{:>6.2}  {:>10.4}  {:>12.6}", sim.time(), gap, sim.kinetic_energy());
            }
            sim.update(0.04);
        }
        println!();
    }
}
