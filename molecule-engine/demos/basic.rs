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
//! Basic example running the default level
//!
//! Loads the built-in level, plays it for a few simulated seconds and
//! prints the sensor series recorded along the way.

use molecule_engine::lifecycle::SimulationEvent;
use molecule_engine::sensors::{CAPTURED_SERIES, ENERGY_SERIES, RELEASED_SERIES, TEMPERATURE_SERIES};
use molecule_engine::{LevelDocument, Simulation};

fn main() {
    env_logger::init();

    println!("Molecule Engine - Basic Example");
    println!("===============================\n");

    let level = LevelDocument::default_level().into_level();
    let mut sim = Simulation::new(level);
    sim.subscribe(Box::new(|event: &SimulationEvent| match event {
        SimulationEvent::MoleculeReleased { id, time } => println!("  t={:5.2}  released {}", time, id),
        SimulationEvent::MoleculeCaptured { id, portal_index, time, .. } => {
            println!("  t={:5.2}  portal {} captured {}", time, portal_index, id)
        }
        SimulationEvent::GameStateChanged(transition) => {
            println!("  state {} -> {}", transition.from, transition.to)
        }
        _ => {}
    }));

    sim.start_level();
    println!("Started with {} molecules\n", sim.level().molecules().len());

    let frame = 1.0 / 25.0;
    for _ in 0..250 {
        sim.update(frame);
    }

    println!("\nAfter {:.1} simulated seconds:", sim.time());
    println!("  state:           {}", sim.game_state());
    println!("  molecules:       {}", sim.level().molecules().len());
    println!("  kinetic energy:  {:.4}", sim.kinetic_energy());

    for name in [TEMPERATURE_SERIES, CAPTURED_SERIES, RELEASED_SERIES, ENERGY_SERIES] {
        if let Some((time, value)) = sim.sensor_history().series(name).and_then(|s| s.last()) {
            println!("  {:<16} {:.3} (t={:.2})", format!("{}:", name), value, time);
        }
    }
}
