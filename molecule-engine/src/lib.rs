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
//! # Molecule Engine
//!
//! A rigid-body molecular dynamics core. Molecules are rigid assemblies of
//! charged atoms that interact through pluggable pairwise force laws, are
//! pushed around by barriers, fields and user drags, and are advanced with
//! a direct or midpoint integrator. Levels add portals that capture
//! molecules, releasers that emit them and a temperature grid, all driven
//! by a single [`Simulation`] controller.
//!
//! ## Features
//!
//! - **Rigid bodies**: mass, inertia, momentum and orientation per molecule
//! - **Force laws**: Coulomb and van der Waals, extensible through a trait
//! - **Parallelization**: Optional Rayon evaluation of atom pair forces
//! - **Levels**: JSON documents with version checks and a safe fallback
//!
//! ## Example
//!
//! ```rust
//! use molecule_engine::level::Level;
//! use molecule_engine::model::{MoleculePlacement, MoleculeTemplate, Vec3};
//! use molecule_engine::Simulation;
//!
//! let mut level = Level::default();
//! level.add_initial_molecule(MoleculePlacement::at_rest(
//!     MoleculeTemplate::single_atom(1.0, 1.0, 0.1),
//!     Vec3::new(-1.0, 0.0, 0.0),
//! ));
//! level.add_initial_molecule(MoleculePlacement::at_rest(
//!     MoleculeTemplate::single_atom(1.0, -1.0, 0.1),
//!     Vec3::new(1.0, 0.0, 0.0),
//! ));
//!
//! let mut sim = Simulation::new(level);
//! sim.start_level();
//! sim.update(0.04);
//! assert_eq!(sim.level().molecules().len(), 2);
//! ```

#![warn(missing_docs)]

/// Named parameters and cached physics settings
pub mod config;

/// Error types
pub mod error;

/// Force laws, kernels and per-step force accumulation
pub mod forces;

/// Numerical integration methods
pub mod integration;

/// Level elements, temperature grid and level documents
pub mod level;

/// Game state, clock, events and the simulation controller
pub mod lifecycle;

/// Atoms, molecules and the molecule arena
pub mod model;

/// Reusable per-atom buffers for the force passes of each step
pub mod pool;

/// Sensor sampling and end conditions
pub mod sensors;

pub use config::{ParameterStore, ParameterValue, PhysicsSettings};
pub use error::{ConfigError, LevelError};
pub use level::{Level, LevelDocument};
pub use lifecycle::{GameState, LoadOutcome, Simulation, SimulationEvent};
pub use model::{Molecule, MoleculeId, MoleculeSet, MoleculeTemplate};
