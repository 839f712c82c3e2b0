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
//! Level lifecycle
//!
//! [`Simulation`] is the single owner of the level, the configuration and
//! the physics state. Its [`Simulation::update`] is the only periodic entry
//! point. Each call:
//!
//! 1. advances physics over `dt * physics_speed` in at most
//!    [`MAX_SUBSTEPS`] integrator steps of at most `physics_timestep` each
//! 2. when the bookkeeping interval has passed, purges expired decorations
//!    and timed forces, runs releasers, animates elements and recomputes the
//!    temperature grid
//! 3. when the sensor interval has also passed, runs portal checks and,
//!    while the game is running, samples sensors and evaluates the end
//!    condition
//!
//! Nothing inside `update` fails; numeric faults are logged and contained.

mod clock;
mod events;
mod state;

pub use clock::SimulationClock;
pub use events::{EventDispatcher, Observer, SimulationEvent};
pub use state::{GameState, GameStateMachine, StateTransition};

use crate::config::{ParameterChange, ParameterStore, ParameterValue, PhysicsSettings};
use crate::error::{ConfigError, LevelError};
use crate::forces::{
    CpuForceKernel, ForceAccumulator, ForceKernel, MoleculeExternalForce, PairwiseForceLaw, UserForce,
};
use crate::integration::{total_kinetic_energy, validate_timestep, IntegrationMethod, Integrator};
use crate::level::{Level, LevelDocument};
use crate::model::{MoleculeId, Vec3};
use crate::sensors::{evaluate_end_condition, sample_level, SensorHistory};
use log::{debug, info, trace, warn};
use std::path::Path;

/// Upper bound on integrator steps per update
pub const MAX_SUBSTEPS: usize = 16;

/// Result of loading a level document
#[derive(Debug)]
pub enum LoadOutcome {
    /// The document was loaded
    Loaded,
    /// The document was rejected and the default level installed instead
    FellBackToDefault(LevelError),
}

impl LoadOutcome {
    /// Whether the default level was installed
    pub fn is_fallback(&self) -> bool {
        matches!(self, LoadOutcome::FellBackToDefault(_))
    }
}

/// Top-level simulation controller
pub struct Simulation {
    level: Level,
    store: ParameterStore,
    settings: PhysicsSettings,
    forces: ForceAccumulator,
    integrator: Box<dyn Integrator>,
    clock: SimulationClock,
    state: GameStateMachine,
    sensors: SensorHistory,
    events: EventDispatcher,
}

impl Simulation {
    /// Controller for `level` with default parameters
    pub fn new(level: Level) -> Self {
        Self::with_kernel(level, ParameterStore::with_defaults(), Box::new(CpuForceKernel::new()))
    }

    /// Controller with explicit parameters
    pub fn with_store(level: Level, store: ParameterStore) -> Self {
        Self::with_kernel(level, store, Box::new(CpuForceKernel::new()))
    }

    /// Controller with explicit parameters and force kernel
    pub fn with_kernel(level: Level, store: ParameterStore, kernel: Box<dyn ForceKernel>) -> Self {
        let settings = PhysicsSettings::from_store(&store);
        let forces = ForceAccumulator::with_kernel(&settings, kernel);
        let integrator = IntegrationMethod::from_use_midpoint(settings.use_midpoint)
            .create(settings.renormalize_orientation);
        let clock = SimulationClock::new(settings.animation_interval, settings.sensor_interval);

        Simulation {
            level,
            store,
            settings,
            forces,
            integrator,
            clock,
            state: GameStateMachine::new(),
            sensors: SensorHistory::new(),
            events: EventDispatcher::new(),
        }
    }

    /// Register an observer for simulation events
    pub fn subscribe(&mut self, observer: Observer) {
        self.events.subscribe(observer);
    }

    /// Change a parameter and refresh the cached settings
    pub fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<ParameterChange, ConfigError> {
        let change = self.store.set(name, value)?;
        if change.is_effective() {
            debug!("Parameter '{}' changed from {} to {}", change.name, change.old, change.new);
            self.apply_settings(PhysicsSettings::from_store(&self.store));
            self.events.emit(&SimulationEvent::ParameterChanged(change.clone()));
        }
        Ok(change)
    }

    fn apply_settings(&mut self, settings: PhysicsSettings) {
        self.forces.apply_settings(&settings);
        if settings.use_midpoint != self.settings.use_midpoint
            || settings.renormalize_orientation != self.settings.renormalize_orientation
        {
            self.integrator = IntegrationMethod::from_use_midpoint(settings.use_midpoint)
                .create(settings.renormalize_orientation);
            debug!("Switched to {} integration", self.integrator.name());
        }
        self.settings = settings;
    }

    /// Reset the level and start playing it
    pub fn start_level(&mut self) {
        self.reset_level();
        let spawned = self.level.spawn_initial_molecules();
        self.clock.set_running(true);
        info!("Level started with {} molecules", spawned);
        self.transition(GameState::Running);
    }

    /// Clear molecules, transient elements, sensor history and the clock
    pub fn reset_level(&mut self) {
        self.level.reset();
        self.sensors.clear();
        self.clock.reset();
    }

    /// Pause or resume time
    pub fn set_running(&mut self, running: bool) {
        self.clock.set_running(running);
    }

    /// Whether time is passing
    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Advance the simulation by `dt` driver seconds
    pub fn update(&mut self, dt: f64) {
        if !self.clock.is_running() {
            return;
        }
        if !(dt > 0.0 && dt.is_finite()) {
            warn!("Ignoring update with invalid dt {}", dt);
            return;
        }

        let elapsed = dt * self.settings.physics_speed;
        if elapsed > 0.0 {
            let steps = ((elapsed / self.settings.physics_timestep).ceil() as usize).clamp(1, MAX_SUBSTEPS);
            let step_dt = elapsed / steps as f64;
            if let Err(reason) = validate_timestep(step_dt) {
                warn!("{}", reason);
            }
            for _ in 0..steps {
                self.physics_step(step_dt);
                self.clock.advance(step_dt);
            }
        }

        if self.clock.animation_due() {
            self.run_bookkeeping();
        }
    }

    fn physics_step(&mut self, dt: f64) {
        let time = self.clock.time();
        let (molecules, env) = self.level.split_for_step(time);
        let total = molecules.len();
        let committed = self.integrator.step(molecules, &self.forces, &env, dt);
        if committed < total {
            trace!("{} of {} molecules kept their state at t={}", total - committed, total, time);
        }
    }

    fn run_bookkeeping(&mut self) {
        let time = self.clock.time();
        self.level.purge_expired_decorations(time);
        self.level.purge_expired_forces(time);

        for id in self.level.run_releasers(time) {
            self.events.emit(&SimulationEvent::MoleculeReleased { id, time });
        }

        self.level.animate_elements(time);
        self.level.recompute_temperature();

        if !self.clock.sensor_due() {
            return;
        }

        for capture in self.level.run_portal_checks(time) {
            self.events.emit(&SimulationEvent::MoleculeCaptured {
                id: capture.molecule_id,
                portal_index: capture.portal_index,
                destroyed: capture.destroyed,
                time,
            });
        }

        if self.state.current() == GameState::Running {
            let reading = sample_level(&self.level, time);
            self.sensors.record_reading(&reading);
            if evaluate_end_condition(self.level.condition_statuses()) {
                info!("End condition met at t={:.2}", time);
                self.transition(GameState::Finished);
            }
        }
    }

    fn transition(&mut self, to: GameState) {
        match self.state.transition_to(to) {
            Some(transition) => {
                debug!("Game state {} -> {}", transition.from, transition.to);
                self.events.emit(&SimulationEvent::GameStateChanged(transition));
            }
            None => warn!("Rejected game state change {} -> {}", self.state.current(), to),
        }
    }

    /// Replace the level with one parsed from a JSON document
    ///
    /// A malformed or incompatible document installs
    /// [`LevelDocument::default_level`] instead and notifies observers.
    pub fn load_level_str(&mut self, json: &str) -> LoadOutcome {
        match LevelDocument::from_json(json) {
            Ok(document) => {
                self.install_level(document.into_level());
                LoadOutcome::Loaded
            }
            Err(err) => self.fall_back(err),
        }
    }

    /// Replace the level with one read from a JSON file
    pub fn load_level_from_path(&mut self, path: impl AsRef<Path>) -> LoadOutcome {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(json) => self.load_level_str(&json),
            Err(err) => self.fall_back(LevelError::Io(err)),
        }
    }

    fn fall_back(&mut self, err: LevelError) -> LoadOutcome {
        warn!("Level load failed, using default level: {}", err);
        self.install_level(LevelDocument::default_level().into_level());
        self.events.emit(&SimulationEvent::LevelLoadFallback {
            reason: err.to_string(),
        });
        LoadOutcome::FellBackToDefault(err)
    }

    fn install_level(&mut self, level: Level) {
        self.level = level;
        self.reset_level();
        self.clock.set_running(false);
        let transition = self.state.reload();
        self.events.emit(&SimulationEvent::GameStateChanged(transition));
    }

    /// Serialize the current level
    pub fn save_level_str(&self, name: &str) -> Result<String, LevelError> {
        LevelDocument::from_level(name, &self.level).to_json()
    }

    /// Write the current level to a JSON file
    pub fn save_level_to_path(&self, path: impl AsRef<Path>, name: &str) -> Result<(), LevelError> {
        let json = self.save_level_str(name)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Apply a timed force to a molecule, returning false if it does not exist
    pub fn add_timed_force(&mut self, molecule_id: MoleculeId, origin: Vec3, force: Vec3, duration: f64) -> bool {
        if !self.level.molecules().contains(molecule_id) {
            warn!("Timed force for unknown {}", molecule_id);
            return false;
        }
        let time = self.clock.time();
        self.level
            .add_timed_force(MoleculeExternalForce::new(molecule_id, origin, force, time, duration));
        true
    }

    /// Start a user drag, replacing any previous one
    ///
    /// Returns false if the molecule does not exist.
    pub fn apply_user_force(
        &mut self,
        molecule_id: MoleculeId,
        origin: Vec3,
        force: Vec3,
        duration: f64,
        plane_normal: Vec3,
    ) -> bool {
        if !self.level.molecules().contains(molecule_id) {
            warn!("User force for unknown {}", molecule_id);
            return false;
        }
        let time = self.clock.time();
        self.level.set_user_force(Some(UserForce {
            molecule_id,
            origin,
            force,
            start_time: time,
            end_time: time + duration,
            plane_normal,
        }));
        true
    }

    /// End the current user drag
    pub fn release_user_force(&mut self) {
        self.level.set_user_force(None);
    }

    /// Current level
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// Current level, mutably
    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    /// Cached physics settings
    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Parameter store
    pub fn parameters(&self) -> &ParameterStore {
        &self.store
    }

    /// Clock
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Current simulation time
    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// Current game state
    pub fn game_state(&self) -> GameState {
        self.state.current()
    }

    /// Game state before the last transition
    pub fn previous_game_state(&self) -> Option<GameState> {
        self.state.previous()
    }

    /// Recorded sensor series
    pub fn sensor_history(&self) -> &SensorHistory {
        &self.sensors
    }

    /// Force accumulator in use
    pub fn forces(&self) -> &ForceAccumulator {
        &self.forces
    }

    /// Add a pairwise law evaluated after the selected built-in laws
    ///
    /// The law stays registered across parameter changes.
    pub fn register_force_law(&mut self, law: Box<dyn PairwiseForceLaw>) {
        debug!("Registering force law {}", law.name());
        self.forces.laws_mut().register_law(law);
    }

    /// Name of the integrator in use
    pub fn integrator_name(&self) -> &str {
        self.integrator.name()
    }

    /// Kinetic energy of all live molecules
    pub fn kinetic_energy(&self) -> f64 {
        total_kinetic_energy(self.level.molecules().iter())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.clock.time())
            .field("state", &self.state.current())
            .field("molecules", &self.level.molecules().len())
            .field("integrator", &self.integrator.name())
            .field("forces", &self.forces)
            .finish()
    }
}
