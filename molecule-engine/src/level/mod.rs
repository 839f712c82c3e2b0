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
//! Level data
//!
//! A [`Level`] owns the molecule set together with every level element:
//! barriers, portals, releasers, thermal sources, persistent fields, timed
//! and user forces, decorations and the temperature grid. Elements flagged
//! persistent survive [`Level::reset`]; everything else is removed by it.

mod barrier;
mod document;
mod portal;
mod releaser;
mod thermal;

pub use barrier::{BarrierElement, BoxBarrier, Oscillation, WallBarrier};
pub use document::{is_version_compatible, LevelDocument, LEVEL_FORMAT_VERSION};
pub use portal::SpherePortal;
pub use releaser::TimedReleaser;
pub use thermal::{BrownianField, Decoration, TemperatureGrid};

use crate::forces::{ForceEnvironment, MoleculeExternalForce, NamedForce, UserForce, Wrench};
use crate::model::{Molecule, MoleculeId, MoleculePlacement, MoleculeSet, Vec3};
use crate::sensors::ConditionStatus;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Seconds a destroyed molecule's remnant stays visible
pub const REMNANT_LIFETIME: f64 = 2.0;

/// Behavior shared by every level element
pub trait LevelElement: fmt::Debug {
    /// Whether the element survives a level reset
    fn is_persistent(&self) -> bool;

    /// Return internal state to its initial value
    fn reset(&mut self) {}

    /// Advance animated state to `time`
    fn animate(&mut self, _time: f64) {}

    /// Current energy consumption
    fn energy_use(&self) -> f64 {
        0.0
    }
}

impl<T: LevelElement + ?Sized> LevelElement for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn animate(&mut self, time: f64) {
        (**self).animate(time)
    }

    fn energy_use(&self) -> f64 {
        (**self).energy_use()
    }
}

/// Boxed barrier of a user-defined type
pub type DynBarrier = Box<dyn Barrier + Send + Sync>;

/// Boxed portal of a user-defined type
pub type DynPortal = Box<dyn Portal + Send + Sync>;

/// Boxed releaser of a user-defined type
pub type DynReleaser = Box<dyn Releaser + Send + Sync>;

/// Element exerting containment or repulsion forces
pub trait Barrier: LevelElement {
    /// Force and torque on the whole molecule
    fn force_on_molecule(&self, molecule: &Molecule) -> Wrench;
}

/// Region capturing molecules
pub trait Portal: LevelElement {
    /// Whether `point` lies inside the region
    fn contains(&self, point: &Vec3) -> bool;

    /// Record a molecule inside the region, returning whether it counts as
    /// a new capture
    fn handle_molecule_entering(&mut self, id: MoleculeId) -> bool;

    /// Whether captured molecules are removed
    fn destroys_on_entry(&self) -> bool;

    /// Whether a destroyed molecule leaves a decoration
    fn spawns_remnant(&self) -> bool {
        false
    }

    /// Forget a molecule that left the level
    fn molecule_removed(&mut self, _id: MoleculeId) {}

    /// Captures since the last reset
    fn captured_count(&self) -> usize;

    /// Verdict of the attached capture condition, if any
    fn condition_status(&self) -> Option<ConditionStatus>;
}

/// Element spawning molecules over time
pub trait Releaser: LevelElement {
    /// Whether a molecule is due at `time`
    fn should_release(&self, time: f64) -> bool;

    /// Produce the next molecule under `id`
    fn release(&mut self, time: f64, id: MoleculeId) -> Molecule;

    /// Releases since the last reset
    fn released_count(&self) -> usize;
}

/// Static configuration of the game field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Lower corner
    pub min: Vec3,
    /// Upper corner
    pub max: Vec3,
    /// Temperature grid columns along x
    pub grid_columns: usize,
    /// Temperature grid rows along y
    pub grid_rows: usize,
    /// Temperature without thermal sources
    pub base_temperature: f64,
    /// Lowest grid temperature
    pub min_temperature: f64,
    /// Highest grid temperature
    pub max_temperature: f64,
    /// Linear damping coefficient
    pub translation_damping: f64,
    /// Angular damping coefficient
    pub rotation_damping: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            min: Vec3::new(-10.0, -10.0, -1.0),
            max: Vec3::new(10.0, 10.0, 1.0),
            grid_columns: 16,
            grid_rows: 16,
            base_temperature: 20.0,
            min_temperature: 0.0,
            max_temperature: 40.0,
            translation_damping: 0.05,
            rotation_damping: 0.05,
        }
    }
}

impl FieldConfig {
    /// Area of the field in the x/y plane
    pub fn area(&self) -> f64 {
        let size = self.max - self.min;
        size.x * size.y
    }

    /// Largest plausible energy use of a single element
    pub fn max_energy_use(&self) -> f64 {
        self.area() * (self.max_temperature - self.min_temperature)
    }

    /// Clamp a temperature to the field's range
    pub fn clamp_temperature(&self, temperature: f64) -> f64 {
        temperature.max(self.min_temperature).min(self.max_temperature)
    }

    /// Whether `point` lies inside the field
    pub fn contains(&self, point: &Vec3) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// Check structural validity
    pub fn validate(&self) -> Result<(), String> {
        if !(0..3).all(|axis| self.min[axis] < self.max[axis]) {
            return Err(format!("field extent {:?}..{:?} is empty", self.min, self.max));
        }
        if self.grid_columns == 0 || self.grid_rows == 0 {
            return Err("temperature grid needs at least one cell".to_string());
        }
        if !(self.min_temperature <= self.max_temperature) {
            return Err(format!(
                "temperature range [{}, {}] is empty",
                self.min_temperature, self.max_temperature
            ));
        }
        if !(self.translation_damping >= 0.0 && self.rotation_damping >= 0.0) {
            return Err("damping coefficients must be non-negative".to_string());
        }
        Ok(())
    }
}

/// A molecule counted by a portal during a sensor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    /// Captured molecule
    pub molecule_id: MoleculeId,
    /// Index of the portal in the level
    pub portal_index: usize,
    /// Whether the molecule was removed
    pub destroyed: bool,
}

fn reset_elements<T: LevelElement>(elements: &mut Vec<T>) {
    elements.retain(|element| element.is_persistent());
    for element in elements.iter_mut() {
        element.reset();
    }
}

/// Molecules and level elements of the running level
///
/// Built-in elements live in typed lists and round-trip through
/// [`LevelDocument`]. Elements added with the `add_custom_*` methods take
/// part in every step and check after the built-ins of the same kind but
/// are not written to documents.
#[derive(Debug)]
pub struct Level {
    field: FieldConfig,
    molecules: MoleculeSet,
    barriers: Vec<BarrierElement>,
    portals: Vec<SpherePortal>,
    releasers: Vec<TimedReleaser>,
    custom_barriers: Vec<DynBarrier>,
    custom_portals: Vec<DynPortal>,
    custom_releasers: Vec<DynReleaser>,
    brownian_fields: Vec<BrownianField>,
    named_forces: Vec<NamedForce>,
    timed_forces: Vec<MoleculeExternalForce>,
    user_force: Option<UserForce>,
    decorations: Vec<Decoration>,
    temperature: TemperatureGrid,
    initial_molecules: Vec<MoleculePlacement>,
}

impl Level {
    /// Empty level on the given field
    pub fn new(field: FieldConfig) -> Self {
        let temperature = TemperatureGrid::new(&field);
        Level {
            field,
            molecules: MoleculeSet::new(),
            barriers: Vec::new(),
            portals: Vec::new(),
            releasers: Vec::new(),
            custom_barriers: Vec::new(),
            custom_portals: Vec::new(),
            custom_releasers: Vec::new(),
            brownian_fields: Vec::new(),
            named_forces: Vec::new(),
            timed_forces: Vec::new(),
            user_force: None,
            decorations: Vec::new(),
            temperature,
            initial_molecules: Vec::new(),
        }
    }

    /// Field configuration
    pub fn field(&self) -> &FieldConfig {
        &self.field
    }

    /// Live molecules
    pub fn molecules(&self) -> &MoleculeSet {
        &self.molecules
    }

    /// Live molecules, mutably
    pub fn molecules_mut(&mut self) -> &mut MoleculeSet {
        &mut self.molecules
    }

    /// Add a barrier
    pub fn add_barrier(&mut self, barrier: impl Into<BarrierElement>) {
        self.barriers.push(barrier.into());
    }

    /// Add a portal
    pub fn add_portal(&mut self, portal: SpherePortal) {
        self.portals.push(portal);
    }

    /// Add a releaser
    pub fn add_releaser(&mut self, releaser: TimedReleaser) {
        self.releasers.push(releaser);
    }

    /// Add a barrier of a user-defined type
    pub fn add_custom_barrier(&mut self, barrier: impl Barrier + Send + Sync + 'static) {
        self.custom_barriers.push(Box::new(barrier));
    }

    /// Add a portal of a user-defined type
    pub fn add_custom_portal(&mut self, portal: impl Portal + Send + Sync + 'static) {
        self.custom_portals.push(Box::new(portal));
    }

    /// Add a releaser of a user-defined type
    pub fn add_custom_releaser(&mut self, releaser: impl Releaser + Send + Sync + 'static) {
        self.custom_releasers.push(Box::new(releaser));
    }

    /// Add a thermal source
    pub fn add_brownian_field(&mut self, field: BrownianField) {
        self.brownian_fields.push(field);
    }

    /// Add a persistent field
    pub fn add_named_force(&mut self, force: NamedForce) {
        self.named_forces.push(force);
    }

    /// Add a decoration
    pub fn add_decoration(&mut self, decoration: Decoration) {
        self.decorations.push(decoration);
    }

    /// Add a molecule spawned whenever the level starts
    pub fn add_initial_molecule(&mut self, placement: MoleculePlacement) {
        self.initial_molecules.push(placement);
    }

    /// Add a timed force
    pub fn add_timed_force(&mut self, force: MoleculeExternalForce) {
        self.timed_forces.push(force);
    }

    /// Replace the user drag
    pub fn set_user_force(&mut self, force: Option<UserForce>) {
        self.user_force = force;
    }

    /// Barriers in evaluation order
    pub fn barriers(&self) -> &[BarrierElement] {
        &self.barriers
    }

    /// Portals in declaration order
    pub fn portals(&self) -> &[SpherePortal] {
        &self.portals
    }

    /// Releasers
    pub fn releasers(&self) -> &[TimedReleaser] {
        &self.releasers
    }

    /// User-defined barriers
    pub fn custom_barriers(&self) -> &[DynBarrier] {
        &self.custom_barriers
    }

    /// User-defined portals, checked after the built-in ones
    pub fn custom_portals(&self) -> &[DynPortal] {
        &self.custom_portals
    }

    /// User-defined releasers
    pub fn custom_releasers(&self) -> &[DynReleaser] {
        &self.custom_releasers
    }

    /// Thermal sources
    pub fn brownian_fields(&self) -> &[BrownianField] {
        &self.brownian_fields
    }

    /// Persistent fields
    pub fn named_forces(&self) -> &[NamedForce] {
        &self.named_forces
    }

    /// Timed forces
    pub fn timed_forces(&self) -> &[MoleculeExternalForce] {
        &self.timed_forces
    }

    /// Current user drag
    pub fn user_force(&self) -> Option<&UserForce> {
        self.user_force.as_ref()
    }

    /// Decorations
    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    /// Temperature grid from the last recompute
    pub fn temperature(&self) -> &TemperatureGrid {
        &self.temperature
    }

    /// Placements spawned on level start
    pub fn initial_molecules(&self) -> &[MoleculePlacement] {
        &self.initial_molecules
    }

    /// Borrow the molecules mutably together with the force environment
    pub fn split_for_step(&mut self, time: f64) -> (&mut [Molecule], ForceEnvironment<'_>) {
        let env = ForceEnvironment {
            time,
            barriers: &self.barriers,
            custom_barriers: &self.custom_barriers,
            named_forces: &self.named_forces,
            timed_forces: &self.timed_forces,
            user_force: self.user_force.as_ref(),
            translation_damping: self.field.translation_damping,
            rotation_damping: self.field.rotation_damping,
        };
        (self.molecules.as_mut_slice(), env)
    }

    /// Spawn the initial molecules, returning how many were added
    pub fn spawn_initial_molecules(&mut self) -> usize {
        for placement in &self.initial_molecules {
            let id = self.molecules.next_id();
            self.molecules.insert(placement.instantiate(id));
        }
        self.initial_molecules.len()
    }

    /// Drop expired decorations
    pub fn purge_expired_decorations(&mut self, time: f64) -> usize {
        let before = self.decorations.len();
        self.decorations.retain(|d| !d.is_expired(time));
        before - self.decorations.len()
    }

    /// Drop expired timed forces and a finished user drag
    pub fn purge_expired_forces(&mut self, time: f64) -> usize {
        let before = self.timed_forces.len();
        self.timed_forces.retain(|f| !f.is_expired(time));
        let mut purged = before - self.timed_forces.len();
        if self.user_force.as_ref().is_some_and(|u| time > u.end_time) {
            self.user_force = None;
            purged += 1;
        }
        purged
    }

    /// Trigger releasers that are due, returning the new molecule ids
    pub fn run_releasers(&mut self, time: f64) -> Vec<MoleculeId> {
        let mut released = Vec::new();
        let releasers = self
            .releasers
            .iter_mut()
            .map(|r| r as &mut dyn Releaser)
            .chain(self.custom_releasers.iter_mut().map(|r| r.as_mut() as &mut dyn Releaser));
        for releaser in releasers {
            if releaser.should_release(time) {
                let id = self.molecules.next_id();
                let molecule = releaser.release(time, id);
                released.push(self.molecules.insert(molecule));
            }
        }
        released
    }

    /// Advance animated elements to `time`
    pub fn animate_elements(&mut self, time: f64) {
        self.barriers.iter_mut().for_each(|e| e.animate(time));
        self.portals.iter_mut().for_each(|e| e.animate(time));
        self.releasers.iter_mut().for_each(|e| e.animate(time));
        self.custom_barriers.iter_mut().for_each(|e| e.animate(time));
        self.custom_portals.iter_mut().for_each(|e| e.animate(time));
        self.custom_releasers.iter_mut().for_each(|e| e.animate(time));
        self.brownian_fields.iter_mut().for_each(|e| e.animate(time));
        self.decorations.iter_mut().for_each(|e| e.animate(time));
    }

    /// Recompute the temperature grid
    pub fn recompute_temperature(&mut self) {
        self.temperature.recompute(&self.field, &self.brownian_fields);
    }

    /// Let portals capture molecules whose center lies inside them
    ///
    /// Portals are checked in declaration order, built-in portals first.
    /// A molecule destroyed by a portal is not offered to later portals.
    /// Custom portals are indexed after the built-in ones.
    pub fn run_portal_checks(&mut self, time: f64) -> Vec<Capture> {
        let mut captures = Vec::new();
        if self.portals.is_empty() && self.custom_portals.is_empty() {
            return captures;
        }

        let candidates: Vec<(MoleculeId, Vec3)> =
            self.molecules.iter().map(|m| (m.id(), *m.position())).collect();

        for (id, position) in candidates {
            let portals = self
                .portals
                .iter_mut()
                .map(|p| p as &mut dyn Portal)
                .chain(self.custom_portals.iter_mut().map(|p| p.as_mut() as &mut dyn Portal));
            for (portal_index, portal) in portals.enumerate() {
                if !portal.contains(&position) || !portal.handle_molecule_entering(id) {
                    continue;
                }
                let destroyed = portal.destroys_on_entry();
                if destroyed && portal.spawns_remnant() {
                    self.decorations
                        .push(Decoration::remnant(position, time, REMNANT_LIFETIME));
                }
                captures.push(Capture {
                    molecule_id: id,
                    portal_index,
                    destroyed,
                });
                if destroyed {
                    break;
                }
            }
        }

        let destroyed: BTreeSet<MoleculeId> = captures
            .iter()
            .filter(|c| c.destroyed)
            .map(|c| c.molecule_id)
            .collect();
        if !destroyed.is_empty() {
            self.remove_molecules(&destroyed);
        }
        captures
    }

    /// Remove molecules and every force targeting them
    ///
    /// Portals are told about each removed id so they can drop any
    /// per-molecule state.
    pub fn remove_molecules(&mut self, ids: &BTreeSet<MoleculeId>) {
        self.molecules.retain(|m| !ids.contains(&m.id()));
        for &id in ids {
            self.portals.iter_mut().for_each(|p| p.molecule_removed(id));
            self.custom_portals.iter_mut().for_each(|p| p.molecule_removed(id));
        }
        self.timed_forces.retain(|f| !ids.contains(&f.molecule_id));
        if self.user_force.as_ref().is_some_and(|u| ids.contains(&u.molecule_id)) {
            self.user_force = None;
        }
    }

    /// Captures across all portals
    pub fn total_captured(&self) -> usize {
        let builtin: usize = self.portals.iter().map(|p| p.captured_count()).sum();
        builtin + self.custom_portals.iter().map(|p| p.captured_count()).sum::<usize>()
    }

    /// Releases across all releasers
    pub fn total_released(&self) -> usize {
        let builtin: usize = self.releasers.iter().map(|r| r.released_count()).sum();
        builtin + self.custom_releasers.iter().map(|r| r.released_count()).sum::<usize>()
    }

    /// Mean temperature grid value
    pub fn average_temperature(&self) -> f64 {
        self.temperature
            .average()
            .unwrap_or(self.field.base_temperature)
    }

    /// Energy use of all elements as a percentage of one element's ceiling
    ///
    /// Each element's use is clamped to the field's maximum plausible
    /// energy use before summing.
    pub fn energy_use_percent(&self) -> f64 {
        let ceiling = self.field.max_energy_use();
        if !(ceiling > 0.0) {
            return 0.0;
        }

        let uses = self
            .barriers
            .iter()
            .map(|e| e.energy_use())
            .chain(self.portals.iter().map(|e| e.energy_use()))
            .chain(self.releasers.iter().map(|e| e.energy_use()))
            .chain(self.custom_barriers.iter().map(|e| e.energy_use()))
            .chain(self.custom_portals.iter().map(|e| e.energy_use()))
            .chain(self.custom_releasers.iter().map(|e| e.energy_use()))
            .chain(self.brownian_fields.iter().map(|e| e.energy_use()));
        let total: f64 = uses.map(|u| u.max(0.0).min(ceiling)).sum();
        total / ceiling * 100.0
    }

    /// Capture condition verdicts in portal order
    pub fn condition_statuses(&self) -> Vec<ConditionStatus> {
        self.portals
            .iter()
            .filter_map(|p| p.condition_status())
            .chain(self.custom_portals.iter().filter_map(|p| p.condition_status()))
            .collect()
    }

    /// Remove non-persistent elements and all molecules and transient forces
    ///
    /// Persistent elements are re-armed. The field configuration and the
    /// initial molecule placements are kept.
    pub fn reset(&mut self) {
        reset_elements(&mut self.barriers);
        reset_elements(&mut self.portals);
        reset_elements(&mut self.releasers);
        reset_elements(&mut self.custom_barriers);
        reset_elements(&mut self.custom_portals);
        reset_elements(&mut self.custom_releasers);
        reset_elements(&mut self.brownian_fields);
        reset_elements(&mut self.decorations);
        self.named_forces.retain(|f| f.persistent);

        self.molecules.clear();
        self.timed_forces.clear();
        self.user_force = None;

        self.temperature = TemperatureGrid::new(&self.field);
        self.recompute_temperature();
        debug!(
            "Level reset: {} barriers, {} portals, {} releasers kept",
            self.barriers.len() + self.custom_barriers.len(),
            self.portals.len() + self.custom_portals.len(),
            self.releasers.len() + self.custom_releasers.len()
        );
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new(FieldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MoleculeTemplate;
    use crate::sensors::{CaptureCondition, Combinator};

    fn placement(x: f64) -> MoleculePlacement {
        MoleculePlacement::at_rest(MoleculeTemplate::single_atom(1.0, 0.0, 0.1), Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_field_helpers() {
        let field = FieldConfig::default();
        assert_eq!(field.area(), 400.0);
        assert_eq!(field.max_energy_use(), 400.0 * 40.0);
        assert_eq!(field.clamp_temperature(100.0), 40.0);
        assert!(field.contains(&Vec3::zeros()));
        assert!(!field.contains(&Vec3::new(0.0, 0.0, 5.0)));
        assert!(field.validate().is_ok());

        let broken = FieldConfig {
            grid_rows: 0,
            ..FieldConfig::default()
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_portal_destroys_and_leaves_remnant() {
        let mut level = Level::default();
        level.add_portal(SpherePortal::new(Vec3::new(5.0, 0.0, 0.0), 1.0).with_remnants());
        level.add_initial_molecule(placement(0.0));
        level.add_initial_molecule(placement(5.0));
        level.spawn_initial_molecules();
        let target = level.molecules().as_slice()[1].id();
        level.add_timed_force(MoleculeExternalForce::new(target, Vec3::zeros(), Vec3::x(), 0.0, 10.0));

        let captures = level.run_portal_checks(1.0);
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].molecule_id, target);
        assert!(captures[0].destroyed);
        assert_eq!(level.molecules().len(), 1);
        assert!(level.timed_forces().is_empty());
        assert_eq!(level.decorations().len(), 1);
        assert_eq!(level.total_captured(), 1);
    }

    #[test]
    fn test_destroyed_molecule_not_offered_to_later_portals() {
        let mut level = Level::default();
        level.add_portal(SpherePortal::new(Vec3::zeros(), 1.0));
        level.add_portal(SpherePortal::new(Vec3::zeros(), 1.0).non_destroying());
        level.add_initial_molecule(placement(0.0));
        level.spawn_initial_molecules();

        level.run_portal_checks(0.0);
        assert_eq!(level.portals()[0].captured_count(), 1);
        assert_eq!(level.portals()[1].captured_count(), 0);
    }

    #[test]
    fn test_removed_molecules_are_forgotten_by_counting_portals() {
        let mut level = Level::default();
        level.add_portal(SpherePortal::new(Vec3::zeros(), 3.0).non_destroying());
        level.add_initial_molecule(placement(0.0));
        level.add_initial_molecule(placement(1.0));
        level.spawn_initial_molecules();

        assert_eq!(level.run_portal_checks(0.0).len(), 2);
        assert!(level.run_portal_checks(0.5).is_empty());
        assert_eq!(level.portals()[0].tracked_molecules(), 2);

        let gone: BTreeSet<_> = [level.molecules().as_slice()[0].id()].into_iter().collect();
        level.remove_molecules(&gone);
        assert_eq!(level.portals()[0].tracked_molecules(), 1);
        assert_eq!(level.total_captured(), 2);
    }

    #[test]
    fn test_reset_keeps_only_persistent_elements() {
        let mut level = Level::default();
        level.add_barrier(WallBarrier::new(Vec3::zeros(), Vec3::y(), 1.0));
        level.add_barrier(WallBarrier::new(Vec3::zeros(), Vec3::x(), 1.0).transient());
        level.add_portal(
            SpherePortal::new(Vec3::zeros(), 1.0).with_condition(CaptureCondition::new(Combinator::And, 1)),
        );
        level.add_brownian_field(BrownianField::new(Vec3::zeros(), 1.0, 5.0).transient());
        level.add_decoration(Decoration::remnant(Vec3::zeros(), 0.0, 1.0));
        level.add_initial_molecule(placement(0.0));
        level.spawn_initial_molecules();
        level.run_portal_checks(0.0);
        assert_eq!(level.total_captured(), 1);

        level.reset();
        assert!(level.molecules().is_empty());
        assert_eq!(level.barriers().len(), 1);
        assert_eq!(level.portals().len(), 1);
        assert_eq!(level.total_captured(), 0);
        assert!(level.brownian_fields().is_empty());
        assert!(level.decorations().is_empty());
        assert_eq!(level.initial_molecules().len(), 1);
    }

    #[test]
    fn test_ids_not_reused_after_reset() {
        let mut level = Level::default();
        level.add_initial_molecule(placement(0.0));
        level.spawn_initial_molecules();
        let first = level.molecules().as_slice()[0].id();
        level.reset();
        level.spawn_initial_molecules();
        assert_ne!(level.molecules().as_slice()[0].id(), first);
    }

    #[test]
    fn test_releasers_spawn_fresh_ids() {
        let mut level = Level::default();
        level.add_releaser(TimedReleaser::new(MoleculeTemplate::single_atom(1.0, 0.0, 0.1), Vec3::zeros(), 1.0));
        level.add_releaser(TimedReleaser::new(MoleculeTemplate::single_atom(1.0, 0.0, 0.1), Vec3::x(), 1.0));

        let released = level.run_releasers(0.0);
        assert_eq!(released.len(), 2);
        assert_ne!(released[0], released[1]);
        assert!(level.run_releasers(0.5).is_empty());
        assert_eq!(level.total_released(), 2);
        assert_eq!(level.molecules().len(), 2);
    }

    #[test]
    fn test_energy_use_is_clamped_per_element() {
        let field = FieldConfig {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(1.0, 1.0, 1.0),
            min_temperature: 0.0,
            max_temperature: 10.0,
            ..FieldConfig::default()
        };
        let mut level = Level::new(field);
        // Ceiling is 10
        level.add_barrier(WallBarrier::new(Vec3::zeros(), Vec3::y(), 1.0).with_oscillation(1.0, 1.0, 50.0));
        level.add_barrier(WallBarrier::new(Vec3::zeros(), Vec3::x(), 1.0).with_oscillation(1.0, 1.0, 2.5));
        assert_eq!(level.energy_use_percent(), 125.0);
    }

    #[test]
    fn test_split_for_step_exposes_environment() {
        let mut level = Level::default();
        level.add_named_force(NamedForce::uniform("gravity", Vec3::new(0.0, -1.0, 0.0)));
        level.add_initial_molecule(placement(0.0));
        level.spawn_initial_molecules();

        let (molecules, env) = level.split_for_step(2.0);
        assert_eq!(molecules.len(), 1);
        assert_eq!(env.time, 2.0);
        assert_eq!(env.named_forces.len(), 1);
        assert_eq!(env.translation_damping, 0.05);
    }
}
