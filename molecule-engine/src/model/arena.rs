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
//! Molecule storage
//!
//! Molecules live in a dense vector so force passes can walk them in a
//! stable order. A side index maps ids to slots.

use super::{Molecule, MoleculeId, MoleculeTemplate, Quat, Vec3};
use log::warn;
use std::collections::HashMap;

/// Ordered collection of the molecules in a level
///
/// Iteration order is insertion order and survives removals.
#[derive(Debug, Clone, Default)]
pub struct MoleculeSet {
    molecules: Vec<Molecule>,
    index: HashMap<MoleculeId, usize>,
    next_id: u64,
}

impl MoleculeSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next unused id
    pub fn next_id(&mut self) -> MoleculeId {
        let id = MoleculeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a molecule, returning the id it is stored under
    ///
    /// A molecule whose id is already taken gets a fresh one.
    pub fn insert(&mut self, mut molecule: Molecule) -> MoleculeId {
        if self.index.contains_key(&molecule.id()) {
            let fresh = self.next_id();
            warn!("{} already present, storing as {}", molecule.id(), fresh);
            molecule.set_id(fresh);
        } else if molecule.id().raw() >= self.next_id {
            self.next_id = molecule.id().raw() + 1;
        }

        let id = molecule.id();
        self.index.insert(id, self.molecules.len());
        self.molecules.push(molecule);
        id
    }

    /// Instantiate a template and insert it
    pub fn spawn(
        &mut self,
        template: &MoleculeTemplate,
        position: Vec3,
        orientation: Quat,
        velocity: Vec3,
    ) -> MoleculeId {
        let id = self.next_id();
        let molecule =
            Molecule::from_template(id, template, position, orientation).with_velocity(velocity);
        self.insert(molecule)
    }

    /// Remove a molecule, keeping the order of the remaining ones
    pub fn remove(&mut self, id: MoleculeId) -> Option<Molecule> {
        let slot = self.index.remove(&id)?;
        let removed = self.molecules.remove(slot);
        self.rebuild_index();
        Some(removed)
    }

    /// Keep only molecules matching the predicate
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Molecule) -> bool,
    {
        self.molecules.retain(keep);
        self.rebuild_index();
    }

    /// Look up a molecule
    pub fn get(&self, id: MoleculeId) -> Option<&Molecule> {
        self.index.get(&id).map(|&slot| &self.molecules[slot])
    }

    /// Look up a molecule mutably
    pub fn get_mut(&mut self, id: MoleculeId) -> Option<&mut Molecule> {
        match self.index.get(&id) {
            Some(&slot) => self.molecules.get_mut(slot),
            None => None,
        }
    }

    /// Slot of a molecule in iteration order
    pub fn index_of(&self, id: MoleculeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Check whether a molecule is present
    pub fn contains(&self, id: MoleculeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of molecules
    pub fn len(&self) -> usize {
        self.molecules.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Molecule> {
        self.molecules.iter()
    }

    /// All molecules as a slice
    pub fn as_slice(&self) -> &[Molecule] {
        &self.molecules
    }

    /// All molecules as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [Molecule] {
        &mut self.molecules
    }

    /// Remove every molecule
    ///
    /// The id counter keeps running so ids are not reused within a level.
    pub fn clear(&mut self) {
        self.molecules.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, molecule) in self.molecules.iter().enumerate() {
            self.index.insert(molecule.id(), slot);
        }
    }
}
