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
//! Batch evaluation of pairwise forces
//!
//! A [`ForceKernel`] receives every atom of every molecule in submission
//! order and writes one force per atom in the same order. Implementations
//! may run on any substrate as long as each result equals the sum of
//! [`ForceLawRegistry::pair_force`] over all other atoms.

use super::{ForceLawRegistry, InteractionSite};
use crate::model::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// N-body force evaluation capability
pub trait ForceKernel: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Write the total force on each site into `forces`
    ///
    /// `forces` has the same length as `sites`. The call blocks until every
    /// force is written.
    fn evaluate(&self, sites: &[InteractionSite], laws: &ForceLawRegistry, forces: &mut [Vec3]);
}

/// Direct O(n²) summation on the CPU
///
/// With the `parallel` feature the targets are split into chunks evaluated
/// on the rayon pool. Each target still sums its sources in submission order,
/// so the result does not depend on the thread count.
#[derive(Debug, Clone, Default)]
pub struct CpuForceKernel {
    /// Targets per parallel task (0 = auto)
    chunk_size: usize,
}

impl CpuForceKernel {
    /// Create a kernel with automatic chunking
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of targets per parallel task
    ///
    /// Set to 0 for automatic determination based on thread count.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Configured chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn force_on(target: &InteractionSite, sites: &[InteractionSite], laws: &ForceLawRegistry) -> Vec3 {
        sites
            .iter()
            .fold(Vec3::zeros(), |acc, source| acc + laws.pair_force(target, source))
    }

    #[cfg(feature = "parallel")]
    fn effective_chunk_size(&self, len: usize) -> usize {
        if self.chunk_size > 0 {
            self.chunk_size
        } else {
            // Aim for at least 4 chunks per thread for load balancing
            (len / (rayon::current_num_threads() * 4)).max(1)
        }
    }
}

impl ForceKernel for CpuForceKernel {
    fn name(&self) -> &str {
        "cpu"
    }

    fn evaluate(&self, sites: &[InteractionSite], laws: &ForceLawRegistry, forces: &mut [Vec3]) {
        debug_assert_eq!(sites.len(), forces.len(), "Force buffer must match site count");

        #[cfg(feature = "parallel")]
        {
            let chunk_size = self.effective_chunk_size(sites.len());
            forces
                .par_chunks_mut(chunk_size)
                .zip(sites.par_chunks(chunk_size))
                .for_each(|(out, targets)| {
                    for (force, target) in out.iter_mut().zip(targets) {
                        *force = Self::force_on(target, sites, laws);
                    }
                });
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (force, target) in forces.iter_mut().zip(sites) {
                *force = Self::force_on(target, sites, laws);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{ForceLawKind, ForceLawParameters};
    use crate::model::MoleculeId;
    use approx::assert_relative_eq;
    use std::collections::BTreeSet;

    fn coulomb_only() -> ForceLawRegistry {
        let enabled: BTreeSet<_> = [ForceLawKind::Coulomb].into_iter().collect();
        ForceLawRegistry::from_kinds(&enabled, ForceLawParameters::default())
    }

    fn site(x: f64, y: f64, charge: f64, parent: u64) -> InteractionSite {
        InteractionSite {
            position: Vec3::new(x, y, 0.0),
            charge,
            radius: 0.1,
            parent_id: MoleculeId::new(parent),
        }
    }

    #[test]
    fn test_pair_is_newtonian() {
        let sites = vec![site(0.0, 0.0, 1.0, 0), site(1.0, 0.0, -1.0, 1)];
        let mut forces = vec![Vec3::zeros(); 2];
        CpuForceKernel::new().evaluate(&sites, &coulomb_only(), &mut forces);

        assert_relative_eq!(forces[0], Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(forces[0] + forces[1], Vec3::zeros());
    }

    #[test]
    fn test_same_parent_sites_do_not_interact() {
        let sites = vec![site(0.0, 0.0, 1.0, 3), site(0.5, 0.0, 1.0, 3)];
        let mut forces = vec![Vec3::new(9.0, 9.0, 9.0); 2];
        CpuForceKernel::new().evaluate(&sites, &coulomb_only(), &mut forces);
        assert_eq!(forces, vec![Vec3::zeros(); 2]);
    }

    #[test]
    fn test_result_independent_of_chunking() {
        let sites: Vec<_> = (0..23)
            .map(|i| {
                let angle = i as f64 * 0.7;
                site(angle.cos() * 3.0, angle.sin() * 2.0, if i % 2 == 0 { 1.0 } else { -0.5 }, i as u64 / 2)
            })
            .collect();
        let laws = coulomb_only();

        let mut reference = vec![Vec3::zeros(); sites.len()];
        CpuForceKernel::new().with_chunk_size(1).evaluate(&sites, &laws, &mut reference);

        for chunk_size in [0, 4, 7, 64] {
            let mut forces = vec![Vec3::zeros(); sites.len()];
            CpuForceKernel::new()
                .with_chunk_size(chunk_size)
                .evaluate(&sites, &laws, &mut forces);
            assert_eq!(forces, reference);
        }
    }
}
