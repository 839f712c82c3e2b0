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
//! Pairwise force laws
//!
//! A force law computes the force exerted on one atom by another from their
//! positions, charges and radii. Several laws are active at once and their
//! outputs are summed.
//!
//! # Coulomb
//!
//! **F = k * q₁ * q₂ * d / |d|³**, with `d` pointing from the source to the
//! target atom, so like charges repel.
//!
//! # Van der Waals
//!
//! Lennard-Jones form with `σ = radius_factor * (r₁ + r₂)`:
//!
//! **F = 24ε / |d| * (2(σ/|d|)¹² - (σ/|d|)⁶) * d / |d|**
//!
//! Repulsive below `2^(1/6) σ`, weakly attractive beyond it.
//!
//! # Exclusions
//!
//! The registry returns zero for atoms of the same molecule, for pairs closer
//! than [`MIN_INTERACTION_DISTANCE`] and for pairs beyond the configured
//! maximum interaction distance.

use crate::model::{is_finite_vec, MoleculeId, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Pairs closer than this do not interact
pub const MIN_INTERACTION_DISTANCE: f64 = 1e-4;

/// Atom data submitted to the force kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSite {
    /// World position
    pub position: Vec3,
    /// Scalar charge
    pub charge: f64,
    /// Atom radius
    pub radius: f64,
    /// Owning molecule
    pub parent_id: MoleculeId,
}

/// Tunable coefficients shared by the built-in laws
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceLawParameters {
    /// Coulomb constant `k`
    pub coulomb_strength: f64,
    /// Lennard-Jones well depth `ε`
    pub van_der_waals_strength: f64,
    /// Scale from summed atom radii to `σ`
    pub van_der_waals_radius_factor: f64,
    /// Pairs farther apart than this do not interact
    pub max_interaction_distance: f64,
}

impl Default for ForceLawParameters {
    fn default() -> Self {
        ForceLawParameters {
            coulomb_strength: 1.0,
            van_der_waals_strength: 1.0,
            van_der_waals_radius_factor: 1.0,
            max_interaction_distance: 10.0,
        }
    }
}

/// Capability of computing the force between two atoms
pub trait PairwiseForceLaw: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics
    fn name(&self) -> &str;

    /// Force exerted on `target` by `source`
    ///
    /// Called only for pairs that passed the distance and parent checks.
    fn force_between(
        &self,
        target: &InteractionSite,
        source: &InteractionSite,
        params: &ForceLawParameters,
    ) -> Vec3;
}

/// Inverse-square electrostatic law
#[derive(Debug, Clone, Copy, Default)]
pub struct CoulombLaw;

impl PairwiseForceLaw for CoulombLaw {
    fn name(&self) -> &str {
        ForceLawKind::Coulomb.name()
    }

    fn force_between(
        &self,
        target: &InteractionSite,
        source: &InteractionSite,
        params: &ForceLawParameters,
    ) -> Vec3 {
        let d = target.position - source.position;
        let r = d.norm();
        d * (params.coulomb_strength * target.charge * source.charge / (r * r * r))
    }
}

/// Short-range Lennard-Jones law
#[derive(Debug, Clone, Copy, Default)]
pub struct VanDerWaalsLaw;

impl PairwiseForceLaw for VanDerWaalsLaw {
    fn name(&self) -> &str {
        ForceLawKind::VanDerWaals.name()
    }

    fn force_between(
        &self,
        target: &InteractionSite,
        source: &InteractionSite,
        params: &ForceLawParameters,
    ) -> Vec3 {
        let d = target.position - source.position;
        let r = d.norm();
        let sigma = params.van_der_waals_radius_factor * (target.radius + source.radius);
        let sr6 = (sigma / r).powi(6);
        let magnitude = 24.0 * params.van_der_waals_strength / r * (2.0 * sr6 * sr6 - sr6);
        d * (magnitude / r)
    }
}

/// Built-in law selector used by the configuration multi-select
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ForceLawKind {
    /// [`CoulombLaw`]
    Coulomb,
    /// [`VanDerWaalsLaw`]
    VanDerWaals,
}

impl ForceLawKind {
    /// Every built-in law
    pub const ALL: [ForceLawKind; 2] = [ForceLawKind::Coulomb, ForceLawKind::VanDerWaals];

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            ForceLawKind::Coulomb => "coulomb",
            ForceLawKind::VanDerWaals => "van_der_waals",
        }
    }

    /// Parse a display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Instantiate the law
    pub fn instantiate(&self) -> Box<dyn PairwiseForceLaw> {
        match self {
            ForceLawKind::Coulomb => Box::new(CoulombLaw),
            ForceLawKind::VanDerWaals => Box::new(VanDerWaalsLaw),
        }
    }
}

impl fmt::Display for ForceLawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of enabled laws and their shared parameters
///
/// Built-in laws follow the configured [`ForceLawKind`] selection and are
/// replaced by [`ForceLawRegistry::configure`]. Laws added with
/// [`ForceLawRegistry::register_law`] are kept across reconfiguration and
/// evaluated after the built-in ones.
#[derive(Debug)]
pub struct ForceLawRegistry {
    builtin: Vec<Box<dyn PairwiseForceLaw>>,
    custom: Vec<Box<dyn PairwiseForceLaw>>,
    params: ForceLawParameters,
    warn_on_invalid: bool,
}

impl ForceLawRegistry {
    /// Create a registry with no laws
    pub fn new(params: ForceLawParameters) -> Self {
        ForceLawRegistry {
            builtin: Vec::new(),
            custom: Vec::new(),
            params,
            warn_on_invalid: true,
        }
    }

    /// Create a registry with the given built-in laws enabled
    pub fn from_kinds(enabled: &BTreeSet<ForceLawKind>, params: ForceLawParameters) -> Self {
        let mut registry = Self::new(params);
        registry.configure(enabled, params);
        registry
    }

    /// Replace the built-in law selection and the shared parameters
    ///
    /// Registered custom laws are untouched.
    pub fn configure(&mut self, enabled: &BTreeSet<ForceLawKind>, params: ForceLawParameters) {
        self.builtin = enabled.iter().map(ForceLawKind::instantiate).collect();
        self.params = params;
    }

    /// Enable an additional law
    pub fn register_law(&mut self, law: Box<dyn PairwiseForceLaw>) {
        self.custom.push(law);
    }

    fn laws(&self) -> impl Iterator<Item = &dyn PairwiseForceLaw> {
        self.builtin.iter().chain(&self.custom).map(|law| law.as_ref())
    }

    /// Names of the enabled laws in evaluation order
    pub fn law_names(&self) -> Vec<&str> {
        self.laws().map(|law| law.name()).collect()
    }

    /// Number of enabled laws
    pub fn law_count(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    /// Number of registered custom laws
    pub fn custom_law_count(&self) -> usize {
        self.custom.len()
    }

    /// Shared law parameters
    pub fn params(&self) -> &ForceLawParameters {
        &self.params
    }

    /// Set whether non-finite law output is logged
    pub fn set_warn_on_invalid(&mut self, warn: bool) {
        self.warn_on_invalid = warn;
    }

    /// Sum of all enabled laws for one ordered pair
    ///
    /// Returns zero for excluded pairs. A law producing a non-finite force
    /// contributes zero and is reported.
    pub fn pair_force(&self, target: &InteractionSite, source: &InteractionSite) -> Vec3 {
        if target.parent_id == source.parent_id {
            return Vec3::zeros();
        }

        let distance = (target.position - source.position).norm();
        // The negated comparison also rejects NaN distances
        if !(distance >= MIN_INTERACTION_DISTANCE) || distance > self.params.max_interaction_distance
        {
            return Vec3::zeros();
        }

        let mut total = Vec3::zeros();
        for law in self.laws() {
            let force = law.force_between(target, source, &self.params);
            if !is_finite_vec(&force) {
                if self.warn_on_invalid {
                    warn!(
                        "Force law '{}' produced a non-finite force between atoms of {} and {} at distance {:.3e}",
                        law.name(),
                        target.parent_id,
                        source.parent_id,
                        distance
                    );
                }
                continue;
            }
            total += force;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn site(x: f64, charge: f64, parent: u64) -> InteractionSite {
        InteractionSite {
            position: Vec3::new(x, 0.0, 0.0),
            charge,
            radius: 0.5,
            parent_id: MoleculeId::new(parent),
        }
    }

    #[test]
    fn test_coulomb_like_charges_repel() {
        let params = ForceLawParameters::default();
        let force = CoulombLaw.force_between(&site(2.0, 1.0, 0), &site(0.0, 1.0, 1), &params);
        assert_relative_eq!(force, Vec3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_coulomb_opposite_charges_attract() {
        let params = ForceLawParameters::default();
        let force = CoulombLaw.force_between(&site(2.0, 1.0, 0), &site(0.0, -2.0, 1), &params);
        assert_relative_eq!(force, Vec3::new(-0.5, 0.0, 0.0));
    }

    #[test]
    fn test_van_der_waals_equilibrium() {
        let params = ForceLawParameters::default();
        // sigma = 1.0, zero force at 2^(1/6)
        let r0 = 2f64.powf(1.0 / 6.0);
        let force = VanDerWaalsLaw.force_between(&site(r0, 0.0, 0), &site(0.0, 0.0, 1), &params);
        assert_relative_eq!(force.norm(), 0.0, epsilon = 1e-12);

        let close = VanDerWaalsLaw.force_between(&site(0.9, 0.0, 0), &site(0.0, 0.0, 1), &params);
        assert!(close.x > 0.0);
        let far = VanDerWaalsLaw.force_between(&site(1.5, 0.0, 0), &site(0.0, 0.0, 1), &params);
        assert!(far.x < 0.0);
    }

    #[test]
    fn test_kind_names() {
        for kind in ForceLawKind::ALL {
            assert_eq!(ForceLawKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.instantiate().name(), kind.name());
        }
        assert_eq!(ForceLawKind::from_name("gravity"), None);
    }

    #[test]
    fn test_registry_sums_enabled_laws() {
        let params = ForceLawParameters::default();
        let enabled: BTreeSet<_> = ForceLawKind::ALL.into_iter().collect();
        let registry = ForceLawRegistry::from_kinds(&enabled, params);
        assert_eq!(registry.law_names(), vec!["coulomb", "van_der_waals"]);

        let a = site(1.2, 1.0, 0);
        let b = site(0.0, -1.0, 1);
        let expected = CoulombLaw.force_between(&a, &b, &params)
            + VanDerWaalsLaw.force_between(&a, &b, &params);
        assert_relative_eq!(registry.pair_force(&a, &b), expected);
    }

    #[derive(Debug)]
    struct BrokenLaw;

    impl PairwiseForceLaw for BrokenLaw {
        fn name(&self) -> &str {
            "broken"
        }

        fn force_between(&self, _: &InteractionSite, _: &InteractionSite, _: &ForceLawParameters) -> Vec3 {
            Vec3::new(f64::NAN, 0.0, 0.0)
        }
    }

    #[test]
    fn test_non_finite_law_output_is_dropped() {
        let mut registry = ForceLawRegistry::new(ForceLawParameters::default());
        registry.set_warn_on_invalid(false);
        registry.register_law(Box::new(BrokenLaw));
        registry.register_law(Box::new(CoulombLaw));

        let force = registry.pair_force(&site(2.0, 1.0, 0), &site(0.0, 1.0, 1));
        assert_relative_eq!(force, Vec3::new(0.25, 0.0, 0.0));
    }

    #[test]
    fn test_configure_keeps_custom_laws() {
        let coulomb: BTreeSet<_> = [ForceLawKind::Coulomb].into_iter().collect();
        let mut registry = ForceLawRegistry::from_kinds(&coulomb, ForceLawParameters::default());
        registry.set_warn_on_invalid(false);
        registry.register_law(Box::new(BrokenLaw));

        let params = ForceLawParameters {
            coulomb_strength: 2.0,
            ..ForceLawParameters::default()
        };
        let both: BTreeSet<_> = ForceLawKind::ALL.into_iter().collect();
        registry.configure(&both, params);

        assert_eq!(registry.law_names(), vec!["coulomb", "van_der_waals", "broken"]);
        assert_eq!(registry.custom_law_count(), 1);
        assert_eq!(registry.params().coulomb_strength, 2.0);

        registry.configure(&BTreeSet::new(), params);
        assert_eq!(registry.law_names(), vec!["broken"]);
    }
}
