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
//! Tunable parameters
//!
//! The [`ParameterStore`] holds named, typed parameters with ranges and is
//! what an editing surface talks to. The physics core never reads the store
//! while stepping: it works from a [`PhysicsSettings`] copy that is rebuilt
//! whenever a parameter change is applied.

use crate::error::ConfigError;
use crate::forces::{ForceLawKind, ForceLawParameters};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Scale applied to named fields on top of the molecule mass
pub const MASS_FACTOR: &str = "Mass Factor";
/// Clamp limit for net force magnitude
pub const MAX_FORCE: &str = "max_force";
/// Pairs farther apart do not interact
pub const MAX_FORCE_DISTANCE: &str = "max_force_distance";
/// Longest simulated time covered by one integrator step
pub const PHYSICS_TIMESTEP: &str = "physics_timestep";
/// Simulated seconds per driver second
pub const PHYSICS_SPEED: &str = "physics_speed";
/// Whether the force clamp is applied
pub const DO_CONSTRAIN_FORCES: &str = "do_constrain_forces";
/// Midpoint integration instead of direct Euler
pub const USE_MIDPOINT: &str = "use_midpoint";
/// Enabled pairwise laws
pub const FORCE_LAWS: &str = "force_laws";
/// Normalize the orientation quaternion after every step
pub const RENORMALIZE_ORIENTATION: &str = "renormalize_orientation";
/// Coulomb constant
pub const COULOMB_STRENGTH: &str = "coulomb_strength";
/// Lennard-Jones well depth
pub const VAN_DER_WAALS_STRENGTH: &str = "van_der_waals_strength";
/// Lennard-Jones radius scale
pub const VAN_DER_WAALS_RADIUS_FACTOR: &str = "van_der_waals_radius_factor";

/// Value held by a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Bounded real number
    Real(f64),
    /// Boolean switch
    Flag(bool),
    /// Multi-select over the built-in force laws
    Selection(BTreeSet<ForceLawKind>),
}

impl ParameterValue {
    fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Real(_) => "real",
            ParameterValue::Flag(_) => "flag",
            ParameterValue::Selection(_) => "selection",
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Real(v) => write!(f, "{}", v),
            ParameterValue::Flag(v) => write!(f, "{}", v),
            ParameterValue::Selection(kinds) => {
                let names: Vec<_> = kinds.iter().map(ForceLawKind::name).collect();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

/// A named parameter with its admissible range
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: &'static str,
    /// Current value
    pub value: ParameterValue,
    /// Lower bound, for real parameters
    pub min: f64,
    /// Upper bound, for real parameters
    pub max: f64,
}

impl Parameter {
    fn real(name: &'static str, value: f64, min: f64, max: f64) -> Self {
        Parameter {
            name,
            value: ParameterValue::Real(value),
            min,
            max,
        }
    }

    fn flag(name: &'static str, value: bool) -> Self {
        Parameter {
            name,
            value: ParameterValue::Flag(value),
            min: 0.0,
            max: 1.0,
        }
    }

    fn selection(name: &'static str, value: BTreeSet<ForceLawKind>) -> Self {
        Parameter {
            name,
            value: ParameterValue::Selection(value),
            min: 0.0,
            max: ForceLawKind::ALL.len() as f64,
        }
    }
}

/// A parameter update that was accepted
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    /// Parameter name
    pub name: &'static str,
    /// Value before the change
    pub old: ParameterValue,
    /// Value after the change
    pub new: ParameterValue,
}

impl ParameterChange {
    /// Whether the value actually differs
    pub fn is_effective(&self) -> bool {
        self.old != self.new
    }
}

/// Named typed parameters consumed by the simulation
#[derive(Debug, Clone)]
pub struct ParameterStore {
    parameters: BTreeMap<&'static str, Parameter>,
}

impl ParameterStore {
    /// Store holding every engine parameter at its default
    pub fn with_defaults() -> Self {
        let defaults = PhysicsSettings::default();
        let parameters = [
            Parameter::real(MASS_FACTOR, defaults.mass_factor, 0.0, 100.0),
            Parameter::real(MAX_FORCE, defaults.max_force, 0.0, 1e6),
            Parameter::real(MAX_FORCE_DISTANCE, defaults.max_force_distance, 0.0, 1e3),
            Parameter::real(PHYSICS_TIMESTEP, defaults.physics_timestep, 1e-5, 0.1),
            Parameter::real(PHYSICS_SPEED, defaults.physics_speed, 0.0, 10.0),
            Parameter::flag(DO_CONSTRAIN_FORCES, defaults.do_constrain_forces),
            Parameter::flag(USE_MIDPOINT, defaults.use_midpoint),
            Parameter::selection(FORCE_LAWS, defaults.force_laws.clone()),
            Parameter::flag(RENORMALIZE_ORIENTATION, defaults.renormalize_orientation),
            Parameter::real(COULOMB_STRENGTH, defaults.coulomb_strength, 0.0, 1e3),
            Parameter::real(VAN_DER_WAALS_STRENGTH, defaults.van_der_waals_strength, 0.0, 1e3),
            Parameter::real(
                VAN_DER_WAALS_RADIUS_FACTOR,
                defaults.van_der_waals_radius_factor,
                0.0,
                10.0,
            ),
        ];

        ParameterStore {
            parameters: parameters.into_iter().map(|p| (p.name, p)).collect(),
        }
    }

    /// Look up a parameter
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Current value of a real parameter
    pub fn real(&self, name: &str) -> Option<f64> {
        match self.get(name)?.value {
            ParameterValue::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Current value of a boolean parameter
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)?.value {
            ParameterValue::Flag(v) => Some(v),
            _ => None,
        }
    }

    /// Current value of a selection parameter
    pub fn selection(&self, name: &str) -> Option<&BTreeSet<ForceLawKind>> {
        match &self.get(name)?.value {
            ParameterValue::Selection(v) => Some(v),
            _ => None,
        }
    }

    /// Iterate over all parameters by name
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    /// Replace a parameter's value
    ///
    /// The value must match the parameter's kind and, for reals, lie within
    /// its range. Nothing changes on error.
    pub fn set(&mut self, name: &str, value: ParameterValue) -> Result<ParameterChange, ConfigError> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownParameter(name.to_string()))?;

        if std::mem::discriminant(&parameter.value) != std::mem::discriminant(&value) {
            return Err(ConfigError::TypeMismatch {
                name: name.to_string(),
                expected: parameter.value.kind(),
            });
        }

        if let ParameterValue::Real(v) = value {
            // The negated comparison also rejects NaN
            if !(v >= parameter.min && v <= parameter.max) {
                return Err(ConfigError::OutOfRange {
                    name: name.to_string(),
                    value: v,
                    min: parameter.min,
                    max: parameter.max,
                });
            }
        }

        let old = std::mem::replace(&mut parameter.value, value.clone());
        Ok(ParameterChange {
            name: parameter.name,
            old,
            new: value,
        })
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Cached parameter values read by the physics core
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsSettings {
    /// Scale applied to named fields on top of the molecule mass
    pub mass_factor: f64,
    /// Clamp limit for force; torque is clamped to a tenth of it
    pub max_force: f64,
    /// Pairs farther apart do not interact
    pub max_force_distance: f64,
    /// Longest simulated time covered by one integrator step
    pub physics_timestep: f64,
    /// Simulated seconds per driver second
    pub physics_speed: f64,
    /// Whether the force clamp is applied
    pub do_constrain_forces: bool,
    /// Midpoint integration instead of direct Euler
    pub use_midpoint: bool,
    /// Enabled pairwise laws
    pub force_laws: BTreeSet<ForceLawKind>,
    /// Normalize the orientation quaternion after every step
    pub renormalize_orientation: bool,
    /// Coulomb constant
    pub coulomb_strength: f64,
    /// Lennard-Jones well depth
    pub van_der_waals_strength: f64,
    /// Lennard-Jones radius scale
    pub van_der_waals_radius_factor: f64,
    /// Simulated seconds between bookkeeping passes
    pub animation_interval: f64,
    /// Simulated seconds between sensor checks
    pub sensor_interval: f64,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        PhysicsSettings {
            mass_factor: 1.0,
            max_force: 1000.0,
            max_force_distance: 10.0,
            physics_timestep: 0.01,
            physics_speed: 1.0,
            do_constrain_forces: true,
            use_midpoint: true,
            force_laws: ForceLawKind::ALL.into_iter().collect(),
            renormalize_orientation: false,
            coulomb_strength: 1.0,
            van_der_waals_strength: 1.0,
            van_der_waals_radius_factor: 1.0,
            animation_interval: 0.04,
            sensor_interval: 0.5,
        }
    }
}

impl PhysicsSettings {
    /// Read every cached value from the store
    ///
    /// Parameters missing from the store keep their defaults.
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();
        PhysicsSettings {
            mass_factor: store.real(MASS_FACTOR).unwrap_or(defaults.mass_factor),
            max_force: store.real(MAX_FORCE).unwrap_or(defaults.max_force),
            max_force_distance: store.real(MAX_FORCE_DISTANCE).unwrap_or(defaults.max_force_distance),
            physics_timestep: store.real(PHYSICS_TIMESTEP).unwrap_or(defaults.physics_timestep),
            physics_speed: store.real(PHYSICS_SPEED).unwrap_or(defaults.physics_speed),
            do_constrain_forces: store
                .flag(DO_CONSTRAIN_FORCES)
                .unwrap_or(defaults.do_constrain_forces),
            use_midpoint: store.flag(USE_MIDPOINT).unwrap_or(defaults.use_midpoint),
            force_laws: store.selection(FORCE_LAWS).cloned().unwrap_or(defaults.force_laws),
            renormalize_orientation: store
                .flag(RENORMALIZE_ORIENTATION)
                .unwrap_or(defaults.renormalize_orientation),
            coulomb_strength: store.real(COULOMB_STRENGTH).unwrap_or(defaults.coulomb_strength),
            van_der_waals_strength: store
                .real(VAN_DER_WAALS_STRENGTH)
                .unwrap_or(defaults.van_der_waals_strength),
            van_der_waals_radius_factor: store
                .real(VAN_DER_WAALS_RADIUS_FACTOR)
                .unwrap_or(defaults.van_der_waals_radius_factor),
            animation_interval: defaults.animation_interval,
            sensor_interval: defaults.sensor_interval,
        }
    }

    /// Coefficients handed to the pairwise law registry
    pub fn law_parameters(&self) -> ForceLawParameters {
        ForceLawParameters {
            coulomb_strength: self.coulomb_strength,
            van_der_waals_strength: self.van_der_waals_strength,
            van_der_waals_radius_factor: self.van_der_waals_radius_factor,
            max_interaction_distance: self.max_force_distance,
        }
    }
}
