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
//! Level documents
//!
//! A level is stored as a JSON document holding the field configuration,
//! the initial molecule placements and every level element. Runtime state
//! (live molecules, capture and release counters, animation phase) is not
//! stored; loading a document yields a level ready for a fresh start.
//!
//! Documents carry a semantic `format_version`. A document is accepted when
//! its major version matches the engine's and its minor version is not
//! newer.

use super::{
    BarrierElement, BoxBarrier, BrownianField, FieldConfig, Level, SpherePortal, TimedReleaser,
};
use crate::error::LevelError;
use crate::forces::NamedForce;
use crate::model::{AtomSpec, MoleculePlacement, MoleculeTemplate, Vec3};
use crate::sensors::{CaptureCondition, Combinator};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Format version written by this engine
pub const LEVEL_FORMAT_VERSION: &str = "1.0.0";

/// Check whether a document version can be read by an engine version
///
/// Unparseable versions are never compatible.
pub fn is_version_compatible(document_version: &str, engine_version: &str) -> bool {
    let document = match Version::parse(document_version) {
        Ok(v) => v,
        Err(_) => return false,
    };
    let engine = match Version::parse(engine_version) {
        Ok(v) => v,
        Err(_) => return false,
    };

    if document.major != engine.major {
        return false;
    }

    if document.major != 0 {
        document.minor <= engine.minor
    } else {
        // Before 1.0 every minor version is a breaking change
        document.minor == engine.minor
    }
}

/// Serializable description of a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDocument {
    /// Semantic version of the document format
    pub format_version: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Field configuration
    #[serde(default)]
    pub field: FieldConfig,
    /// Molecules spawned on level start
    #[serde(default)]
    pub molecules: Vec<MoleculePlacement>,
    /// Barriers
    #[serde(default)]
    pub barriers: Vec<BarrierElement>,
    /// Portals
    #[serde(default)]
    pub portals: Vec<SpherePortal>,
    /// Releasers
    #[serde(default)]
    pub releasers: Vec<TimedReleaser>,
    /// Thermal sources
    #[serde(default)]
    pub brownian_fields: Vec<BrownianField>,
    /// Persistent fields
    #[serde(default)]
    pub named_forces: Vec<NamedForce>,
}

impl LevelDocument {
    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let document: LevelDocument = serde_json::from_str(json).map_err(LevelError::Parse)?;
        document.check_version()?;
        document.validate()?;
        Ok(document)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, LevelError> {
        serde_json::to_string_pretty(self).map_err(LevelError::Serialize)
    }

    /// Describe an existing level
    pub fn from_level(name: impl Into<String>, level: &Level) -> Self {
        LevelDocument {
            format_version: LEVEL_FORMAT_VERSION.to_string(),
            name: name.into(),
            field: level.field().clone(),
            molecules: level.initial_molecules().to_vec(),
            barriers: level.barriers().to_vec(),
            portals: level.portals().to_vec(),
            releasers: level.releasers().to_vec(),
            brownian_fields: level.brownian_fields().to_vec(),
            named_forces: level.named_forces().to_vec(),
        }
    }

    /// Build the level; the result holds no molecules until started
    pub fn into_level(self) -> Level {
        let mut level = Level::new(self.field);
        for placement in self.molecules {
            level.add_initial_molecule(placement);
        }
        for barrier in self.barriers {
            level.add_barrier(barrier);
        }
        for portal in self.portals {
            level.add_portal(portal);
        }
        for releaser in self.releasers {
            level.add_releaser(releaser);
        }
        for field in self.brownian_fields {
            level.add_brownian_field(field);
        }
        for force in self.named_forces {
            level.add_named_force(force);
        }
        level.recompute_temperature();
        level
    }

    fn check_version(&self) -> Result<(), LevelError> {
        Version::parse(&self.format_version).map_err(|source| LevelError::InvalidVersion {
            version: self.format_version.clone(),
            source,
        })?;
        if !is_version_compatible(&self.format_version, LEVEL_FORMAT_VERSION) {
            return Err(LevelError::IncompatibleVersion {
                found: self.format_version.clone(),
                supported: LEVEL_FORMAT_VERSION.to_string(),
            });
        }
        Ok(())
    }

    /// Check that the document describes a usable level
    pub fn validate(&self) -> Result<(), LevelError> {
        self.field.validate().map_err(LevelError::Invalid)?;

        let templates = self
            .molecules
            .iter()
            .map(|p| &p.template)
            .chain(self.releasers.iter().map(|r| &r.template));
        for (index, template) in templates.enumerate() {
            if !template.is_valid() {
                return Err(LevelError::Invalid(format!(
                    "molecule template {} has no atoms or an invalid atom",
                    index
                )));
            }
        }

        for (index, releaser) in self.releasers.iter().enumerate() {
            if !(releaser.interval > 0.0 && releaser.interval.is_finite()) {
                return Err(LevelError::Invalid(format!(
                    "releaser {} has interval {}",
                    index, releaser.interval
                )));
            }
        }

        for (index, portal) in self.portals.iter().enumerate() {
            if !(portal.radius >= 0.0 && portal.radius.is_finite()) {
                return Err(LevelError::Invalid(format!(
                    "portal {} has radius {}",
                    index, portal.radius
                )));
            }
        }
        Ok(())
    }

    /// Level used when a document cannot be loaded
    ///
    /// A containment box around the field, a pair of opposite ions, a
    /// releaser feeding more of them and a portal that finishes the level
    /// after three captures.
    pub fn default_level() -> Self {
        let field = FieldConfig::default();
        let cation = MoleculeTemplate::single_atom(1.0, 1.0, 0.3);
        let anion = MoleculeTemplate::single_atom(1.0, -1.0, 0.3);
        let dimer = MoleculeTemplate::new(vec![
            AtomSpec::new(Vec3::new(-0.35, 0.0, 0.0), 1.0, 0.5, 0.3),
            AtomSpec::new(Vec3::new(0.35, 0.0, 0.0), 1.0, -0.5, 0.3),
        ]);

        LevelDocument {
            format_version: LEVEL_FORMAT_VERSION.to_string(),
            name: "default".to_string(),
            barriers: vec![BoxBarrier::new(field.min, field.max, 100.0).into()],
            portals: vec![SpherePortal::new(Vec3::new(7.0, 0.0, 0.0), 1.5)
                .with_remnants()
                .with_condition(CaptureCondition::new(Combinator::Or, 3))],
            releasers: vec![TimedReleaser::new(dimer, Vec3::new(-7.0, 0.0, 0.0), 2.0)
                .with_velocity(Vec3::new(1.0, 0.0, 0.0))
                .with_max_releases(5)],
            brownian_fields: vec![BrownianField::new(Vec3::zeros(), 4.0, 10.0)],
            named_forces: Vec::new(),
            molecules: vec![
                MoleculePlacement::at_rest(cation, Vec3::new(-2.0, 1.0, 0.0)),
                MoleculePlacement::at_rest(anion, Vec3::new(2.0, -1.0, 0.0)),
            ],
            field,
        }
    }
}

impl Default for LevelDocument {
    fn default() -> Self {
        Self::default_level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        assert!(is_version_compatible("1.0.0", "1.0.0"));
        assert!(is_version_compatible("1.0.5", "1.2.0"));
        assert!(!is_version_compatible("1.3.0", "1.2.0"));
        assert!(!is_version_compatible("2.0.0", "1.0.0"));
        assert!(!is_version_compatible("0.1.0", "0.2.0"));
        assert!(is_version_compatible("0.2.1", "0.2.0"));
        assert!(!is_version_compatible("one", "1.0.0"));
    }

    #[test]
    fn test_default_level_is_valid() {
        let document = LevelDocument::default_level();
        assert!(document.validate().is_ok());
        let json = document.to_json().unwrap();
        assert_eq!(LevelDocument::from_json(&json).unwrap(), document);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let document = LevelDocument::from_json(r#"{ "format_version": "1.0.0" }"#).unwrap();
        assert_eq!(document.field, FieldConfig::default());
        assert!(document.molecules.is_empty());
    }

    #[test]
    fn test_rejects_bad_versions() {
        assert!(matches!(
            LevelDocument::from_json(r#"{ "format_version": "2.0.0" }"#),
            Err(LevelError::IncompatibleVersion { .. })
        ));
        assert!(matches!(
            LevelDocument::from_json(r#"{ "format_version": "latest" }"#),
            Err(LevelError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(LevelDocument::from_json("{ not json"), Err(LevelError::Parse(_))));
    }

    #[test]
    fn test_rejects_invalid_field() {
        let mut document = LevelDocument::default_level();
        document.field.grid_columns = 0;
        let json = document.to_json().unwrap();
        assert!(matches!(LevelDocument::from_json(&json), Err(LevelError::Invalid(_))));
    }

    #[test]
    fn test_level_round_trip_through_document() {
        let level = LevelDocument::default_level().into_level();
        assert!(level.molecules().is_empty());
        assert_eq!(level.initial_molecules().len(), 2);
        assert_eq!(LevelDocument::from_level("default", &level), LevelDocument::default_level());
    }
}
