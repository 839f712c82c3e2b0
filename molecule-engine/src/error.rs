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
//! Error types
//!
//! Only configuration changes and level documents can fail in a way the
//! caller has to handle. Per-step physics contains its own faults.

use thiserror::Error;

/// Rejected parameter change
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No parameter with this name exists
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),
    /// The value has a different kind than the parameter
    #[error("parameter '{name}' expects a {expected} value")]
    TypeMismatch {
        /// Parameter name
        name: String,
        /// Kind the parameter holds
        expected: &'static str,
    },
    /// The value lies outside the parameter's range
    #[error("value {value} for parameter '{name}' is outside [{min}, {max}]")]
    OutOfRange {
        /// Parameter name
        name: String,
        /// Rejected value
        value: f64,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

/// Failure to read or write a level document
#[derive(Debug, Error)]
pub enum LevelError {
    /// Malformed JSON or wrong structure
    #[error("failed to parse level document: {0}")]
    Parse(#[source] serde_json::Error),
    /// The level could not be serialized
    #[error("failed to serialize level: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The format version is not a semantic version
    #[error("invalid level format version '{version}': {source}")]
    InvalidVersion {
        /// Version string found in the document
        version: String,
        /// Parser error
        #[source]
        source: semver::Error,
    },
    /// The document was written by an incompatible engine
    #[error("level format version {found} is not compatible with {supported}")]
    IncompatibleVersion {
        /// Version found in the document
        found: String,
        /// Version this engine writes
        supported: String,
    },
    /// The document parsed but describes an unusable level
    #[error("invalid level: {0}")]
    Invalid(String),
    /// Reading or writing the file failed
    #[error("level file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::OutOfRange {
            name: "max_force".to_string(),
            value: -1.0,
            min: 0.0,
            max: 10.0,
        };
        assert_eq!(err.to_string(), "value -1 for parameter 'max_force' is outside [0, 10]");
        assert_eq!(
            ConfigError::UnknownParameter("foo".into()).to_string(),
            "unknown parameter 'foo'"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: LevelError = io.into();
        assert!(matches!(err, LevelError::Io(_)));
    }
}
