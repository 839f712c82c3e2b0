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
//! Temperature field and thermal sources

use super::{FieldConfig, LevelElement};
use crate::model::Vec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn default_true() -> bool {
    true
}

/// Radial heat source or sink
///
/// Raises (or lowers, for a negative delta) the temperature by
/// `temperature_delta` at its center, falling off linearly to zero at
/// `radius`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrownianField {
    /// Center of the source
    pub center: Vec3,
    /// Reach of the source
    pub radius: f64,
    /// Temperature change at the center
    pub temperature_delta: f64,
    /// Inactive sources contribute nothing
    #[serde(default = "default_true")]
    pub active: bool,
    /// Survives level resets
    #[serde(default = "default_true")]
    pub persistent: bool,
}

impl BrownianField {
    /// Active persistent source
    pub fn new(center: Vec3, radius: f64, temperature_delta: f64) -> Self {
        BrownianField {
            center,
            radius,
            temperature_delta,
            active: true,
            persistent: true,
        }
    }

    /// Mark the source as removed on level reset
    pub fn transient(mut self) -> Self {
        self.persistent = false;
        self
    }

    /// Temperature change contributed at `point`
    pub fn contribution_at(&self, point: &Vec3) -> f64 {
        if !self.active || self.radius <= 0.0 {
            return 0.0;
        }
        let distance = (point - self.center).norm();
        if distance >= self.radius {
            0.0
        } else {
            self.temperature_delta * (1.0 - distance / self.radius)
        }
    }
}

impl LevelElement for BrownianField {
    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn energy_use(&self) -> f64 {
        if self.active {
            self.temperature_delta.abs() * PI * self.radius * self.radius
        } else {
            0.0
        }
    }
}

/// Temperature sampled at cell centers over the game field
///
/// Cells cover the field's x/y extent; samples are taken in the mid z plane.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemperatureGrid {
    columns: usize,
    rows: usize,
    values: Vec<f64>,
}

impl TemperatureGrid {
    /// Grid sized for `field`, filled with its base temperature
    pub fn new(field: &FieldConfig) -> Self {
        let columns = field.grid_columns;
        let rows = field.grid_rows;
        TemperatureGrid {
            columns,
            rows,
            values: vec![field.clamp_temperature(field.base_temperature); columns * rows],
        }
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Value of one cell
    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        if column >= self.columns {
            return None;
        }
        self.values.get(row * self.columns + column).copied()
    }

    /// All cell values, row by row
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// World position of a cell center
    pub fn cell_center(field: &FieldConfig, columns: usize, rows: usize, column: usize, row: usize) -> Vec3 {
        let size = field.max - field.min;
        Vec3::new(
            field.min.x + size.x * (column as f64 + 0.5) / columns as f64,
            field.min.y + size.y * (row as f64 + 0.5) / rows as f64,
            field.min.z + size.z * 0.5,
        )
    }

    /// Recompute every cell from the base temperature and the sources
    ///
    /// Each value is clamped to the field's temperature range.
    pub fn recompute(&mut self, field: &FieldConfig, sources: &[BrownianField]) {
        if self.columns != field.grid_columns || self.rows != field.grid_rows {
            *self = Self::new(field);
        }

        for row in 0..self.rows {
            for column in 0..self.columns {
                let center = Self::cell_center(field, self.columns, self.rows, column, row);
                let raw = field.base_temperature
                    + sources.iter().map(|s| s.contribution_at(&center)).sum::<f64>();
                self.values[row * self.columns + column] = field.clamp_temperature(raw);
            }
        }
    }

    /// Mean cell value, or `None` for an empty grid
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }
}

/// Transient marker such as the remnant of a destroyed molecule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    /// Where the decoration is shown
    pub position: Vec3,
    /// Creation time
    pub created_at: f64,
    /// Removal time
    pub expires_at: f64,
    /// Survives level resets
    #[serde(default)]
    pub persistent: bool,
}

impl Decoration {
    /// Non-persistent decoration lasting `lifetime` seconds
    pub fn remnant(position: Vec3, created_at: f64, lifetime: f64) -> Self {
        Decoration {
            position,
            created_at,
            expires_at: created_at + lifetime,
            persistent: false,
        }
    }

    /// True once `time` is past the expiry time
    pub fn is_expired(&self, time: f64) -> bool {
        time > self.expires_at
    }
}

impl LevelElement for Decoration {
    fn is_persistent(&self) -> bool {
        self.persistent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field() -> FieldConfig {
        FieldConfig {
            min: Vec3::new(0.0, 0.0, 0.0),
            max: Vec3::new(4.0, 4.0, 1.0),
            grid_columns: 2,
            grid_rows: 2,
            base_temperature: 10.0,
            min_temperature: 0.0,
            max_temperature: 30.0,
            ..FieldConfig::default()
        }
    }

    #[test]
    fn test_source_falloff() {
        let source = BrownianField::new(Vec3::zeros(), 2.0, 10.0);
        assert_relative_eq!(source.contribution_at(&Vec3::zeros()), 10.0);
        assert_relative_eq!(source.contribution_at(&Vec3::new(1.0, 0.0, 0.0)), 5.0);
        assert_eq!(source.contribution_at(&Vec3::new(3.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_grid_cell_centers() {
        let center = TemperatureGrid::cell_center(&field(), 2, 2, 1, 0);
        assert_relative_eq!(center, Vec3::new(3.0, 1.0, 0.5));
    }

    #[test]
    fn test_grid_recompute_clamps() {
        let field = field();
        let mut grid = TemperatureGrid::new(&field);
        assert_eq!(grid.average(), Some(10.0));

        // Centered on cell (0, 0) and hot enough to hit the ceiling there
        let source = BrownianField::new(Vec3::new(1.0, 1.0, 0.5), 1.0, 100.0);
        grid.recompute(&field, &[source]);
        assert_eq!(grid.value(0, 0), Some(30.0));
        assert_eq!(grid.value(1, 1), Some(10.0));
        assert_relative_eq!(grid.average().unwrap(), 15.0);
    }

    #[test]
    fn test_inactive_source() {
        let mut source = BrownianField::new(Vec3::zeros(), 1.0, 5.0);
        source.active = false;
        assert_eq!(source.contribution_at(&Vec3::zeros()), 0.0);
        assert_eq!(source.energy_use(), 0.0);
    }

    #[test]
    fn test_decoration_expiry() {
        let decoration = Decoration::remnant(Vec3::zeros(), 1.0, 0.5);
        assert!(!decoration.is_expired(1.5));
        assert!(decoration.is_expired(1.6));
        assert!(!decoration.is_persistent());
    }
}
