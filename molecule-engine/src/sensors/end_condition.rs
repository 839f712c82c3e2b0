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
//! Level completion logic
//!
//! Every portal may carry a capture condition combined with either `Or` or
//! `And`. Statuses are scanned in element order and the first decisive one
//! wins:
//!
//! - `Or` reporting finished ends the level immediately
//! - `And` reporting not finished blocks completion immediately
//!
//! If no status is decisive the level is finished. With mixed combinators
//! the outcome therefore depends on declaration order.

use serde::{Deserialize, Serialize};

/// How a portal's condition combines with the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Combinator {
    /// Sufficient on its own
    Or,
    /// Necessary
    And,
}

/// Capture target attached to a portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCondition {
    /// Combination rule
    pub combinator: Combinator,
    /// Captures needed for the portal to report finished
    pub required_count: usize,
}

impl CaptureCondition {
    /// Create a condition
    pub fn new(combinator: Combinator, required_count: usize) -> Self {
        CaptureCondition {
            combinator,
            required_count,
        }
    }

    /// Status for a given number of captures
    pub fn status(&self, captured: usize) -> ConditionStatus {
        ConditionStatus {
            combinator: self.combinator,
            finished: captured >= self.required_count,
        }
    }
}

/// A condition's verdict at one sensor check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionStatus {
    /// Combination rule
    pub combinator: Combinator,
    /// Whether the condition is met
    pub finished: bool,
}

impl ConditionStatus {
    /// `Or` status
    pub fn or(finished: bool) -> Self {
        ConditionStatus {
            combinator: Combinator::Or,
            finished,
        }
    }

    /// `And` status
    pub fn and(finished: bool) -> Self {
        ConditionStatus {
            combinator: Combinator::And,
            finished,
        }
    }
}

/// Decide whether the level is finished
pub fn evaluate_end_condition<I>(statuses: I) -> bool
where
    I: IntoIterator<Item = ConditionStatus>,
{
    for status in statuses {
        match (status.combinator, status.finished) {
            (Combinator::Or, true) => return true,
            (Combinator::And, false) => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_conditions_is_finished() {
        assert!(evaluate_end_condition(Vec::new()));
    }

    #[test]
    fn test_and_blocks_before_or() {
        let statuses = [
            ConditionStatus::and(false),
            ConditionStatus::or(true),
            ConditionStatus::and(true),
        ];
        assert!(!evaluate_end_condition(statuses));
    }

    #[test]
    fn test_or_accepts_before_and() {
        let statuses = [
            ConditionStatus::and(true),
            ConditionStatus::or(true),
            ConditionStatus::and(false),
        ];
        assert!(evaluate_end_condition(statuses));
    }

    #[test]
    fn test_unfinished_or_is_not_decisive() {
        assert!(evaluate_end_condition([ConditionStatus::or(false)]));
        assert!(!evaluate_end_condition([ConditionStatus::or(false), ConditionStatus::and(false)]));
    }

    #[test]
    fn test_condition_status() {
        let condition = CaptureCondition::new(Combinator::And, 3);
        assert_eq!(condition.status(2), ConditionStatus::and(false));
        assert_eq!(condition.status(3), ConditionStatus::and(true));
    }
}
