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
//! Game state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the current level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    /// Loaded but not started
    Unstarted,
    /// Being played
    Running,
    /// End condition met
    Finished,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::Unstarted => "unstarted",
            GameState::Running => "running",
            GameState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// A state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// State before the change
    pub from: GameState,
    /// State after the change
    pub to: GameState,
}

/// Current and previous game state
///
/// Allowed transitions:
///
/// - any state to `Running` (level start or restart)
/// - `Running` to `Finished`
/// - any state to `Unstarted` through [`GameStateMachine::reload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateMachine {
    current: GameState,
    previous: Option<GameState>,
}

impl GameStateMachine {
    /// Machine in the `Unstarted` state
    pub fn new() -> Self {
        GameStateMachine {
            current: GameState::Unstarted,
            previous: None,
        }
    }

    /// Current state
    pub fn current(&self) -> GameState {
        self.current
    }

    /// State before the last transition
    pub fn previous(&self) -> Option<GameState> {
        self.previous
    }

    /// Check whether `to` may follow the current state
    pub fn can_transition_to(&self, to: GameState) -> bool {
        match to {
            GameState::Running => true,
            GameState::Finished => self.current == GameState::Running,
            GameState::Unstarted => false,
        }
    }

    /// Move to `to`, returning the transition if it is allowed
    pub fn transition_to(&mut self, to: GameState) -> Option<StateTransition> {
        if !self.can_transition_to(to) {
            return None;
        }
        Some(self.record(to))
    }

    /// Return to `Unstarted` after a level load
    pub fn reload(&mut self) -> StateTransition {
        self.record(GameState::Unstarted)
    }

    fn record(&mut self, to: GameState) -> StateTransition {
        let transition = StateTransition {
            from: self.current,
            to,
        };
        self.previous = Some(self.current);
        self.current = to;
        transition
    }
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_finish() {
        let mut machine = GameStateMachine::new();
        assert_eq!(machine.current(), GameState::Unstarted);
        assert_eq!(machine.transition_to(GameState::Finished), None);

        let start = machine.transition_to(GameState::Running).unwrap();
        assert_eq!(start.from, GameState::Unstarted);
        assert_eq!(machine.previous(), Some(GameState::Unstarted));

        machine.transition_to(GameState::Finished).unwrap();
        assert_eq!(machine.current(), GameState::Finished);
        assert_eq!(machine.previous(), Some(GameState::Running));
    }

    #[test]
    fn test_finished_only_leaves_through_start_or_reload() {
        let mut machine = GameStateMachine::new();
        machine.transition_to(GameState::Running);
        machine.transition_to(GameState::Finished);

        assert!(!machine.can_transition_to(GameState::Finished));
        assert!(!machine.can_transition_to(GameState::Unstarted));

        let reload = machine.reload();
        assert_eq!(reload.from, GameState::Finished);
        assert_eq!(machine.current(), GameState::Unstarted);
    }

    #[test]
    fn test_display() {
        assert_eq!(GameState::Running.to_string(), "running");
    }
}
