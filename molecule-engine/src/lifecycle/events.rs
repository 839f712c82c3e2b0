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
//! Notifications to external observers
//!
//! Observers are plain callbacks invoked synchronously, in registration
//! order, from inside the simulation call that produced the event.

use super::StateTransition;
use crate::config::ParameterChange;
use crate::model::MoleculeId;

/// Something external observers may react to
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// The game state changed
    GameStateChanged(StateTransition),
    /// A releaser spawned a molecule
    MoleculeReleased {
        /// New molecule
        id: MoleculeId,
        /// Simulation time
        time: f64,
    },
    /// A portal captured a molecule
    MoleculeCaptured {
        /// Captured molecule
        id: MoleculeId,
        /// Index of the portal in the level
        portal_index: usize,
        /// Whether the molecule was removed
        destroyed: bool,
        /// Simulation time
        time: f64,
    },
    /// A configuration parameter changed
    ParameterChanged(ParameterChange),
    /// A level document could not be loaded and the default level was used
    LevelLoadFallback {
        /// Description of the load failure
        reason: String,
    },
}

/// Callback receiving simulation events
pub type Observer = Box<dyn FnMut(&SimulationEvent) + Send>;

/// Registered observers
#[derive(Default)]
pub struct EventDispatcher {
    observers: Vec<Observer>,
}

impl EventDispatcher {
    /// Dispatcher without observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Check if no observer is registered
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver an event to every observer
    pub fn emit(&mut self, event: &SimulationEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_observers_receive_events_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            dispatcher.subscribe(Box::new(move |event| {
                if let SimulationEvent::LevelLoadFallback { reason } = event {
                    log.lock().unwrap().push(format!("{}:{}", tag, reason));
                }
            }));
        }

        dispatcher.emit(&SimulationEvent::LevelLoadFallback {
            reason: "bad".to_string(),
        });
        assert_eq!(dispatcher.len(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:bad", "second:bad"]);
    }
}
