//! In-memory virtual controller for tests and dry runs.
//!
//! Behaves like a real backend (pending changes become observable only at
//! `commit`) without touching uinput. A [`DummyProbe`] shares the state so
//! tests can assert what the "device" saw while the engine owns the
//! controller.

use crate::console::{AxisId, ConsoleDefinition, InputKind};
use crate::controller::{scaled_axis_value, ButtonState, ControllerError, VirtualController};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct DummyState {
    pending: Vec<PendingChange>,
    states: HashMap<String, ButtonState>,
    axis_values: HashMap<AxisId, i32>,
    commit_count: usize,
}

#[derive(Debug)]
enum PendingChange {
    Input(String, ButtonState),
    Axis(AxisId, i32),
}

/// A controller that records everything and drives nothing.
pub struct DummyController {
    console: Arc<ConsoleDefinition>,
    shared: Arc<Mutex<DummyState>>,
}

impl DummyController {
    pub fn new(console: Arc<ConsoleDefinition>) -> (Self, DummyProbe) {
        let shared = Arc::new(Mutex::new(DummyState::default()));
        let probe = DummyProbe {
            shared: Arc::clone(&shared),
        };
        (Self { console, shared }, probe)
    }

    fn resolve(&self, input: &str) -> Result<InputKind, ControllerError> {
        self.console
            .kind(input)
            .ok_or_else(|| ControllerError::UnknownInput(input.to_string()))
    }
}

impl VirtualController for DummyController {
    fn press(&mut self, input: &str, percent: u8) -> Result<(), ControllerError> {
        match self.resolve(input)? {
            InputKind::Button { .. } => {
                self.shared
                    .lock()
                    .pending
                    .push(PendingChange::Input(input.to_string(), ButtonState::Pressed));
            }
            InputKind::Axis {
                axis,
                toward_min,
                max_percent,
            } => {
                let value = scaled_axis_value(percent, toward_min, max_percent);
                let mut state = self.shared.lock();
                state.pending.push(PendingChange::Axis(axis, value));
                state
                    .pending
                    .push(PendingChange::Input(input.to_string(), ButtonState::Pressed));
            }
            InputKind::Wait => {}
        }
        Ok(())
    }

    fn release(&mut self, input: &str) -> Result<(), ControllerError> {
        match self.resolve(input)? {
            InputKind::Button { .. } => {
                self.shared.lock().pending.push(PendingChange::Input(
                    input.to_string(),
                    ButtonState::Released,
                ));
            }
            InputKind::Axis { axis, .. } => {
                let mut state = self.shared.lock();
                state.pending.push(PendingChange::Axis(axis, 0));
                state.pending.push(PendingChange::Input(
                    input.to_string(),
                    ButtonState::Released,
                ));
            }
            InputKind::Wait => {}
        }
        Ok(())
    }

    fn press_axis(
        &mut self,
        axis: AxisId,
        percent: u8,
        toward_min: bool,
    ) -> Result<(), ControllerError> {
        let value = scaled_axis_value(percent, toward_min, 100);
        self.shared.lock().pending.push(PendingChange::Axis(axis, value));
        Ok(())
    }

    fn release_axis(&mut self, axis: AxisId) -> Result<(), ControllerError> {
        self.shared.lock().pending.push(PendingChange::Axis(axis, 0));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ControllerError> {
        let mut state = self.shared.lock();
        state.commit_count += 1;
        let pending = std::mem::take(&mut state.pending);
        for change in pending {
            match change {
                PendingChange::Input(name, button_state) => {
                    state.states.insert(name, button_state);
                }
                PendingChange::Axis(axis, value) => {
                    state.axis_values.insert(axis, value);
                }
            }
        }
        Ok(())
    }

    fn state(&self, input: &str) -> ButtonState {
        self.shared
            .lock()
            .states
            .get(input)
            .copied()
            .unwrap_or_default()
    }

    fn reset(&mut self) -> Result<(), ControllerError> {
        let names: Vec<String> = self
            .console
            .valid_inputs()
            .iter()
            .filter(|name| !self.console.is_wait(name))
            .map(|name| name.to_string())
            .collect();
        for name in names {
            self.release(&name)?;
        }
        self.commit()
    }
}

/// Shared view into a [`DummyController`]'s state, for assertions.
#[derive(Clone)]
pub struct DummyProbe {
    shared: Arc<Mutex<DummyState>>,
}

impl DummyProbe {
    /// Committed state of a named input.
    pub fn state(&self, input: &str) -> ButtonState {
        self.shared
            .lock()
            .states
            .get(input)
            .copied()
            .unwrap_or_default()
    }

    /// Committed axis value.
    pub fn axis_value(&self, axis: AxisId) -> i32 {
        self.shared
            .lock()
            .axis_values
            .get(&axis)
            .copied()
            .unwrap_or(0)
    }

    /// How many commits the device has seen.
    pub fn commit_count(&self) -> usize {
        self.shared.lock().commit_count
    }

    /// Names currently committed as pressed.
    pub fn pressed_inputs(&self) -> Vec<String> {
        let mut pressed: Vec<String> = self
            .shared
            .lock()
            .states
            .iter()
            .filter(|(_, state)| **state == ButtonState::Pressed)
            .map(|(name, _)| name.clone())
            .collect();
        pressed.sort_unstable();
        pressed
    }

    /// Names that were ever pressed (still listed after release).
    pub fn touched_inputs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.lock().states.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}
