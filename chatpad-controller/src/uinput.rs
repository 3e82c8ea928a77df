//! Virtual controller backend using evdev/uinput.
//!
//! Creates a virtual gamepad that appears as a standard joystick to games
//! and applications. Presses and releases are staged and flushed to the
//! device in one batch per `commit`.

use crate::console::{AxisId, ConsoleDefinition, InputKind};
use crate::controller::{
    scaled_axis_value, ButtonState, ControllerError, VirtualController, AXIS_MAX, AXIS_MIN,
};
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Virtual gamepad device for one controller port.
pub struct UinputController {
    device: VirtualDevice,
    console: Arc<ConsoleDefinition>,
    /// Events staged since the last commit.
    pending: Vec<InputEvent>,
    /// Name-state transitions staged since the last commit.
    pending_states: Vec<(String, ButtonState)>,
    /// Committed state per input name.
    states: HashMap<String, ButtonState>,
    /// Staged axis values (for change detection).
    axis_values: HashMap<AxisId, i32>,
}

impl UinputController {
    /// Create a virtual gamepad exposing the console's buttons and axes.
    ///
    /// # Arguments
    /// * `name` - Device name (shown in `evtest` and game controller settings)
    /// * `console` - The console definition the device is built for
    pub fn new(name: &str, console: Arc<ConsoleDefinition>) -> Result<Self, ControllerError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(ControllerError::CreateDevice)?
            .name(name);

        let mut keys = AttributeSet::<Key>::new();
        for code in console.button_codes() {
            keys.insert(Key::new(code));
        }
        builder = builder
            .with_keys(&keys)
            .map_err(ControllerError::CreateDevice)?;

        for axis in console.axis_ids() {
            let abs_setup = UinputAbsSetup::new(
                AbsoluteAxisType(axis),
                AbsInfo::new(0, AXIS_MIN, AXIS_MAX, 0, 0, 1),
            );
            builder = builder
                .with_absolute_axis(&abs_setup)
                .map_err(ControllerError::CreateDevice)?;
        }

        let device = builder.build().map_err(ControllerError::CreateDevice)?;
        debug!("created uinput device \"{name}\" for console {}", console.name());

        Ok(Self {
            device,
            console,
            pending: Vec::new(),
            pending_states: Vec::new(),
            states: HashMap::new(),
            axis_values: HashMap::new(),
        })
    }

    /// Get the device path (e.g., /dev/input/eventX).
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }

    fn resolve(&self, input: &str) -> Result<InputKind, ControllerError> {
        self.console
            .kind(input)
            .ok_or_else(|| ControllerError::UnknownInput(input.to_string()))
    }

    fn stage_axis(&mut self, axis: AxisId, value: i32) {
        let clamped = value.clamp(AXIS_MIN, AXIS_MAX);

        // Only emit if changed
        if self.axis_values.get(&axis) == Some(&clamped) {
            return;
        }
        self.axis_values.insert(axis, clamped);
        self.pending
            .push(InputEvent::new_now(EventType::ABSOLUTE, axis, clamped));
    }

    fn stage_button(&mut self, code: u16, pressed: bool) {
        self.pending.push(InputEvent::new_now(
            EventType::KEY,
            code,
            i32::from(pressed),
        ));
    }
}

impl VirtualController for UinputController {
    fn press(&mut self, input: &str, percent: u8) -> Result<(), ControllerError> {
        match self.resolve(input)? {
            InputKind::Button { code } => {
                self.stage_button(code, true);
                self.pending_states
                    .push((input.to_string(), ButtonState::Pressed));
            }
            InputKind::Axis {
                axis,
                toward_min,
                max_percent,
            } => {
                self.stage_axis(axis, scaled_axis_value(percent, toward_min, max_percent));
                self.pending_states
                    .push((input.to_string(), ButtonState::Pressed));
            }
            InputKind::Wait => {}
        }
        Ok(())
    }

    fn release(&mut self, input: &str) -> Result<(), ControllerError> {
        match self.resolve(input)? {
            InputKind::Button { code } => {
                self.stage_button(code, false);
                self.pending_states
                    .push((input.to_string(), ButtonState::Released));
            }
            InputKind::Axis { axis, .. } => {
                self.stage_axis(axis, 0);
                self.pending_states
                    .push((input.to_string(), ButtonState::Released));
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
        self.stage_axis(axis, scaled_axis_value(percent, toward_min, 100));
        Ok(())
    }

    fn release_axis(&mut self, axis: AxisId) -> Result<(), ControllerError> {
        self.stage_axis(axis, 0);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ControllerError> {
        if !self.pending.is_empty() {
            self.device
                .emit(&self.pending)
                .map_err(ControllerError::EmitEvents)?;
            self.pending.clear();
        }
        for (name, state) in self.pending_states.drain(..) {
            self.states.insert(name, state);
        }
        Ok(())
    }

    fn state(&self, input: &str) -> ButtonState {
        self.states.get(input).copied().unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn create_controller() {
        let console = Arc::new(ConsoleDefinition::builtin("n64").unwrap());
        let controller = UinputController::new("chatpad test pad", console);
        assert!(controller.is_ok());
    }

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn press_commit_release() {
        let console = Arc::new(ConsoleDefinition::builtin("nes").unwrap());
        let mut controller = UinputController::new("chatpad test pad", console).unwrap();
        controller.press("a", 100).unwrap();
        controller.commit().unwrap();
        assert_eq!(controller.state("a"), ButtonState::Pressed);
        controller.reset().unwrap();
        assert_eq!(controller.state("a"), ButtonState::Released);
    }
}
