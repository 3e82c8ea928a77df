//! The virtual controller contract and the per-port controller manager.

use crate::console::AxisId;
use parking_lot::Mutex;
use thiserror::Error;

/// Axis value range (standard for most games).
pub const AXIS_MIN: i32 = -32767;
pub const AXIS_MAX: i32 = 32767;

/// Scale a percentage toward one end of the axis range, capped by the
/// input's configured `max_percent`.
pub(crate) fn scaled_axis_value(percent: u8, toward_min: bool, max_percent: u8) -> i32 {
    let effective = u32::from(percent.min(100)) * u32::from(max_percent.min(100));
    let end = if toward_min { AXIS_MIN } else { AXIS_MAX };
    ((i64::from(end) * i64::from(effective)) / 10_000) as i32
}

/// Observable state of a named input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Released,
    Pressed,
}

/// Errors from virtual controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown input \"{0}\"")]
    UnknownInput(String),

    #[error("failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),

    #[error("failed to emit events: {0}")]
    EmitEvents(#[source] std::io::Error),
}

/// The contract the execution engine drives.
///
/// `press` and `release` mutate pending state only; `commit` flushes every
/// pending change to the underlying device in one batch and makes it
/// observable through `state`. The engine batches one commit per
/// simultaneous group, never one per input, so that e.g. releasing A and
/// pressing B in the same instant cannot be observed out of order.
///
/// Implementations must be `Send`: each controller port is driven from
/// whichever task currently executes a sequence on it.
pub trait VirtualController: Send {
    /// Stage a press of the named input. Axis-kind inputs are scaled by
    /// `percent` toward their configured end.
    fn press(&mut self, input: &str, percent: u8) -> Result<(), ControllerError>;

    /// Stage a release of the named input.
    fn release(&mut self, input: &str) -> Result<(), ControllerError>;

    /// Stage an axis value: `percent` of the way toward the minimum or
    /// maximum end of the range.
    fn press_axis(&mut self, axis: AxisId, percent: u8, toward_min: bool)
        -> Result<(), ControllerError>;

    /// Stage an axis return to neutral.
    fn release_axis(&mut self, axis: AxisId) -> Result<(), ControllerError>;

    /// Flush pending state to the device in one batch.
    fn commit(&mut self) -> Result<(), ControllerError>;

    /// Committed state of a named input.
    fn state(&self, input: &str) -> ButtonState;

    /// Release everything and commit. Used on console switches and session
    /// shutdown.
    fn reset(&mut self) -> Result<(), ControllerError>;
}

/// Owns one virtual controller per port.
///
/// Each port is guarded by its own mutex: simultaneous sequences on
/// different ports never block each other, while two sequences touching the
/// same port serialize their batched updates.
pub struct ControllerManager {
    ports: Vec<Mutex<Box<dyn VirtualController>>>,
}

impl ControllerManager {
    pub fn new(controllers: Vec<Box<dyn VirtualController>>) -> Self {
        Self {
            ports: controllers.into_iter().map(Mutex::new).collect(),
        }
    }

    pub fn controller_count(&self) -> usize {
        self.ports.len()
    }

    /// Run a closure against one port's controller. Returns `None` if the
    /// port does not exist.
    pub fn with_port<R>(
        &self,
        port: u8,
        f: impl FnOnce(&mut dyn VirtualController) -> R,
    ) -> Option<R> {
        let slot = self.ports.get(usize::from(port))?;
        let mut controller = slot.lock();
        Some(f(controller.as_mut()))
    }

    /// Reset every controller. Called after draining, before a console or
    /// controller-count switch completes.
    pub fn reset_all(&self) -> Result<(), ControllerError> {
        for slot in &self.ports {
            slot.lock().reset()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleDefinition;
    use crate::dummy::DummyController;
    use std::sync::Arc;

    fn manager() -> ControllerManager {
        let console = Arc::new(ConsoleDefinition::builtin("nes").unwrap());
        let (controller, _probe) = DummyController::new(Arc::clone(&console));
        let controllers: Vec<Box<dyn VirtualController>> = vec![Box::new(controller)];
        ControllerManager::new(controllers)
    }

    #[test]
    fn with_port_rejects_out_of_range() {
        let manager = manager();
        assert_eq!(manager.controller_count(), 1);
        assert!(manager.with_port(1, |_| ()).is_none());
        assert!(manager.with_port(0, |_| ()).is_some());
    }

    #[test]
    fn axis_scaling_hits_both_ends() {
        assert_eq!(scaled_axis_value(100, false, 100), AXIS_MAX);
        assert_eq!(scaled_axis_value(100, true, 100), AXIS_MIN);
        assert_eq!(scaled_axis_value(0, false, 100), 0);
        assert_eq!(scaled_axis_value(50, false, 100), AXIS_MAX / 2);
        // max_percent caps the reachable range
        assert_eq!(scaled_axis_value(100, false, 50), AXIS_MAX / 2);
    }
}
