//! Virtual controllers and the input execution engine
//!
//! Takes the structured input sequences produced by `chatpad-parsing` and
//! plays them back against virtual game controllers with correct
//! hold/release/simultaneity semantics:
//!
//! - Console definitions: which input names exist per game system and what
//!   each drives (button, axis, or time-consuming wait)
//! - The [`VirtualController`] contract with a uinput/evdev backend and an
//!   in-memory dummy backend for tests and dry runs
//! - The [`InputExecutor`]: one task per sequence, batched per-group
//!   commits, cooperative global cancellation, and a drain barrier for
//!   console/controller switches

pub mod console;
pub mod controller;
pub mod dummy;
pub mod executor;
pub mod uinput;

pub use console::{AxisId, ConsoleDefinition, InputKind, AXIS_RX, AXIS_RY, AXIS_X, AXIS_Y};
pub use controller::{
    ButtonState, ControllerError, ControllerManager, VirtualController, AXIS_MAX, AXIS_MIN,
};
pub use dummy::{DummyController, DummyProbe};
pub use executor::{InputExecutor, SubmitError};
pub use uinput::UinputController;
