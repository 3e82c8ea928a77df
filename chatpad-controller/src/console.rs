//! Console definitions: which input names a game system understands and
//! what each one drives on a virtual controller.
//!
//! A definition is built at startup or on console switch and never mutated
//! while in use; switching consoles must drain in-flight executions first
//! (see the executor's drain barrier).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier for an absolute axis. Values are Linux `ABS_*` codes so the
/// uinput backend can use them directly.
pub type AxisId = u16;

pub const AXIS_X: AxisId = 0x00;
pub const AXIS_Y: AxisId = 0x01;
pub const AXIS_RX: AxisId = 0x03;
pub const AXIS_RY: AxisId = 0x04;

// Linux BTN_* codes used by the built-in consoles.
const BTN_SOUTH: u16 = 0x130;
const BTN_EAST: u16 = 0x131;
const BTN_NORTH: u16 = 0x133;
const BTN_WEST: u16 = 0x134;
const BTN_TL: u16 = 0x136;
const BTN_TR: u16 = 0x137;
const BTN_TL2: u16 = 0x138;
const BTN_TR2: u16 = 0x139;
const BTN_SELECT: u16 = 0x13a;
const BTN_START: u16 = 0x13b;
const BTN_DPAD_UP: u16 = 0x220;
const BTN_DPAD_DOWN: u16 = 0x221;
const BTN_DPAD_LEFT: u16 = 0x222;
const BTN_DPAD_RIGHT: u16 = 0x223;

fn default_max_percent() -> u8 {
    100
}

/// What a named input does on the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputKind {
    /// A digital button with its `BTN_*` code.
    Button { code: u16 },
    /// An axis input. Pressing drives the axis toward its minimum or
    /// maximum end, scaled by the token's percentage and capped by
    /// `max_percent` (some consoles never reach the full range).
    Axis {
        axis: AxisId,
        toward_min: bool,
        #[serde(default = "default_max_percent")]
        max_percent: u8,
    },
    /// A placeholder that consumes time without touching the controller.
    Wait,
}

/// Immutable per-game-system description: valid input names and what each
/// maps to.
#[derive(Debug, Clone)]
pub struct ConsoleDefinition {
    name: String,
    inputs: HashMap<String, InputKind>,
}

impl ConsoleDefinition {
    /// Build a definition. Input names are lowercased; the parser matches
    /// lowercased messages against them.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = (S, InputKind)>,
    ) -> Self {
        Self {
            name: name.into(),
            inputs: inputs
                .into_iter()
                .map(|(n, k)| (n.into().to_lowercase(), k))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All valid input names, for grammar building and display. Sorted so
    /// output is deterministic.
    pub fn valid_inputs(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn kind(&self, input: &str) -> Option<InputKind> {
        self.inputs.get(input).copied()
    }

    pub fn is_wait(&self, input: &str) -> bool {
        matches!(self.inputs.get(input), Some(InputKind::Wait))
    }

    /// Distinct button codes, for uinput device setup.
    pub fn button_codes(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self
            .inputs
            .values()
            .filter_map(|kind| match kind {
                InputKind::Button { code } => Some(*code),
                _ => None,
            })
            .collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }

    /// Distinct axis ids, for uinput device setup.
    pub fn axis_ids(&self) -> Vec<AxisId> {
        let mut axes: Vec<AxisId> = self
            .inputs
            .values()
            .filter_map(|kind| match kind {
                InputKind::Axis { axis, .. } => Some(*axis),
                _ => None,
            })
            .collect();
        axes.sort_unstable();
        axes.dedup();
        axes
    }

    /// Names of the built-in consoles.
    pub fn builtin_names() -> &'static [&'static str] {
        &["nes", "snes", "n64"]
    }

    /// Look up a built-in console by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "nes" => Some(Self::nes()),
            "snes" => Some(Self::snes()),
            "n64" => Some(Self::n64()),
            _ => None,
        }
    }

    fn wait_inputs() -> [(&'static str, InputKind); 2] {
        [("#", InputKind::Wait), (".", InputKind::Wait)]
    }

    fn nes() -> Self {
        let mut inputs = vec![
            ("a", InputKind::Button { code: BTN_SOUTH }),
            ("b", InputKind::Button { code: BTN_EAST }),
            ("start", InputKind::Button { code: BTN_START }),
            ("select", InputKind::Button { code: BTN_SELECT }),
            ("up", InputKind::Button { code: BTN_DPAD_UP }),
            ("down", InputKind::Button { code: BTN_DPAD_DOWN }),
            ("left", InputKind::Button { code: BTN_DPAD_LEFT }),
            ("right", InputKind::Button { code: BTN_DPAD_RIGHT }),
        ];
        inputs.extend(Self::wait_inputs());
        Self::new("nes", inputs)
    }

    fn snes() -> Self {
        let mut inputs = vec![
            ("a", InputKind::Button { code: BTN_SOUTH }),
            ("b", InputKind::Button { code: BTN_EAST }),
            ("x", InputKind::Button { code: BTN_NORTH }),
            ("y", InputKind::Button { code: BTN_WEST }),
            ("l", InputKind::Button { code: BTN_TL }),
            ("r", InputKind::Button { code: BTN_TR }),
            ("start", InputKind::Button { code: BTN_START }),
            ("select", InputKind::Button { code: BTN_SELECT }),
            ("up", InputKind::Button { code: BTN_DPAD_UP }),
            ("down", InputKind::Button { code: BTN_DPAD_DOWN }),
            ("left", InputKind::Button { code: BTN_DPAD_LEFT }),
            ("right", InputKind::Button { code: BTN_DPAD_RIGHT }),
        ];
        inputs.extend(Self::wait_inputs());
        Self::new("snes", inputs)
    }

    /// N64: analog stick on X/Y, C buttons on the right stick axes.
    fn n64() -> Self {
        let axis = |axis, toward_min| InputKind::Axis {
            axis,
            toward_min,
            max_percent: 100,
        };
        let mut inputs = vec![
            ("a", InputKind::Button { code: BTN_SOUTH }),
            ("b", InputKind::Button { code: BTN_EAST }),
            ("start", InputKind::Button { code: BTN_START }),
            ("l", InputKind::Button { code: BTN_TL }),
            ("r", InputKind::Button { code: BTN_TR }),
            ("z", InputKind::Button { code: BTN_TR2 }),
            ("zl", InputKind::Button { code: BTN_TL2 }),
            ("left", axis(AXIS_X, true)),
            ("right", axis(AXIS_X, false)),
            ("up", axis(AXIS_Y, true)),
            ("down", axis(AXIS_Y, false)),
            ("cleft", axis(AXIS_RX, true)),
            ("cright", axis(AXIS_RX, false)),
            ("cup", axis(AXIS_RY, true)),
            ("cdown", axis(AXIS_RY, false)),
            ("dup", InputKind::Button { code: BTN_DPAD_UP }),
            ("ddown", InputKind::Button { code: BTN_DPAD_DOWN }),
            ("dleft", InputKind::Button { code: BTN_DPAD_LEFT }),
            ("dright", InputKind::Button { code: BTN_DPAD_RIGHT }),
        ];
        inputs.extend(Self::wait_inputs());
        Self::new("n64", inputs)
    }
}
