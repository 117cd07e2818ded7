//! Layers and the keymap.
//!
//! A keymap is a stack of named layers, each a full `[side][row][col]`
//! action table. Layer 0 is the base layer; `Trans` entries on other layers
//! fall through to it. Everything is checked once at startup; a keymap
//! that validates never makes the runtime branch on a bad layer id.

use core::fmt;

use crate::action::Action;
use crate::{positions, Pos, COLS, ROWS};

/// Longest allowed key sequence. Keeps every state graph inside
/// [`crate::fsm::MAX_STATES`].
pub const MAX_SEQUENCE: usize = 7;

/// One half's action table, row-major.
pub type HalfMap = [[Action; COLS]; ROWS];

/// A named overlay (or the base) for both halves, indexed by [`crate::Side`].
pub struct Layer {
    pub name: &'static str,
    pub keys: [HalfMap; 2],
}

/// The full layer stack. Index 0 is the base layer.
pub type Layers = &'static [Layer];

/// A keymap that failed startup validation. The firmware prints this and
/// halts; nothing else ever sees an invalid keymap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The layer stack is empty; there is no base layer.
    NoLayers,
    /// A layer hold names a layer that does not exist.
    LayerHoldTarget {
        layer: &'static str,
        pos: Pos,
        target: usize,
    },
    /// A layer hold declared somewhere other than the base layer.
    LayerHoldOffBase { layer: &'static str, pos: Pos },
    /// A key or mod-tap/tap-dance hold with an empty chord.
    EmptyChord { layer: &'static str, pos: Pos },
    /// A sequence with no codes or more than [`MAX_SEQUENCE`].
    SequenceLength {
        layer: &'static str,
        pos: Pos,
        len: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn at(f: &mut fmt::Formatter<'_>, layer: &str, pos: &Pos) -> fmt::Result {
            write!(
                f,
                " (layer {:?}, {} r{} c{})",
                layer,
                pos.side.name(),
                pos.row,
                pos.col
            )
        }
        match self {
            ConfigError::NoLayers => write!(f, "keymap has no layers; a base layer is required"),
            ConfigError::LayerHoldTarget { layer, pos, target } => {
                write!(f, "layer hold references unknown layer {}", target)?;
                at(f, layer, pos)
            }
            ConfigError::LayerHoldOffBase { layer, pos } => {
                write!(f, "layer holds may only appear on the base layer")?;
                at(f, layer, pos)
            }
            ConfigError::EmptyChord { layer, pos } => {
                write!(f, "empty chord")?;
                at(f, layer, pos)
            }
            ConfigError::SequenceLength { layer, pos, len } => {
                write!(
                    f,
                    "sequence of {} codes (must be 1..={})",
                    len, MAX_SEQUENCE
                )?;
                at(f, layer, pos)
            }
        }
    }
}

/// A validated keymap.
pub struct Keymap {
    layers: Layers,
}

impl Keymap {
    /// Validate and wrap a layer stack.
    pub fn new(layers: Layers) -> Result<Self, ConfigError> {
        if layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        for (li, layer) in layers.iter().enumerate() {
            for pos in positions() {
                let action = &layer.keys[pos.side as usize][pos.row as usize][pos.col as usize];
                check(action, li, layer.name, pos, layers.len())?;
            }
        }
        Ok(Keymap { layers })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    fn raw(&self, layer: usize, pos: Pos) -> &'static Action {
        &self.layers[layer].keys[pos.side as usize][pos.row as usize][pos.col as usize]
    }

    /// The action `pos` performs on `layer`, with `Trans` falling through
    /// to the base layer. `Trans` on the base layer itself is a dead key.
    pub fn action(&self, layer: usize, pos: Pos) -> &'static Action {
        const NOOP: Action = Action::NoOp;
        match self.raw(layer, pos) {
            Action::Trans if layer != 0 => self.action(0, pos),
            Action::Trans => &NOOP,
            action => action,
        }
    }

    /// The base-layer action for `pos`. Layer selection and permissive-hold
    /// eligibility are decided against this, not the resolved binding.
    pub fn base(&self, pos: Pos) -> &'static Action {
        self.action(0, pos)
    }
}

fn check(
    action: &Action,
    layer_index: usize,
    layer: &'static str,
    pos: Pos,
    num_layers: usize,
) -> Result<(), ConfigError> {
    match action {
        Action::LayerHold(target) => {
            if layer_index != 0 {
                Err(ConfigError::LayerHoldOffBase { layer, pos })
            } else if *target >= num_layers {
                Err(ConfigError::LayerHoldTarget {
                    layer,
                    pos,
                    target: *target,
                })
            } else {
                Ok(())
            }
        }
        Action::Key(chord) if chord.is_empty() => Err(ConfigError::EmptyChord { layer, pos }),
        Action::ModTap(mt) if mt.hold.is_empty() => Err(ConfigError::EmptyChord { layer, pos }),
        Action::TapDance(td) if td.hold1.is_empty() || td.hold2.is_empty() => {
            Err(ConfigError::EmptyChord { layer, pos })
        }
        Action::Sequence(seq) if seq.codes.is_empty() || seq.codes.len() > MAX_SEQUENCE => {
            Err(ConfigError::SequenceLength {
                layer,
                pos,
                len: seq.codes.len(),
            })
        }
        _ => Ok(()),
    }
}
