//! The actions a physical key can be bound to.

use crate::key_code::{ConsumerCode, KeyCode, MouseButtons};

/// An ordered, non-empty list of keyboard usages pressed together and
/// released together (both in declared order).
pub type Chord = &'static [KeyCode];

/// Cursor movement emitted every tick while the key is held. The velocity
/// starts at `(dx, dy, dw)` and is multiplied by `(ax, ay)` after each
/// report; the wheel component is never accelerated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMove {
    pub dx: i16,
    pub dy: i16,
    pub dw: i16,
    pub ax: f32,
    pub ay: f32,
}

/// A timed key-by-key replay: on press, each code is tapped in order with
/// at least `delay_ms` between taps. Holding the key past the last tap does
/// not retrigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sequence {
    pub codes: &'static [KeyCode],
    pub delay_ms: u32,
}

/// Modifier when held, plain key when tapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModTap {
    pub tap: KeyCode,
    pub hold: Chord,
    pub timeout_ms: u32,
    /// Emit the hold chord as a tap instead of holding it.
    pub hold_is_tap: bool,
    /// Commit to the hold early when another key goes down mid-timeout.
    pub permissive: bool,
}

/// Two taps and two holds on one key, distinguished by timing: first-press
/// hold gives `hold1`, a lone tap gives `tap1`, a quick second press held
/// gives `hold2`, a quick second tap gives `tap2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapDance {
    pub tap1: KeyCode,
    pub hold1: Chord,
    pub tap2: KeyCode,
    pub hold2: Chord,
    pub timeout_ms: u32,
}

/// What a key does. Bound to positions by the keymap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Dead key.
    NoOp,
    /// Fall through to the base layer's action for this position. On the
    /// base layer itself, equivalent to `NoOp`.
    Trans,
    /// Press/hold/release a keyboard chord.
    Key(Chord),
    /// Press/release a single consumer usage.
    Consumer(ConsumerCode),
    /// Press/release mouse buttons.
    MouseKey(MouseButtons),
    /// Accelerating cursor movement while held.
    MouseMove(MouseMove),
    /// Timed key-by-key replay.
    Sequence(Sequence),
    /// Modifier when held, plain key when tapped.
    ModTap(ModTap),
    /// Two-stage tap-dance.
    TapDance(TapDance),
    /// While this key is down, the named layer is active. Only meaningful
    /// on the base layer; such positions never produce key output.
    LayerHold(usize),
}

impl Action {
    /// The layer this action activates, if it is a layer hold.
    pub fn layer(&self) -> Option<usize> {
        match self {
            Action::LayerHold(l) => Some(*l),
            _ => None,
        }
    }
}

/// Shortcut for [`Action::Key`]; single keys are one-element chords.
pub const fn k(chord: Chord) -> Action {
    Action::Key(chord)
}

/// Shortcut for [`Action::Consumer`].
pub const fn cc(code: ConsumerCode) -> Action {
    Action::Consumer(code)
}

/// Shortcut for [`Action::MouseKey`].
pub const fn mb(buttons: MouseButtons) -> Action {
    Action::MouseKey(buttons)
}

/// Shortcut for [`Action::MouseMove`].
pub const fn mm(dx: i16, dy: i16, dw: i16, ax: f32, ay: f32) -> Action {
    Action::MouseMove(MouseMove { dx, dy, dw, ax, ay })
}

/// Shortcut for [`Action::Sequence`].
pub const fn seq(codes: &'static [KeyCode], delay_ms: u32) -> Action {
    Action::Sequence(Sequence { codes, delay_ms })
}

/// Shortcut for [`Action::ModTap`] with the usual flags: the hold chord is
/// held, and permissive hold is on.
pub const fn mt(tap: KeyCode, hold: Chord, timeout_ms: u32) -> Action {
    Action::ModTap(ModTap {
        tap,
        hold,
        timeout_ms,
        hold_is_tap: false,
        permissive: true,
    })
}

/// Shortcut for [`Action::TapDance`].
pub const fn td(
    tap1: KeyCode,
    hold1: Chord,
    tap2: KeyCode,
    hold2: Chord,
    timeout_ms: u32,
) -> Action {
    Action::TapDance(TapDance {
        tap1,
        hold1,
        tap2,
        hold2,
        timeout_ms,
    })
}

/// Shortcut for [`Action::LayerHold`].
pub const fn lh(layer: usize) -> Action {
    Action::LayerHold(layer)
}
