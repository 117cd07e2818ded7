//! Identifiers for the three HID sinks: keyboard usages, consumer-control
//! usages, and mouse button masks.

/// USB HID keyboard usage codes (usage page 0x07). Modifiers live in the
/// same space at `0xE0..=0xE7`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum KeyCode {
    No = 0x00,
    A = 0x04,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Kb1,
    Kb2,
    Kb3,
    Kb4,
    Kb5,
    Kb6,
    Kb7,
    Kb8,
    Kb9,
    Kb0,
    Enter,
    Escape,
    BSpace,
    Tab,
    Space,
    Minus,
    Equal,
    LBracket,
    RBracket,
    Bslash,
    NonUsHash,
    SColon,
    Quote,
    Grave,
    Comma,
    Dot,
    Slash,
    CapsLock,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    PScreen,
    ScrollLock,
    Pause,
    Insert,
    Home,
    PgUp,
    Delete,
    End,
    PgDown,
    Right,
    Left,
    Down,
    Up,
    NumLock,
    KpSlash,
    KpAsterisk,
    KpMinus,
    KpPlus,
    KpEnter,
    Kp1,
    Kp2,
    Kp3,
    Kp4,
    Kp5,
    Kp6,
    Kp7,
    Kp8,
    Kp9,
    Kp0,
    KpDot,
    NonUsBslash,
    Application,
    Power,
    KpEqual,
    LCtrl = 0xE0,
    LShift,
    LAlt,
    LGui,
    RCtrl,
    RShift,
    RAlt,
    RGui,
}

impl KeyCode {
    /// Is this one of the eight modifier usages?
    pub fn is_modifier(self) -> bool {
        (self as u8) >= KeyCode::LCtrl as u8 && (self as u8) <= KeyCode::RGui as u8
    }

    /// Bit of this key in the boot report modifier byte, if it has one.
    pub fn modifier_bit(self) -> Option<u8> {
        if self.is_modifier() {
            Some(1 << (self as u8 - KeyCode::LCtrl as u8))
        } else {
            None
        }
    }
}

/// Consumer-control usages (usage page 0x0C). The consumer sink reports one
/// of these at a time.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum ConsumerCode {
    BrightnessUp = 0x006F,
    BrightnessDown = 0x0070,
    ScanNext = 0x00B5,
    ScanPrevious = 0x00B6,
    MediaStop = 0x00B7,
    Eject = 0x00B8,
    PlayPause = 0x00CD,
    Mute = 0x00E2,
    VolumeUp = 0x00E9,
    VolumeDown = 0x00EA,
}

/// Mouse button bitmask, as it appears in the mouse report's button byte.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct MouseButtons(pub u8);

impl MouseButtons {
    pub const LEFT: MouseButtons = MouseButtons(1 << 0);
    pub const RIGHT: MouseButtons = MouseButtons(1 << 1);
    pub const MIDDLE: MouseButtons = MouseButtons(1 << 2);
}

impl core::ops::BitOr for MouseButtons {
    type Output = MouseButtons;
    fn bitor(self, rhs: MouseButtons) -> MouseButtons {
        MouseButtons(self.0 | rhs.0)
    }
}
